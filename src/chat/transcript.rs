use log::{info, warn};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid chat name: {0}")]
    InvalidName(String),
    #[error("Chat storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Chat data is corrupted: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// 每个 (账户, 成员) 一份 JSON 数组文件，消息对象原样保存
#[derive(Clone, Debug)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, email: &str, member_name: &str) -> Result<PathBuf, TranscriptError> {
        for part in [email, member_name] {
            if part.is_empty()
                || part.contains("..")
                || part.contains('/')
                || part.contains('\\')
                || part.contains('\0')
            {
                return Err(TranscriptError::InvalidName(part.to_string()));
            }
        }
        Ok(self.dir.join(format!("{}_{}.json", email, member_name)))
    }

    /// 文件不存在时视为空记录
    pub async fn load(&self, email: &str, member_name: &str) -> Result<Vec<Value>, TranscriptError> {
        let path = self.path_for(email, member_name)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| {
            warn!("chat file {} unreadable: {}", path.display(), e);
            TranscriptError::Corrupt(e)
        })
    }

    pub async fn save(
        &self,
        email: &str,
        member_name: &str,
        chat: &[Value],
    ) -> Result<(), TranscriptError> {
        let path = self.path_for(email, member_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let raw = serde_json::to_vec(chat)?;
        tokio::fs::write(&path, raw).await?;
        info!("saved {} chat messages to {}", chat.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(tmp.path());
        assert!(store.load("a@x.io", "Ann").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_messages() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(tmp.path().join("chat_data"));
        let chat = vec![
            json!({"role": "user", "text": "Is 6.1 A1C high?"}),
            json!({"role": "ai", "text": "It is in the prediabetes range.", "ts": 1700000000}),
        ];

        store.save("a@x.io", "Ann", &chat).await.unwrap();
        assert!(tmp.path().join("chat_data").join("a@x.io_Ann.json").exists());
        assert_eq!(store.load("a@x.io", "Ann").await.unwrap(), chat);

        // 成员之间互不干扰
        assert!(store.load("a@x.io", "Bob").await.unwrap().is_empty());

        store.save("a@x.io", "Ann", &[]).await.unwrap();
        assert!(store.load("a@x.io", "Ann").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(tmp.path());
        for (email, name) in [("../etc", "x"), ("a@x.io", "../../passwd"), ("a/b", "x"), ("a@x.io", "")] {
            assert!(matches!(
                store.save(email, name, &[]).await,
                Err(TranscriptError::InvalidName(_))
            ));
            assert!(matches!(
                store.load(email, name).await,
                Err(TranscriptError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a@x.io_Ann.json"), b"{not json").unwrap();
        let store = TranscriptStore::new(tmp.path());
        assert!(matches!(
            store.load("a@x.io", "Ann").await,
            Err(TranscriptError::Corrupt(_))
        ));
    }
}
