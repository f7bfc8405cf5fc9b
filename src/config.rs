use crate::ai::resilience::REQUEST_TIMEOUT;
use crate::ai::{Provider, RetryPolicy};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://medlife.db?mode=rwc";
pub const DEFAULT_CHAT_DATA_DIR: &str = "chat_data";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub chat_data_dir: PathBuf,
    pub cors_origin: String,
    pub log_dir: PathBuf,
    pub llm_proxy: Option<String>,
    pub llm_timeout: Duration,
    pub retry_base: Duration,
    /// `{PROVIDER}_BASE_URL`
    pub endpoint_overrides: HashMap<Provider, String>,
}

impl AppConfig {
    /// 读取进程环境；`.env` 需在此之前由 dotenv 加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 空字符串等同未设置
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                key: "BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let llm_timeout = Duration::from_secs(parse_u64(
            "LLM_TIMEOUT_SECS",
            get("LLM_TIMEOUT_SECS"),
            REQUEST_TIMEOUT.as_secs(),
        )?);
        let retry_base = Duration::from_millis(parse_u64(
            "LLM_RETRY_BASE_MS",
            get("LLM_RETRY_BASE_MS"),
            RetryPolicy::default().base_delay.as_millis() as u64,
        )?);

        let endpoint_overrides = Provider::ALL
            .into_iter()
            .filter_map(|p| get(&p.base_url_env()).map(|url| (p, url)))
            .collect();

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            chat_data_dir: PathBuf::from(
                get("CHAT_DATA_DIR").unwrap_or_else(|| DEFAULT_CHAT_DATA_DIR.to_string()),
            ),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            log_dir: PathBuf::from(get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())),
            llm_proxy: get("LLM_PROXY"),
            llm_timeout,
            retry_base,
            endpoint_overrides,
        })
    }
}

fn parse_u64(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            key,
            value: v.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.chat_data_dir, PathBuf::from("chat_data"));
        assert_eq!(cfg.cors_origin, "http://localhost:3000");
        assert_eq!(cfg.llm_timeout, Duration::from_secs(30));
        assert_eq!(cfg.retry_base, Duration::from_millis(1000));
        assert!(cfg.llm_proxy.is_none());
        assert!(cfg.endpoint_overrides.is_empty());
    }

    #[test]
    fn reads_overrides() {
        let cfg = from_pairs(&[
            ("BIND_ADDR", "0.0.0.0:9000"),
            ("LLM_PROXY", "127.0.0.1:1080"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("CLAUDE_BASE_URL", "http://localhost:4010/v1"),
            ("GEMINI_BASE_URL", "   "),
            ("OPENAI_BASE_URL", " http://127.0.0.1:4011/v1 "),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.llm_proxy.as_deref(), Some("127.0.0.1:1080"));
        assert_eq!(cfg.llm_timeout, Duration::from_secs(5));
        assert_eq!(
            cfg.endpoint_overrides.get(&Provider::Claude).map(String::as_str),
            Some("http://localhost:4010/v1")
        );
        assert_eq!(
            cfg.endpoint_overrides.get(&Provider::OpenAi).map(String::as_str),
            Some("http://127.0.0.1:4011/v1")
        );
        assert!(!cfg.endpoint_overrides.contains_key(&Provider::Gemini));
        assert!(!cfg.endpoint_overrides.contains_key(&Provider::Mistral));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = from_pairs(&[("LLM_RETRY_BASE_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("LLM_RETRY_BASE_MS"));
        assert!(from_pairs(&[("BIND_ADDR", "localhost")]).is_err());
    }
}
