use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use log::debug;
use rand::RngCore;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("invalid key material: {0}")]
    Key(String),
    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// 身份字符串的 SHA-256 即 AES-256 密钥
fn cipher_for(identity: &str) -> Result<Aes256Gcm, CodecError> {
    let key = Sha256::digest(identity.as_bytes());
    Aes256Gcm::new_from_slice(&key).map_err(|e| CodecError::Key(e.to_string()))
}

/// 用身份派生的密钥加密，返回 URL 安全的 base64(nonce || 密文)
pub fn encrypt(secret: &str, identity: &str) -> Result<String, CodecError> {
    let cipher = cipher_for(identity)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret.as_bytes())
        .map_err(|e| CodecError::Encrypt(e.to_string()))?;

    let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&ciphertext);
    Ok(URL_SAFE.encode(token))
}

/// 解密失败时原样返回输入，兼容仍以明文保存的旧密钥
pub fn decrypt(token: &str, identity: &str) -> String {
    match try_decrypt(token, identity) {
        Some(plain) => plain,
        None => {
            debug!("secret token not decryptable, using it as-is");
            token.to_string()
        }
    }
}

fn try_decrypt(token: &str, identity: &str) -> Option<String> {
    let raw = URL_SAFE.decode(token.trim()).ok()?;
    if raw.len() <= NONCE_LEN {
        return None;
    }
    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = cipher_for(identity).ok()?;
    let plain = cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()?;
    String::from_utf8(plain).ok()
}
