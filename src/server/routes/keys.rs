use crate::crypto;
use crate::server::dto::{EncryptKeyRequest, EncryptKeyResponse};
use crate::server::error::ApiError;
use axum::Json;

/// 供前端保存密钥前加密；咨询接口带上 email 时会自动解密
pub async fn encrypt_key(
    Json(req): Json<EncryptKeyRequest>,
) -> Result<Json<EncryptKeyResponse>, ApiError> {
    if req.api_key.trim().is_empty() {
        return Err(ApiError::bad_request("API key is required"));
    }
    let encrypted = crypto::encrypt(&req.api_key, &req.email)?;
    Ok(Json(EncryptKeyResponse { encrypted }))
}
