use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    pub query: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberIndexQuery {
    pub member_index: i32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMemberQuery {
    pub email: String,
    pub member_index: i32,
}

/// 计数与聊天记录按成员名定位
#[derive(Debug, Deserialize)]
pub struct MemberNameQuery {
    pub email: String,
    pub member_name: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteMemberResponse {
    pub message: String,
    pub deleted_member_index: i32,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct GenderResponse {
    pub gender: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub chat: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct EncryptKeyRequest {
    pub email: String,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct EncryptKeyResponse {
    pub encrypted: String,
}
