use crate::ai::AskError;
use crate::chat::TranscriptError;
use crate::crypto::CodecError;
use crate::storage::repository::FamilyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;

/// 错误响应体沿用 `{"detail": "..."}`，前端按此字段展示
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<AskError> for ApiError {
    fn from(e: AskError) -> Self {
        match e {
            AskError::MissingCredential(_) | AskError::UnsupportedProvider(_) => {
                Self::bad_request(e.to_string())
            }
            AskError::InvalidEndpoint(_) | AskError::Http(_) => {
                error!("ask failed: {}", e);
                Self::internal(e.to_string())
            }
        }
    }
}

impl From<FamilyError> for ApiError {
    fn from(e: FamilyError) -> Self {
        match e {
            FamilyError::InvalidIndex | FamilyError::MemberLimit | FamilyError::QuestionLimit => {
                Self::bad_request(e.to_string())
            }
            FamilyError::UserNotFound | FamilyError::SlotEmpty(_) | FamilyError::MemberNotFound => {
                Self::new(StatusCode::NOT_FOUND, e.to_string())
            }
            FamilyError::Db(ref db) => {
                error!("Database error: {}", db);
                Self::internal("Database error occurred")
            }
        }
    }
}

impl From<TranscriptError> for ApiError {
    fn from(e: TranscriptError) -> Self {
        match e {
            TranscriptError::InvalidName(_) => Self::bad_request(e.to_string()),
            TranscriptError::Io(_) | TranscriptError::Corrupt(_) => {
                error!("{}", e);
                Self::internal(e.to_string())
            }
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        error!("{}", e);
        Self::internal(e.to_string())
    }
}
