use crate::consult::ConsultRequest;
use crate::server::dto::PromptQuery;
use crate::server::error::ApiError;
use crate::server::state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

/// 回答或诊断类别（`answer` / `timeout` / `insufficient_credit` ...）
pub const OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-medlife-outcome");

/// 诊断也以 200 + 字符串返回，类别放在响应头里
pub async fn ask_ai(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ConsultRequest>,
) -> Result<Response, ApiError> {
    let answer = state.consult.ask(&req).await?;
    let outcome = answer.outcome();
    Ok(([(OUTCOME_HEADER, outcome)], Json(answer.into_string())).into_response())
}

pub async fn prompt(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PromptQuery>,
) -> Result<Response, ApiError> {
    let answer = state.consult.quick_prompt(&q.query, &q.api_key).await?;
    let outcome = answer.outcome();
    Ok(([(OUTCOME_HEADER, outcome)], Json(answer.into_string())).into_response())
}
