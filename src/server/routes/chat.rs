use crate::server::dto::{ChatPayload, MemberNameQuery, MessageResponse};
use crate::server::error::ApiError;
use crate::server::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

pub async fn fetch_chat(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MemberNameQuery>,
) -> Result<Json<ChatPayload>, ApiError> {
    let chat = state.transcripts.load(&q.email, &q.member_name).await?;
    Ok(Json(ChatPayload { chat }))
}

pub async fn save_chat(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MemberNameQuery>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .transcripts
        .save(&q.email, &q.member_name, &payload.chat)
        .await?;
    Ok(Json(MessageResponse::new("Chat data saved successfully")))
}
