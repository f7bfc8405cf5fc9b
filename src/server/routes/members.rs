use crate::server::dto::{
    DeleteMemberQuery, DeleteMemberResponse, EmailQuery, GenderResponse, MemberIndexQuery,
    MemberNameQuery, MessageResponse,
};
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::storage::repository::{FamilyRepository, MemberInput};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MemberInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    let slot = FamilyRepository::add_member(&state.db, input).await?;
    Ok(Json(MessageResponse::new(format!(
        "member{} added successfully",
        slot
    ))))
}

pub async fn edit_member(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MemberIndexQuery>,
    Json(input): Json<MemberInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    FamilyRepository::edit_member(&state.db, q.member_index, input).await?;
    Ok(Json(MessageResponse::new("Member updated successfully")))
}

pub async fn get_members(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EmailQuery>,
) -> Result<Json<Value>, ApiError> {
    let members = FamilyRepository::list_members(&state.db, &q.email).await?;
    Ok(Json(json!({ "members": members })))
}

pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeleteMemberQuery>,
) -> Result<Json<DeleteMemberResponse>, ApiError> {
    FamilyRepository::delete_member(&state.db, &q.email, q.member_index).await?;
    Ok(Json(DeleteMemberResponse {
        message: format!(
            "Member {} deleted successfully and members shifted",
            q.member_index
        ),
        deleted_member_index: q.member_index,
        email: q.email,
    }))
}

pub async fn member_details(
    State(state): State<Arc<AppState>>,
    Path((email, member_index)): Path<(String, i32)>,
) -> Result<Json<Value>, ApiError> {
    let member = FamilyRepository::member_details(&state.db, &email, member_index).await?;
    Ok(Json(json!({ "member": member })))
}

pub async fn increment_tokens(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MemberNameQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let n = FamilyRepository::increment_tokens(&state.db, &q.email, &q.member_name).await?;
    Ok(Json(MessageResponse::new(n.to_string())))
}

pub async fn token_count(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MemberNameQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let n = FamilyRepository::token_count(&state.db, &q.email, &q.member_name).await?;
    Ok(Json(MessageResponse::new(n.to_string())))
}

pub async fn user_gender(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EmailQuery>,
) -> Result<Json<GenderResponse>, ApiError> {
    let gender = FamilyRepository::primary_gender(&state.db, &q.email).await?;
    Ok(Json(GenderResponse { gender }))
}
