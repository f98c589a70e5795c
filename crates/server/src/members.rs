//! Membership management endpoints (owner-only).

use api_types::group::MemberNew;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{User, UserId};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn add(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberNew>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .add_member(group_id, &user.id, &UserId::from(payload.user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, member_id)): Path<(Uuid, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_member(group_id, &user.id, &UserId::from(member_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
