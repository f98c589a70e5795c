//! Group API endpoints

use api_types::group::{GroupNew, GroupUpdate, GroupView, MemberView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Group, User, UserId};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

/// Builds the view of a group, resolving member display names.
pub(crate) async fn group_view(state: &ServerState, group: Group) -> Result<GroupView, ServerError> {
    let usernames = state.engine.usernames(&group.members).await?;
    let members = group
        .members
        .iter()
        .map(|member| MemberView {
            id: member.to_string(),
            username: usernames
                .get(member)
                .cloned()
                .unwrap_or_else(|| member.to_string()),
        })
        .collect();

    Ok(GroupView {
        id: group.id,
        name: group.name,
        description: group.description,
        owner_id: group.owner_id.to_string(),
        members,
        created_at: group.created_at,
    })
}

/// Handle requests for creating a new `Group`. The caller becomes its owner.
pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupView>), ServerError> {
    let members: Vec<UserId> = payload.members.into_iter().map(UserId::from).collect();
    let group = state
        .engine
        .new_group(
            &user.id,
            &payload.name,
            payload.description.as_deref(),
            &members,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(group_view(&state, group).await?)))
}

/// Handle requests for listing the caller's groups
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<GroupView>>, ServerError> {
    let groups = state.engine.user_groups(&user.id).await?;
    let mut views = Vec::with_capacity(groups.len());
    for group in groups {
        views.push(group_view(&state, group).await?);
    }
    Ok(Json(views))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state.engine.group(group_id, &user.id).await?;
    Ok(Json(group_view(&state, group).await?))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<GroupView>, ServerError> {
    if payload.name.is_none() && payload.description.is_none() {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }

    let group = state
        .engine
        .update_group(
            group_id,
            &user.id,
            engine::GroupUpdate {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(group_view(&state, group).await?))
}

pub async fn remove(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(group_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
