//! Endpoints about the authenticated user.

use api_types::user::UserView;
use axum::{Extension, Json};
use engine::User;

/// Return the authenticated user.
pub async fn me(Extension(user): Extension<User>) -> Json<UserView> {
    Json(UserView {
        id: user.id.to_string(),
        username: user.username,
        created_at: user.created_at,
    })
}
