use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::sync::Arc;

use crate::{ServerError, expenses, groups, members, settlements, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

impl ServerState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Authenticates the request with Basic credentials and stores the
/// [`engine::User`] in the request extensions.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(ServerError::Unauthorized);
    };

    let user = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await?
        .ok_or(ServerError::Unauthorized)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let api = Router::new()
        .route("/me", get(user::me))
        .route("/groups", post(groups::create).get(groups::list))
        .route(
            "/groups/{group_id}",
            get(groups::get).put(groups::update).delete(groups::remove),
        )
        .route("/groups/{group_id}/members", post(members::add))
        .route(
            "/groups/{group_id}/members/{user_id}",
            delete(members::remove),
        )
        .route("/groups/{group_id}/expenses", get(expenses::list_for_group))
        .route("/expenses", post(expenses::create))
        .route(
            "/expenses/{expense_id}",
            get(expenses::get)
                .put(expenses::update)
                .delete(expenses::remove),
        )
        .route("/users/{user_id}/expenses", get(expenses::list_for_user))
        .route("/settlements/{group_id}", get(settlements::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new().nest("/api", api).with_state(state)
}

pub async fn run(engine: Engine, bind: &str, port: u16) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind((bind, port))
        .await
        .inspect_err(|err| tracing::error!("failed to bind server listener on {bind}:{port}: {err}"))?;
    run_with_listener(engine, listener).await
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(ServerState::new(engine))).await
}
