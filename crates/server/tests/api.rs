use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use server::{ServerState, router};

async fn app() -> (Router, Engine) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let build = || async {
        Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap()
    };
    let app_engine = build().await;
    let engine = build().await;
    for name in ["alice", "bob", "carol", "mallory"] {
        engine.create_user(name, "password").await.unwrap();
    }
    (router(ServerState::new(app_engine)), engine)
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user, "password"));
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn user_id(engine: &Engine, username: &str) -> String {
    engine.user_by_username(username).await.unwrap().id.to_string()
}

/// alice owns a group with bob and carol.
async fn flat(app: &Router, engine: &Engine) -> (String, String, String, String) {
    let alice = user_id(engine, "alice").await;
    let bob = user_id(engine, "bob").await;
    let carol = user_id(engine, "carol").await;
    let (status, group) = send(
        app,
        "POST",
        "/api/groups",
        "alice",
        Some(json!({ "name": "Flat", "members": [&bob, &carol] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_str().unwrap().to_string();
    (group_id, alice, bob, carol)
}

#[tokio::test]
async fn requests_without_valid_credentials_are_rejected() {
    let (app, _engine) = app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, basic("alice", "nope"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, me) = send(&app, "GET", "/api/me", "alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
}

#[tokio::test]
async fn settlement_of_three_way_split() {
    let (app, engine) = app().await;
    let (group_id, alice, bob, carol) = flat(&app, &engine).await;

    let (status, expense) = send(
        &app,
        "POST",
        "/api/expenses",
        "alice",
        Some(json!({
            "group_id": &group_id,
            "description": "Dinner",
            "amount": 90.0,
            "participants": [
                { "user_id": &alice },
                { "user_id": &bob },
                { "user_id": &carol },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["payer_id"], alice.as_str());
    assert_eq!(expense["participants"][1]["amount"], 30.0);

    let (status, settlement) = send(
        &app,
        "GET",
        &format!("/api/settlements/{group_id}"),
        "bob",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settlement["balances"][&alice], 60.0);
    assert_eq!(settlement["balances"][&bob], -30.0);
    assert_eq!(settlement["balances"][&carol], -30.0);

    let transactions = settlement["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    for tx in transactions {
        assert_eq!(tx["receiver_id"], alice.as_str());
        assert_eq!(tx["receiver_name"], "alice");
        assert_eq!(tx["amount"], 30.0);
    }
}

#[tokio::test]
async fn mismatched_shares_are_unprocessable() {
    let (app, engine) = app().await;
    let (group_id, alice, bob, _carol) = flat(&app, &engine).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/expenses",
        "alice",
        Some(json!({
            "group_id": &group_id,
            "description": "Taxi",
            "amount": 50.0,
            "participants": [
                { "user_id": &alice, "share": 30.0 },
                { "user_id": &bob, "share": 30.0 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("do not reconcile"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/expenses",
        "alice",
        Some(json!({
            "group_id": &group_id,
            "description": "Taxi",
            "amount": 10.005,
            "participants": [{ "user_id": &alice }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn access_rules_map_to_status_codes() {
    let (app, engine) = app().await;
    let (group_id, _alice, bob, _carol) = flat(&app, &engine).await;
    let mallory = user_id(&engine, "mallory").await;

    let (status, _) = send(&app, "GET", &format!("/api/groups/{group_id}"), "mallory", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/groups/{}", uuid::Uuid::new_v4()),
        "alice",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/groups/{group_id}/members"),
        "alice",
        Some(json!({ "user_id": &bob })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/groups/{group_id}/members"),
        "bob",
        Some(json!({ "user_id": &mallory })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/groups/{group_id}/members"),
        "alice",
        Some(json!({ "user_id": &mallory })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/groups/{group_id}/members/{mallory}"),
        "alice",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, group) = send(&app, "GET", &format!("/api/groups/{group_id}"), "bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(group["members"].as_array().unwrap().len(), 3);
    assert_eq!(group["members"][0]["username"], "alice");
}

#[tokio::test]
async fn only_payer_or_owner_changes_expense() {
    let (app, engine) = app().await;
    let (group_id, _alice, bob, carol) = flat(&app, &engine).await;

    let (_, expense) = send(
        &app,
        "POST",
        "/api/expenses",
        "bob",
        Some(json!({
            "group_id": &group_id,
            "description": "Groceries",
            "amount": 40,
            "participants": [{ "user_id": &bob }, { "user_id": &carol }],
        })),
    )
    .await;
    let expense_id = expense["id"].as_str().unwrap().to_string();
    let uri = format!("/api/expenses/{expense_id}");

    let (status, _) = send(&app, "PUT", &uri, "carol", Some(json!({ "amount": 10 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "PUT", &uri, "bob", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(&app, "PUT", &uri, "bob", Some(json!({ "amount": 50.5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["amount"], 50.5);
    assert_eq!(updated["participants"][1]["amount"], 25.25);

    let (status, listed) = send(
        &app,
        "GET",
        &format!("/api/users/{carol}/expenses"),
        "alice",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &uri, "alice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, listed) = send(
        &app,
        "GET",
        &format!("/api/groups/{group_id}/expenses"),
        "carol",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn owner_deletes_group() {
    let (app, engine) = app().await;
    let (group_id, ..) = flat(&app, &engine).await;
    let uri = format!("/api/groups/{group_id}");

    let (status, _) = send(&app, "DELETE", &uri, "bob", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, "alice", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, groups) = send(&app, "GET", "/api/groups", "bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(groups.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn run_reports_a_taken_port() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();
    let (_app, engine) = app().await;

    let err = server::run(engine, "127.0.0.1", port).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
}
