#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use server::{ServerConfig, ServerState};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret";

pub async fn state_with(config: ServerConfig) -> ServerState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db)
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    ServerState::new(engine, config)
}

pub async fn app() -> Router {
    server::router(state_with(ServerConfig::new(JWT_SECRET)).await)
}

/// Sends one request through the router and decodes the JSON answer.
/// Empty bodies come back as `Value::Null`.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Registers `name` and returns its bearer token.
pub async fn register(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": name,
            "email": format!("{name}@example.com"),
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn create_competition(app: &Router, token: &str, body: Value) -> Value {
    let (status, competition) =
        send(app, Method::POST, "/api/competitions", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{competition}");
    competition
}

pub fn competition_body(name: &str, is_public: bool, entry_fee_minor: i64) -> Value {
    let starts_at = Utc::now();
    json!({
        "name": name,
        "is_public": is_public,
        "starts_at": starts_at,
        "ends_at": starts_at + Duration::days(30),
        "entry_fee_minor": entry_fee_minor,
    })
}

pub fn event_body(title: &str) -> Value {
    json!({
        "sport": "soccer_epl",
        "title": title,
        "options": ["Home", "Away", "Draw"],
        "event_date": Utc::now() + Duration::days(1),
        "points": 3,
    })
}

/// Serves `router` on an ephemeral local port and returns its base url.
pub async fn fake_provider(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
