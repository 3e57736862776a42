//! Payment and sports routes against local stand-ins for Stripe and The
//! Odds API.

mod common;

use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, Query},
    http::{Method, Request, StatusCode},
    routing::{get, post},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::ServerConfig;
use sha2::Sha256;
use tower::ServiceExt;

use common::{
    JWT_SECRET, competition_body, create_competition, fake_provider, register, send, state_with,
};

const WEBHOOK_SECRET: &str = "whsec_test";

fn fake_stripe() -> Router {
    async fn create(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        let amount = form.get("line_items[0][price_data][unit_amount]");
        if amount.map(String::as_str) != Some("1000") {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "amount" })));
        }
        (
            StatusCode::OK,
            Json(json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.test/cs_test_1",
            })),
        )
    }

    async fn list(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        let data = match query.get("payment_intent").map(String::as_str) {
            Some("pi_test_1") => json!([{ "id": "cs_test_1", "url": null }]),
            _ => json!([]),
        };
        Json(json!({ "object": "list", "data": data }))
    }

    Router::new().route("/v1/checkout/sessions", post(create).get(list))
}

fn stripe_config() -> ServerConfig {
    let mut config = ServerConfig::new(JWT_SECRET);
    config.stripe.secret_key = Some("sk_test".to_string());
    config.stripe.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    config
}

async fn post_webhook(app: &Router, payload: &Value, signature: &str) -> StatusCode {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/payments/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    response.into_body().collect().await.unwrap();
    status
}

fn sign(payload: &Value) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn entry_fee_checkout_and_webhook() {
    let mut config = stripe_config();
    config.stripe.base_url = fake_provider(fake_stripe()).await;
    let app = server::router(state_with(config).await);

    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let competition =
        create_competition(&app, &alice, competition_body("Paid League", true, 1_000)).await;
    let id = competition["id"].as_str().unwrap();
    let join_uri = format!("/api/competitions/{id}/join");

    let (status, _) = send(&app, Method::POST, &join_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, checkout) = send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/checkout"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{checkout}");
    assert_eq!(checkout["session_id"], "cs_test_1");
    assert!(checkout["checkout_url"].as_str().unwrap().contains("cs_test_1"));

    let completed = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_test_1" } },
    });
    let forged = sign(&json!({ "type": "something.else" }));
    assert_eq!(
        post_webhook(&app, &completed, &forged).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        post_webhook(&app, &completed, "t=1,v1=00").await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        post_webhook(&app, &completed, &sign(&completed)).await,
        StatusCode::OK
    );
    assert_eq!(
        post_webhook(&app, &completed, &sign(&completed)).await,
        StatusCode::OK
    );

    let ignored = json!({ "type": "customer.created", "data": { "object": {} } });
    assert_eq!(
        post_webhook(&app, &ignored, &sign(&ignored)).await,
        StatusCode::OK
    );

    let (status, payments) = send(&app, Method::GET, "/api/payments", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments[0]["status"], "succeeded");
    assert_eq!(payments[0]["amount_minor"], 1_000);

    let (status, joined) = send(&app, Method::POST, &join_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK, "{joined}");
    assert_eq!(joined["prize_pool_minor"], 1_000);
}

#[tokio::test]
async fn declined_card_then_completed_session() {
    let mut config = stripe_config();
    config.stripe.base_url = fake_provider(fake_stripe()).await;
    let app = server::router(state_with(config).await);

    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let competition =
        create_competition(&app, &alice, competition_body("Paid League", true, 1_000)).await;
    let id = competition["id"].as_str().unwrap();
    let join_uri = format!("/api/competitions/{id}/join");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/checkout"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let declined = json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_test_1", "metadata": {} } },
    });
    assert_eq!(
        post_webhook(&app, &declined, &sign(&declined)).await,
        StatusCode::OK
    );
    let (_, payments) = send(&app, Method::GET, "/api/payments", Some(&bob), None).await;
    assert_eq!(payments[0]["status"], "failed");
    let (status, _) = send(&app, Method::POST, &join_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let completed = json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_test_1" } },
    });
    assert_eq!(
        post_webhook(&app, &completed, &sign(&completed)).await,
        StatusCode::OK
    );
    assert_eq!(
        post_webhook(&app, &declined, &sign(&declined)).await,
        StatusCode::OK
    );
    let (_, payments) = send(&app, Method::GET, "/api/payments", Some(&bob), None).await;
    assert_eq!(payments[0]["status"], "succeeded");

    let (status, joined) = send(&app, Method::POST, &join_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK, "{joined}");
}

#[tokio::test]
async fn checkout_without_stripe_keys_is_rejected() {
    let app = common::app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let competition =
        create_competition(&app, &alice, competition_body("Paid League", true, 500)).await;
    let id = competition["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/checkout"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "payments not configured");
}

fn fake_odds_api() -> Router {
    async fn odds(
        Path(sport): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if query.get("apiKey").map(String::as_str) != Some("odds-key") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "key" })));
        }
        let day = match sport.as_str() {
            "icehockey_nhl" => 1,
            "basketball_nba" => 2,
            "baseball_mlb" => 3,
            "americanfootball_nfl" => 4,
            _ => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
        };
        (
            StatusCode::OK,
            Json(json!([{
                "id": format!("{sport}-1"),
                "sport_key": sport,
                "commence_time": format!("2026-01-0{day}T18:00:00Z"),
            }])),
        )
    }

    Router::new().route("/v4/sports/{sport}/odds", get(odds))
}

#[tokio::test]
async fn odds_fan_out_skips_failed_sports() {
    let mut config = ServerConfig::new(JWT_SECRET);
    config.sports.base_url = fake_provider(fake_odds_api()).await;
    config.sports.api_key = Some("odds-key".to_string());
    let state = state_with(config).await;
    let app = server::router(state.clone());
    let token = register(&app, "alice").await;

    let (status, body) = send(&app, Method::GET, "/api/odds", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let sports: Vec<_> = body["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|game| game["sport"].as_str().unwrap())
        .collect();
    assert_eq!(
        sports,
        ["icehockey_nhl", "basketball_nba", "baseball_mlb", "americanfootball_nfl"]
    );
    assert_eq!(body["failed"], json!(["soccer_epl"]));

    let snapshot = state
        .engine
        .latest_odds_snapshot("basketball_nba")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot[0]["id"], "basketball_nba-1");
    assert!(
        state
            .engine
            .latest_odds_snapshot("soccer_epl")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn odds_without_api_key_serve_snapshots() {
    let state = state_with(ServerConfig::new(JWT_SECRET)).await;
    state
        .engine
        .store_odds_snapshot(
            "soccer_epl",
            &json!([{ "id": "stored", "commence_time": "2026-02-01T15:00:00Z" }]),
        )
        .await
        .unwrap();
    let app = server::router(state);
    let token = register(&app, "alice").await;

    let (status, body) = send(&app, Method::GET, "/api/odds", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["games"].as_array().unwrap().len(), 1);
    assert_eq!(body["games"][0]["data"]["id"], "stored");
    assert_eq!(body["failed"], json!([]));
}
