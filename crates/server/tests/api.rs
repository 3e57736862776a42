mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::json;

use common::{app, competition_body, create_competition, event_body, register, send};

#[tokio::test]
async fn health_needs_no_token() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/account", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/api/account", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login() {
    let app = app().await;
    let token = register(&app, "alice").await;

    let (status, profile) = send(&app, Method::GET, "/api/account", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["mfa_enabled"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login": "alice@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn login_with_mfa_needs_a_code() {
    let app = app().await;
    let token = register(&app, "alice").await;

    let (status, setup) =
        send(&app, Method::POST, "/api/account/mfa/setup", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let secret = setup["secret"].as_str().unwrap().to_string();
    let code = engine::mfa::current_code(&secret, "alice", Utc::now()).unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/account/mfa/enable",
        Some(&token),
        Some(json!({ "code": code })),
    )
    .await;
    assert!(status.is_success());

    let credentials = json!({ "login": "alice", "password": "password123" });
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["mfa_required"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login": "alice", "password": "password123", "code": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("mfa_required").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "login": "alice", "password": "password123", "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn private_competition_needs_invite_code() {
    let app = app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let competition =
        create_competition(&app, &alice, competition_body("Office Pool", false, 0)).await;
    let id = competition["id"].as_str().unwrap();
    let invite_code = competition["invite_code"].as_str().unwrap().to_string();
    assert_eq!(competition["role"], "commissioner");

    let (status, public) = send(&app, Method::GET, "/api/competitions", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(public.as_array().unwrap().is_empty());

    let uri = format!("/api/competitions/{id}");
    let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{uri}/join"),
        Some(&bob),
        Some(json!({ "invite_code": "WRONG123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, joined) = send(
        &app,
        Method::POST,
        "/api/competitions/join",
        Some(&bob),
        Some(json!({ "invite_code": invite_code.to_lowercase() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{joined}");
    assert_eq!(joined["role"], "member");
    assert_eq!(joined["member_count"], 2);

    let (status, mine) = send(&app, Method::GET, "/api/competitions/mine", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn picks_resolution_and_leaderboard() {
    let app = app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;

    let competition = create_competition(&app, &alice, competition_body("League", true, 0)).await;
    let id = competition["id"].as_str().unwrap().to_string();
    for token in [&bob, &carol] {
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/competitions/{id}/join"),
            Some(token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let events_uri = format!("/api/competitions/{id}/events");
    let (status, _) = send(
        &app,
        Method::POST,
        &events_uri,
        Some(&bob),
        Some(event_body("Derby")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, event) = send(
        &app,
        Method::POST,
        &events_uri,
        Some(&alice),
        Some(event_body("Derby")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    assert_eq!(event["locked"], false);
    let event_id = event["id"].as_str().unwrap().to_string();

    let picks_uri = format!("/api/competitions/{id}/picks");
    for (token, selection) in [(&bob, "Home"), (&carol, "Away")] {
        let (status, pick) = send(
            &app,
            Method::POST,
            &picks_uri,
            Some(token),
            Some(json!({ "event_id": event_id, "selection": selection })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{pick}");
    }
    let (status, _) = send(
        &app,
        Method::POST,
        &picks_uri,
        Some(&bob),
        Some(json!({ "event_id": event_id, "selection": "Nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let event_picks_uri = format!("/api/events/{event_id}/picks");
    let (status, _) = send(&app, Method::GET, &event_picks_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let leaderboard_uri = format!("/api/competitions/{id}/leaderboard");
    let (status, board) = send(&app, Method::GET, &leaderboard_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(board.as_array().unwrap().iter().all(|row| row["rank"] == 1));

    let (status, resolved) = send(
        &app,
        Method::POST,
        &format!("/api/events/{event_id}/resolve"),
        Some(&alice),
        Some(json!({ "winner": "Home" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resolved}");
    assert_eq!(resolved["status"], "completed");
    assert_eq!(resolved["locked"], true);

    let (status, board) = send(&app, Method::GET, &leaderboard_uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["username"], "bob");
    assert_eq!(board[0]["score"], 3);
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[1]["rank"], 2);
    assert_eq!(board[2]["rank"], 2);

    let (status, picks) = send(&app, Method::GET, &event_picks_uri, Some(&carol), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(picks.as_array().unwrap().len(), 2);

    let (status, global) =
        send(&app, Method::GET, "/api/leaderboard?limit=1", Some(&carol), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(global.as_array().unwrap().len(), 1);
    assert_eq!(global[0]["username"], "bob");
    assert_eq!(global[0]["total_score"], 3);

    let (status, dashboard) = send(&app, Method::GET, "/api/dashboard", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["competitions"][0]["score"], 3);
    assert_eq!(dashboard["competitions"][0]["rank"], 1);

    let (status, notifications) = send(
        &app,
        Method::GET,
        "/api/notifications?unread=true",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!notifications.as_array().unwrap().is_empty());

    let (status, marked) = send(
        &app,
        Method::POST,
        "/api/notifications/read-all",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(marked["updated"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn live_event_rejects_picks_with_423() {
    let app = app().await;
    let alice = register(&app, "alice").await;

    let competition = create_competition(&app, &alice, competition_body("League", true, 0)).await;
    let id = competition["id"].as_str().unwrap();
    let (_, event) = send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/events"),
        Some(&alice),
        Some(event_body("Final")),
    )
    .await;
    let event_id = event["id"].as_str().unwrap();

    let (status, live) = send(
        &app,
        Method::PATCH,
        &format!("/api/events/{event_id}"),
        Some(&alice),
        Some(json!({ "status": "live" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["locked"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/picks"),
        Some(&alice),
        Some(json!({ "event_id": event_id, "selection": "Home" })),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert!(body["error"].as_str().unwrap().contains("upcoming"));
}

#[tokio::test]
async fn chat_and_event_requests() {
    let app = app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let competition = create_competition(&app, &alice, competition_body("League", true, 0)).await;
    let id = competition["id"].as_str().unwrap();
    send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/join"),
        Some(&bob),
        None,
    )
    .await;

    let messages_uri = format!("/api/competitions/{id}/messages");
    let (status, first) = send(
        &app,
        Method::POST,
        &messages_uri,
        Some(&bob),
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, request) = send(
        &app,
        Method::POST,
        &format!("/api/competitions/{id}/event-requests"),
        Some(&bob),
        Some(event_body("Cup tie")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{request}");
    assert_eq!(request["kind"], "event_request");
    assert_eq!(request["status"], "pending");

    let after = first["id"].as_i64().unwrap();
    let (status, newer) = send(
        &app,
        Method::GET,
        &format!("{messages_uri}?after={after}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(newer.as_array().unwrap().len(), 1);

    let review_uri = format!("/api/messages/{}/review", request["id"]);
    let (status, _) = send(
        &app,
        Method::POST,
        &review_uri,
        Some(&bob),
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, reviewed) = send(
        &app,
        Method::POST,
        &review_uri,
        Some(&alice),
        Some(json!({ "approve": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{reviewed}");
    assert_eq!(reviewed["message"]["status"], "approved");
    assert_eq!(reviewed["event"]["title"], "Cup tie");

    let (status, _) = send(
        &app,
        Method::POST,
        &review_uri,
        Some(&alice),
        Some(json!({ "approve": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_routes_need_the_flag() {
    let app = app().await;
    let alice = register(&app, "alice").await;

    let (status, _) = send(&app, Method::GET, "/api/admin/stats", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, "/api/admin/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
