use chrono::Utc;

use engine::{EngineError, ProfileUpdate, mfa};

mod common;

use common::{engine_with_db, user};

#[tokio::test]
async fn register_normalizes_and_rejects_duplicates() {
    let (engine, _db) = engine_with_db().await;

    let alice = engine
        .register_user(" Alice ", "Alice@Example.com", "password123")
        .await
        .unwrap();
    assert_eq!(alice.username, "alice");
    assert_eq!(alice.email, "alice@example.com");
    assert_ne!(alice.password_hash, "password123");

    let err = engine
        .register_user("ALICE", "other@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .register_user("bob", "alice@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .register_user("carol", "carol@example.com", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn authenticate_by_username_or_email() {
    let (engine, _db) = engine_with_db().await;
    let id = user(&engine, "alice").await;

    assert_eq!(engine.authenticate("alice", "password123").await.unwrap().id, id);
    assert_eq!(
        engine
            .authenticate("ALICE@example.com", "password123")
            .await
            .unwrap()
            .id,
        id
    );

    let wrong_password = engine.authenticate("alice", "nope-nope").await.unwrap_err();
    let unknown_user = engine.authenticate("nobody", "password123").await.unwrap_err();
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn profile_update_and_password_change() {
    let (engine, _db) = engine_with_db().await;
    let alice = user(&engine, "alice").await;
    user(&engine, "bob").await;

    let updated = engine
        .update_profile(
            &alice,
            ProfileUpdate {
                display_name: Some("  Alice A. ".to_string()),
                favorite_sport: Some("basketball_nba".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Alice A."));
    assert_eq!(updated.favorite_sport.as_deref(), Some("basketball_nba"));

    let err = engine
        .update_profile(
            &alice,
            ProfileUpdate {
                email: Some("bob@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .change_password(&alice, "wrong-password", "new-password")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    engine
        .change_password(&alice, "password123", "new-password")
        .await
        .unwrap();
    assert!(engine.authenticate("alice", "new-password").await.is_ok());
    assert!(engine.authenticate("alice", "password123").await.is_err());
}

#[tokio::test]
async fn mfa_lifecycle() {
    let (engine, _db) = engine_with_db().await;
    let alice = user(&engine, "alice").await;
    let now = Utc::now();

    let (secret, url) = engine.begin_mfa_setup(&alice).await.unwrap();
    assert!(url.starts_with("otpauth://totp/"));

    let model = engine.user(&alice).await.unwrap();
    assert!(!model.mfa_enabled);
    assert!(engine.verify_mfa(&model, "000000", now).unwrap());

    let err = engine.enable_mfa(&alice, "123", now).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let code = mfa::current_code(&secret, "alice", now).unwrap();
    engine.enable_mfa(&alice, &code, now).await.unwrap();

    let model = engine.user(&alice).await.unwrap();
    assert!(model.mfa_enabled);
    assert!(engine.verify_mfa(&model, &code, now).unwrap());
    let far_future = now + chrono::Duration::hours(1);
    assert!(!engine.verify_mfa(&model, &code, far_future).unwrap());

    engine.disable_mfa(&alice, &code, now).await.unwrap();
    let model = engine.user(&alice).await.unwrap();
    assert!(!model.mfa_enabled);
    assert!(model.mfa_secret.is_none());
}
