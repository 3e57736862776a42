#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{CompetitionNew, Engine, EventNew};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Registers a user and returns its id.
pub async fn user(engine: &Engine, name: &str) -> String {
    engine
        .register_user(name, &format!("{name}@example.com"), "password123")
        .await
        .unwrap()
        .id
}

pub async fn make_admin(db: &DatabaseConnection, user_id: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE users SET is_admin = ? WHERE id = ?",
        vec![true.into(), user_id.into()],
    ))
    .await
    .unwrap();
}

pub fn competition_new(name: &str, is_public: bool) -> CompetitionNew {
    let starts_at = Utc::now();
    CompetitionNew {
        name: name.to_string(),
        description: None,
        is_public,
        starts_at,
        ends_at: starts_at + Duration::days(30),
        entry_fee_minor: 0,
        prize_pool_minor: 5_000,
    }
}

pub fn event_new(title: &str, event_date: DateTime<Utc>) -> EventNew {
    EventNew {
        sport: "soccer_epl".to_string(),
        title: title.to_string(),
        options: vec!["Home".to_string(), "Away".to_string(), "Draw".to_string()],
        event_date,
        points: Some(3),
    }
}

pub fn tomorrow() -> DateTime<Utc> {
    Utc::now() + Duration::days(1)
}
