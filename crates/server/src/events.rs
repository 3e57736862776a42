//! Event endpoints: listing, creation, going live, resolution.

use api_types::event::{EventNew, EventStatus, EventView, Resolve, StatusUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::users;

use crate::{ServerError, leaderboard::invalidate_standings, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventView>>, ServerError> {
    let competition = state.engine.competition(&id, &user.id).await?;
    let completed = competition.competition.is_completed();
    let now = Utc::now();
    let events = state
        .engine
        .events(&id, &user.id)
        .await?
        .into_iter()
        .map(|event| views::event(event, completed, now))
        .collect::<Result<_, _>>()?;
    Ok(Json(events))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<EventNew>,
) -> Result<(StatusCode, Json<EventView>), ServerError> {
    let now = Utc::now();
    let event = state
        .engine
        .create_event(&id, &user.id, views::event_new(payload), now)
        .await?;
    state.cache.invalidate_prefix("dashboard:");
    Ok((StatusCode::CREATED, Json(views::event(event, false, now)?)))
}

pub async fn set_status(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<EventView>, ServerError> {
    let status = match payload.status {
        EventStatus::Upcoming => engine::EventStatus::Upcoming,
        EventStatus::Live => engine::EventStatus::Live,
        EventStatus::Completed => engine::EventStatus::Completed,
    };
    let event = state.engine.set_event_status(&id, &user.id, status).await?;
    state.cache.invalidate_prefix("dashboard:");
    Ok(Json(views::event(event, false, Utc::now())?))
}

pub async fn resolve(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<Resolve>,
) -> Result<Json<EventView>, ServerError> {
    let event = state
        .engine
        .resolve_event(&id, &user.id, &payload.winner)
        .await?;
    invalidate_standings(&state, &event.competition_id);
    Ok(Json(views::event(event, false, Utc::now())?))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_event(&id, &user.id).await?;
    state.cache.invalidate_prefix("leaderboard:");
    state.cache.invalidate_prefix("dashboard:");
    Ok(StatusCode::NO_CONTENT)
}
