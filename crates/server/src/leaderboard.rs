//! Standings. Competition boards are cached for 30 seconds and dropped
//! whenever scores or membership change.

use std::time::Duration;

use api_types::leaderboard::{GlobalQuery, GlobalRow, LeaderboardRow};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use engine::users;
use serde_json::Value;

use crate::{ServerError, server::ServerState, views};

pub(crate) const STANDINGS_TTL: Duration = Duration::from_secs(30);

/// Drops cached standings for one competition and every dashboard.
pub(crate) fn invalidate_standings(state: &ServerState, competition_id: &str) {
    state
        .cache
        .invalidate(&format!("leaderboard:{competition_id}"));
    state.cache.invalidate_prefix("dashboard:");
}

pub async fn competition(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let key = format!("leaderboard:{id}");
    if let Some(cached) = state.cache.get(&key) {
        // Visibility is checked on every request, cached or not.
        state.engine.competition(&id, &user.id).await?;
        return Ok(Json(cached));
    }
    let rows: Vec<LeaderboardRow> = state
        .engine
        .leaderboard(&id, &user.id)
        .await?
        .into_iter()
        .map(views::leaderboard_row)
        .collect();
    let value = serde_json::to_value(rows)
        .map_err(|err| ServerError::Generic(format!("failed to encode leaderboard: {err}")))?;
    state.cache.insert(key, value.clone(), STANDINGS_TTL);
    Ok(Json(value))
}

pub async fn global(
    State(state): State<ServerState>,
    Query(query): Query<GlobalQuery>,
) -> Result<Json<Vec<GlobalRow>>, ServerError> {
    let rows = state
        .engine
        .global_leaderboard(query.limit)
        .await?
        .into_iter()
        .map(views::global_row)
        .collect();
    Ok(Json(rows))
}
