use api_types::dashboard::{Dashboard, DashboardCompetition};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::users;
use serde_json::Value;

use crate::{ServerError, leaderboard::STANDINGS_TTL, server::ServerState, views};

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Value>, ServerError> {
    let key = format!("dashboard:{}", user.id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let now = Utc::now();
    let dashboard = state.engine.dashboard(&user.id, now).await?;
    let competitions = dashboard
        .competitions
        .into_iter()
        .map(|entry| {
            let mut competition = views::competition(entry.competition, true)?;
            competition.member_count = Some(entry.member_count);
            competition.role = Some(views::member_role(entry.role));
            Ok(DashboardCompetition {
                competition,
                score: entry.score,
                rank: entry.rank,
            })
        })
        .collect::<Result<_, ServerError>>()?;
    let open_events = dashboard
        .open_events
        .into_iter()
        .map(|event| views::event(event, false, now))
        .collect::<Result<_, _>>()?;
    let body = Dashboard {
        competitions,
        open_events,
        unread_notifications: dashboard.unread_notifications,
    };

    let value = serde_json::to_value(body)
        .map_err(|err| ServerError::Generic(format!("failed to encode dashboard: {err}")))?;
    state.cache.insert(key, value.clone(), STANDINGS_TTL);
    Ok(Json(value))
}
