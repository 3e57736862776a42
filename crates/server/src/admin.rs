//! Site administration. Routed behind `require_admin`, and the engine
//! checks the flag again.

use api_types::{
    account::Profile,
    admin::{AdminUpdate, SiteStats},
    competition::CompetitionView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::users;

use crate::{ServerError, server::ServerState, views};

pub async fn list_users(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Profile>>, ServerError> {
    let users = state
        .engine
        .list_users(&user.id)
        .await?
        .into_iter()
        .map(views::profile)
        .collect();
    Ok(Json(users))
}

pub async fn update_user(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<AdminUpdate>,
) -> Result<Json<Profile>, ServerError> {
    let updated = state
        .engine
        .set_admin(&user.id, &id, payload.is_admin)
        .await?;
    Ok(Json(views::profile(updated)))
}

pub async fn delete_user(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_user(&user.id, &id).await?;
    state.cache.invalidate_prefix("leaderboard:");
    state.cache.invalidate_prefix("dashboard:");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn competitions(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CompetitionView>>, ServerError> {
    let competitions = state
        .engine
        .all_competitions(&user.id)
        .await?
        .into_iter()
        .map(|model| views::competition(model, true))
        .collect::<Result<_, _>>()?;
    Ok(Json(competitions))
}

pub async fn stats(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<SiteStats>, ServerError> {
    let stats = state.engine.site_stats(&user.id).await?;
    Ok(Json(SiteStats {
        users: stats.users,
        competitions: stats.competitions,
        events: stats.events,
        picks: stats.picks,
        payment_volume_minor: stats.payment_volume_minor,
    }))
}
