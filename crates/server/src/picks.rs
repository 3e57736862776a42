use api_types::pick::{EventPick, PickNew, PickView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use engine::users;

use crate::{ServerError, server::ServerState, views};

pub async fn make(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<PickNew>,
) -> Result<Json<PickView>, ServerError> {
    let pick = state
        .engine
        .make_pick(&user.id, &id, &payload.event_id, &payload.selection, Utc::now())
        .await?;
    state.cache.invalidate(&format!("dashboard:{}", user.id));
    Ok(Json(views::pick(pick)))
}

pub async fn mine(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PickView>>, ServerError> {
    let picks = state
        .engine
        .user_picks(&id, &user.id)
        .await?
        .into_iter()
        .map(views::pick)
        .collect();
    Ok(Json(picks))
}

pub async fn event_picks(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventPick>>, ServerError> {
    let picks = state
        .engine
        .event_picks(&id, &user.id, Utc::now())
        .await?
        .into_iter()
        .map(views::event_pick)
        .collect();
    Ok(Json(picks))
}
