//! Membership management inside a competition (commissioner-only writes).

use api_types::member::{MemberView, RoleUpdate};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::users;

use crate::{ServerError, leaderboard::invalidate_standings, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MemberView>>, ServerError> {
    let members = state
        .engine
        .members(&id, &user.id)
        .await?
        .into_iter()
        .map(views::member)
        .collect();
    Ok(Json(members))
}

pub async fn set_role(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((id, target)): Path<(String, String)>,
    Json(payload): Json<RoleUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_member_role(&id, &target, views::engine_member_role(payload.role), &user.id)
        .await?;
    state.cache.invalidate(&format!("dashboard:{target}"));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((id, target)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    state.engine.remove_member(&id, &target, &user.id).await?;
    invalidate_standings(&state, &id);
    Ok(StatusCode::NO_CONTENT)
}
