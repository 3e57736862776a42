//! Competition endpoints.

use api_types::competition::{
    CompetitionNew, CompetitionUpdate, CompetitionView, InviteCode, JoinByCode, JoinRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::users;

use crate::{ServerError, leaderboard::invalidate_standings, server::ServerState, views};

pub async fn list_public(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CompetitionView>>, ServerError> {
    let competitions = state
        .engine
        .public_competitions(&user.id)
        .await?
        .into_iter()
        .map(views::competition_detail)
        .collect::<Result<_, _>>()?;
    Ok(Json(competitions))
}

pub async fn list_mine(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CompetitionView>>, ServerError> {
    let competitions = state
        .engine
        .user_competitions(&user.id)
        .await?
        .into_iter()
        .map(views::competition_detail)
        .collect::<Result<_, _>>()?;
    Ok(Json(competitions))
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CompetitionNew>,
) -> Result<(StatusCode, Json<CompetitionView>), ServerError> {
    let competition = state
        .engine
        .create_competition(
            &user.id,
            engine::CompetitionNew {
                name: payload.name,
                description: payload.description,
                is_public: payload.is_public,
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
                entry_fee_minor: payload.entry_fee_minor,
                prize_pool_minor: payload.prize_pool_minor,
            },
        )
        .await?;
    let detail = state.engine.competition(&competition.id, &user.id).await?;
    state.cache.invalidate(&format!("dashboard:{}", user.id));
    Ok((StatusCode::CREATED, Json(views::competition_detail(detail)?)))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<CompetitionView>, ServerError> {
    let detail = state.engine.competition(&id, &user.id).await?;
    Ok(Json(views::competition_detail(detail)?))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<CompetitionUpdate>,
) -> Result<Json<CompetitionView>, ServerError> {
    state
        .engine
        .update_competition(
            &id,
            &user.id,
            engine::CompetitionUpdate {
                name: payload.name,
                description: payload.description,
                is_public: payload.is_public,
                starts_at: payload.starts_at,
                ends_at: payload.ends_at,
                entry_fee_minor: payload.entry_fee_minor,
                prize_pool_minor: payload.prize_pool_minor,
            },
        )
        .await?;
    let detail = state.engine.competition(&id, &user.id).await?;
    Ok(Json(views::competition_detail(detail)?))
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_competition(&id, &user.id).await?;
    invalidate_standings(&state, &id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Option<Json<JoinRequest>>,
) -> Result<Json<CompetitionView>, ServerError> {
    let invite_code = payload.and_then(|Json(body)| body.invite_code);
    state
        .engine
        .join_competition(&id, &user.id, invite_code.as_deref())
        .await?;
    invalidate_standings(&state, &id);
    let detail = state.engine.competition(&id, &user.id).await?;
    Ok(Json(views::competition_detail(detail)?))
}

pub async fn join_by_code(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<JoinByCode>,
) -> Result<Json<CompetitionView>, ServerError> {
    let competition = state
        .engine
        .join_by_invite_code(&payload.invite_code, &user.id)
        .await?;
    invalidate_standings(&state, &competition.id);
    let detail = state.engine.competition(&competition.id, &user.id).await?;
    Ok(Json(views::competition_detail(detail)?))
}

pub async fn leave(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.leave_competition(&id, &user.id).await?;
    invalidate_standings(&state, &id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<CompetitionView>, ServerError> {
    state.engine.complete_competition(&id, &user.id).await?;
    invalidate_standings(&state, &id);
    let detail = state.engine.competition(&id, &user.id).await?;
    Ok(Json(views::competition_detail(detail)?))
}

pub async fn regenerate_invite_code(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<InviteCode>, ServerError> {
    let invite_code = state.engine.regenerate_invite_code(&id, &user.id).await?;
    Ok(Json(InviteCode { invite_code }))
}
