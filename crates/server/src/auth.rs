//! Registration and login. Both answer with a bearer token.

use api_types::auth::{Login, Register, TokenResponse};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use engine::users;

use crate::{ServerError, jwt, server::ServerState, views};

fn token_response(state: &ServerState, user: users::Model) -> Result<TokenResponse, ServerError> {
    let (token, expires_at) = jwt::issue(
        &state.config.jwt_secret,
        &user.id,
        state.config.token_ttl_hours,
    )
    .map_err(|err| {
        tracing::error!("failed to sign token: {err}");
        ServerError::Engine(engine::EngineError::Internal(
            "failed to sign token".to_string(),
        ))
    })?;
    Ok(TokenResponse {
        token,
        expires_at,
        user: views::profile(user),
    })
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<(StatusCode, Json<TokenResponse>), ServerError> {
    let user = state
        .engine
        .register_user(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(token_response(&state, user)?)))
}

/// Accounts with MFA need `code`; without it the answer is 401 with
/// `mfa_required` set.
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<Login>,
) -> Result<Json<TokenResponse>, ServerError> {
    let user = state
        .engine
        .authenticate(&payload.login, &payload.password)
        .await?;
    if user.mfa_enabled {
        let Some(code) = payload.code.as_deref() else {
            return Err(ServerError::MfaRequired);
        };
        if !state.engine.verify_mfa(&user, code, Utc::now())? {
            return Err(ServerError::Unauthorized("invalid mfa code".to_string()));
        }
    }
    tracing::debug!(user_id = %user.id, "login");
    Ok(Json(token_response(&state, user)?))
}
