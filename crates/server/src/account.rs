//! The caller's own profile, password and MFA settings.

use api_types::account::{MfaCode, MfaSetup, PasswordChange, Profile, ProfileUpdate};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use engine::users;

use crate::{ServerError, server::ServerState, views};

pub async fn get(Extension(user): Extension<users::Model>) -> Json<Profile> {
    Json(views::profile(user))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ServerError> {
    let updated = state
        .engine
        .update_profile(
            &user.id,
            engine::ProfileUpdate {
                email: payload.email,
                display_name: payload.display_name,
                bio: payload.bio,
                favorite_sport: payload.favorite_sport,
            },
        )
        .await?;
    Ok(Json(views::profile(updated)))
}

pub async fn change_password(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PasswordChange>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .change_password(&user.id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mfa_setup(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<MfaSetup>, ServerError> {
    let (secret, otpauth_url) = state.engine.begin_mfa_setup(&user.id).await?;
    Ok(Json(MfaSetup {
        secret,
        otpauth_url,
    }))
}

pub async fn mfa_enable(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MfaCode>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .enable_mfa(&user.id, &payload.code, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mfa_disable(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<MfaCode>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .disable_mfa(&user.id, &payload.code, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
