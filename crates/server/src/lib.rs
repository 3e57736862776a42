use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use sea_orm::SqlErr;

pub use cache::TtlCache;
pub use config::{DEFAULT_TOKEN_TTL_HOURS, ServerConfig, SportsConfig, StripeConfig};
pub use server::{ServerState, router, run_with_listener, spawn_with_listener};
pub use sports::{SPORTS, SportsClient};

mod account;
mod admin;
mod auth;
mod cache;
mod chat;
mod competitions;
mod config;
mod dashboard;
mod events;
mod jwt;
mod leaderboard;
mod members;
mod notifications;
mod payments;
mod picks;
mod server;
mod sports;
mod views;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Credentials were fine but the account needs a TOTP code.
    MfaRequired,
    Unauthorized(String),
    /// A third-party API (sports feed, payment provider) failed.
    Upstream(String),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        EngineError::ExistingKey(_)
        | EngineError::InvalidRole(_)
        | EngineError::AlreadyResolved(_) => StatusCode::CONFLICT,
        EngineError::Locked(_) => StatusCode::LOCKED,
        EngineError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
        EngineError::InvalidInput(_) | EngineError::InvalidId(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::Database(db_err)
            if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
        {
            StatusCode::CONFLICT
        }
        EngineError::Database(_) | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                return "already present".to_string();
            }
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Internal(msg) => {
            tracing::error!("internal error: {msg}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, mfa_required) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                message_for_engine_error(err),
                false,
            ),
            ServerError::MfaRequired => (
                StatusCode::UNAUTHORIZED,
                "mfa code required".to_string(),
                true,
            ),
            ServerError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err, false),
            ServerError::Upstream(err) => {
                tracing::warn!("upstream failure: {err}");
                (StatusCode::BAD_GATEWAY, err, false)
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err, false),
        };

        (
            status,
            Json(ErrorBody {
                error,
                mfa_required,
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_errors_map_to_statuses() {
        let s = || "x".to_string();
        assert_eq!(status(EngineError::KeyNotFound(s())), StatusCode::NOT_FOUND);
        assert_eq!(status(EngineError::Forbidden(s())), StatusCode::FORBIDDEN);
        assert_eq!(status(EngineError::Unauthorized(s())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(EngineError::ExistingKey(s())), StatusCode::CONFLICT);
        assert_eq!(status(EngineError::InvalidRole(s())), StatusCode::CONFLICT);
        assert_eq!(status(EngineError::AlreadyResolved(s())), StatusCode::CONFLICT);
        assert_eq!(status(EngineError::Locked(s())), StatusCode::LOCKED);
        assert_eq!(
            status(EngineError::PaymentRequired(s())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status(EngineError::InvalidInput(s())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(EngineError::Internal(s())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn mfa_required_is_401() {
        let res = ServerError::MfaRequired.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_maps_to_502() {
        let res = ServerError::Upstream("down".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
