use axum::{
    Extension, Json, Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use std::sync::Arc;

use crate::{
    ServerError, account, admin, auth, cache::TtlCache, chat, competitions, config::ServerConfig,
    dashboard, events, jwt, leaderboard, members, notifications, payments, picks,
    sports::SportsClient,
};
use engine::{Engine, EngineError, users};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub config: Arc<ServerConfig>,
    pub cache: TtlCache,
    pub sports: SportsClient,
    pub http: reqwest::Client,
}

impl ServerState {
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            sports: SportsClient::new(http.clone(), config.sports.clone()),
            engine: Arc::new(engine),
            config: Arc::new(config),
            cache: TtlCache::new(),
            http,
        }
    }
}

/// Resolves the bearer token to a user and stores it in the request
/// extensions.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(ServerError::Unauthorized("missing bearer token".to_string()));
    };
    let claims = jwt::verify(&state.config.jwt_secret, bearer.token())
        .map_err(|_| ServerError::Unauthorized("invalid token".to_string()))?;

    let user = match state.engine.user(&claims.sub).await {
        Ok(user) => user,
        Err(EngineError::KeyNotFound(_)) => {
            return Err(ServerError::Unauthorized("unknown user".to_string()));
        }
        Err(err) => return Err(err.into()),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn require_admin(
    Extension(user): Extension<users::Model>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    if !user.is_admin {
        return Err(EngineError::Forbidden("admin only".to_string()).into());
    }
    Ok(next.run(request).await)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors(config: &ServerConfig) -> CorsLayer {
    let Some(origin) = config.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(err) => {
            tracing::warn!("invalid cors origin {origin}: {err}, allowing any");
            CorsLayer::permissive()
        }
    }
}

pub fn router(state: ServerState) -> Router {
    let admin = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route(
            "/admin/users/{id}",
            patch(admin::update_user).delete(admin::delete_user),
        )
        .route("/admin/competitions", get(admin::competitions))
        .route("/admin/stats", get(admin::stats))
        .route_layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .route("/account", get(account::get).patch(account::update))
        .route("/account/password", post(account::change_password))
        .route("/account/mfa/setup", post(account::mfa_setup))
        .route("/account/mfa/enable", post(account::mfa_enable))
        .route("/account/mfa/disable", post(account::mfa_disable))
        .route("/dashboard", get(dashboard::get))
        .route(
            "/competitions",
            get(competitions::list_public).post(competitions::create),
        )
        .route("/competitions/mine", get(competitions::list_mine))
        .route("/competitions/join", post(competitions::join_by_code))
        .route(
            "/competitions/{id}",
            get(competitions::get)
                .patch(competitions::update)
                .delete(competitions::delete),
        )
        .route("/competitions/{id}/join", post(competitions::join))
        .route("/competitions/{id}/leave", post(competitions::leave))
        .route("/competitions/{id}/complete", post(competitions::complete))
        .route(
            "/competitions/{id}/invite-code",
            post(competitions::regenerate_invite_code),
        )
        .route("/competitions/{id}/members", get(members::list))
        .route(
            "/competitions/{id}/members/{user_id}",
            patch(members::set_role).delete(members::remove),
        )
        .route(
            "/competitions/{id}/events",
            get(events::list).post(events::create),
        )
        .route(
            "/events/{id}",
            patch(events::set_status).delete(events::delete),
        )
        .route("/events/{id}/resolve", post(events::resolve))
        .route("/events/{id}/picks", get(picks::event_picks))
        .route(
            "/competitions/{id}/picks",
            get(picks::mine).post(picks::make),
        )
        .route(
            "/competitions/{id}/leaderboard",
            get(leaderboard::competition),
        )
        .route("/leaderboard", get(leaderboard::global))
        .route(
            "/competitions/{id}/messages",
            get(chat::list).post(chat::post),
        )
        .route(
            "/competitions/{id}/event-requests",
            post(chat::request_event),
        )
        .route("/messages/{id}/review", post(chat::review))
        .route("/notifications", get(notifications::list))
        .route("/notifications/read-all", post(notifications::read_all))
        .route("/notifications/{id}/read", post(notifications::read))
        .route("/payments", get(payments::list))
        .route("/competitions/{id}/checkout", post(payments::checkout))
        .route("/odds", get(crate::sports::odds))
        .route("/scores", get(crate::sports::scores))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/payments/webhook", post(payments::webhook))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.config))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
