use api_types::notification::{MarkedRead, NotificationView, NotificationsQuery};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::users;

use crate::{ServerError, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationView>>, ServerError> {
    let notifications = state
        .engine
        .notifications(&user.id, query.unread)
        .await?
        .into_iter()
        .map(views::notification)
        .collect();
    Ok(Json(notifications))
}

pub async fn read(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.mark_notification_read(&user.id, &id).await?;
    state.cache.invalidate(&format!("dashboard:{}", user.id));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn read_all(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<MarkedRead>, ServerError> {
    let updated = state.engine.mark_all_notifications_read(&user.id).await?;
    state.cache.invalidate(&format!("dashboard:{}", user.id));
    Ok(Json(MarkedRead { updated }))
}
