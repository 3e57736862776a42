//! Competition chat and event requests. Clients poll with `after` set to
//! the last id they have seen.

use api_types::{
    chat::{MessageNew, MessageView, MessagesQuery, Review, ReviewResponse},
    event::EventNew,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::users;

use crate::{ServerError, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageView>>, ServerError> {
    let messages = state
        .engine
        .messages(&id, &user.id, query.after, query.limit)
        .await?
        .into_iter()
        .map(views::message)
        .collect::<Result<_, _>>()?;
    Ok(Json(messages))
}

pub async fn post(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<MessageNew>,
) -> Result<(StatusCode, Json<MessageView>), ServerError> {
    let message = state
        .engine
        .post_message(&id, &user.id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(views::message(message)?)))
}

pub async fn request_event(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<EventNew>,
) -> Result<(StatusCode, Json<MessageView>), ServerError> {
    let message = state
        .engine
        .request_event(&id, &user.id, views::event_new(payload), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(views::message(message)?)))
}

pub async fn review(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<Review>,
) -> Result<Json<ReviewResponse>, ServerError> {
    let now = Utc::now();
    let (message, event) = state
        .engine
        .review_event_request(id, &user.id, payload.approve, now)
        .await?;
    if event.is_some() {
        state.cache.invalidate_prefix("dashboard:");
    }
    Ok(Json(ReviewResponse {
        message: views::message(message)?,
        event: event.map(|event| views::event(event, false, now)).transpose()?,
    }))
}
