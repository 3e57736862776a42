use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, ResultEngine, events,
    events::{EventNew, validate_event_new},
    messages::{self, MessageKind, RequestStatus, normalize_content, page_size},
    notifications::NotificationKind,
};

use super::{Engine, with_tx};

impl Engine {
    async fn insert_message(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
        kind: MessageKind,
        content: String,
        payload: Option<String>,
    ) -> ResultEngine<messages::Model> {
        let status = match kind {
            MessageKind::Chat => None,
            MessageKind::EventRequest => Some(RequestStatus::Pending.as_str().to_string()),
        };
        messages::ActiveModel {
            competition_id: ActiveValue::Set(competition_id.to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            content: ActiveValue::Set(content),
            payload: ActiveValue::Set(payload),
            status: ActiveValue::Set(status),
            reviewed_by: ActiveValue::Set(None),
            created_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(Into::into)
    }

    pub async fn post_message(
        &self,
        competition_id: &str,
        user_id: &str,
        content: &str,
    ) -> ResultEngine<messages::Model> {
        let content = normalize_content(content)?;
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, competition_id, user_id).await?;
            self.insert_message(
                &db_tx,
                competition_id,
                user_id,
                MessageKind::Chat,
                content,
                None,
            )
            .await
        })
    }

    /// Messages after `after` (exclusive) in posting order. Pollers pass the
    /// last id they have seen.
    pub async fn messages(
        &self,
        competition_id: &str,
        user_id: &str,
        after: Option<i64>,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<messages::Model>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, competition_id, user_id).await?;
            let mut query = messages::Entity::find()
                .filter(messages::Column::CompetitionId.eq(competition_id.to_string()));
            if let Some(after) = after {
                query = query.filter(messages::Column::Id.gt(after));
            }
            query
                .order_by_asc(messages::Column::Id)
                .limit(page_size(limit))
                .all(&db_tx)
                .await
                .map_err(EngineError::from)
        })
    }

    /// Proposes an event for the commissioners to approve.
    pub async fn request_event(
        &self,
        competition_id: &str,
        user_id: &str,
        input: EventNew,
        now: DateTime<Utc>,
    ) -> ResultEngine<messages::Model> {
        validate_event_new(&input, now)?;
        let payload = serde_json::to_string(&input)?;
        let content = normalize_content(&format!("Event request: {}", input.title.trim()))?;
        with_tx!(self, |db_tx| {
            let access = self.require_member(&db_tx, competition_id, user_id).await?;
            if access.competition.is_completed() {
                return Err(EngineError::InvalidInput(
                    "competition is completed".to_string(),
                ));
            }
            self.insert_message(
                &db_tx,
                competition_id,
                user_id,
                MessageKind::EventRequest,
                content,
                Some(payload),
            )
            .await
        })
    }

    /// Approves or rejects a pending request. Approval creates the event.
    pub async fn review_event_request(
        &self,
        message_id: i64,
        user_id: &str,
        approve: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<(messages::Model, Option<events::Model>)> {
        with_tx!(self, |db_tx| {
            let message = messages::Entity::find_by_id(message_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("message not exists".to_string()))?;
            let access = self
                .require_commissioner(&db_tx, &message.competition_id, user_id, false)
                .await?;
            if message.kind()? != MessageKind::EventRequest {
                return Err(EngineError::InvalidInput(
                    "message is not an event request".to_string(),
                ));
            }
            if message.request_status()? != Some(RequestStatus::Pending) {
                return Err(EngineError::AlreadyResolved(
                    "event request was already reviewed".to_string(),
                ));
            }

            let event = if approve {
                let input = message.event_request()?.ok_or_else(|| {
                    EngineError::Internal("event request without payload".to_string())
                })?;
                Some(
                    self.insert_event(&db_tx, &message.competition_id, &input, now)
                        .await?,
                )
            } else {
                None
            };

            let status = if approve {
                RequestStatus::Approved
            } else {
                RequestStatus::Rejected
            };
            let requester = message.user_id.clone();
            let title = message.content.clone();
            let mut active: messages::ActiveModel = message.into();
            active.status = ActiveValue::Set(Some(status.as_str().to_string()));
            active.reviewed_by = ActiveValue::Set(Some(user_id.to_string()));
            let message = active.update(&db_tx).await?;

            self.notify(
                &db_tx,
                &requester,
                NotificationKind::EventRequestReviewed,
                "Event request reviewed",
                &format!("{title} was {}.", status.as_str()),
                Some(&format!("/competitions/{}", access.competition.id)),
            )
            .await?;
            tracing::info!(message_id, status = status.as_str(), "reviewed event request");
            Ok((message, event))
        })
    }
}
