use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    events::lock_reason,
    picks, users,
};

use super::{Engine, with_tx};

/// One member's pick on an event, shown once the event is locked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventPickView {
    pub user_id: String,
    pub username: String,
    pub selection: String,
    pub is_correct: Option<bool>,
    pub points_awarded: i64,
}

impl Engine {
    /// Creates or replaces the caller's pick for an event.
    pub async fn make_pick(
        &self,
        user_id: &str,
        competition_id: &str,
        event_id: &str,
        selection: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<picks::Model> {
        let selection = selection.trim();
        with_tx!(self, |db_tx| {
            let access = self.require_member(&db_tx, competition_id, user_id).await?;
            let event = self.require_event(&db_tx, event_id).await?;
            if event.competition_id != access.competition.id {
                return Err(EngineError::KeyNotFound("event not exists".to_string()));
            }
            if let Some(reason) = lock_reason(&event, access.competition.is_completed(), now) {
                return Err(EngineError::Locked(reason.to_string()));
            }
            if !event.has_option(selection)? {
                return Err(EngineError::InvalidInput(format!(
                    "selection must be one of the event options, got {selection}"
                )));
            }

            let existing = picks::Entity::find()
                .filter(picks::Column::UserId.eq(user_id.to_string()))
                .filter(picks::Column::EventId.eq(event_id.to_string()))
                .filter(picks::Column::CompetitionId.eq(competition_id.to_string()))
                .one(&db_tx)
                .await?;
            let model = match existing {
                Some(pick) => {
                    let mut active: picks::ActiveModel = pick.into();
                    active.selection = ActiveValue::Set(selection.to_string());
                    active.updated_at = ActiveValue::Set(now);
                    active.update(&db_tx).await?
                }
                None => {
                    picks::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4().to_string()),
                        user_id: ActiveValue::Set(user_id.to_string()),
                        event_id: ActiveValue::Set(event_id.to_string()),
                        competition_id: ActiveValue::Set(competition_id.to_string()),
                        selection: ActiveValue::Set(selection.to_string()),
                        is_correct: ActiveValue::Set(None),
                        points_awarded: ActiveValue::Set(0),
                        created_at: ActiveValue::Set(now),
                        updated_at: ActiveValue::Set(now),
                    }
                    .insert(&db_tx)
                    .await?
                }
            };
            tracing::debug!(user_id, event_id, "pick stored");
            Ok(model)
        })
    }

    /// The caller's own picks in a competition.
    pub async fn user_picks(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<picks::Model>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, competition_id, user_id).await?;
            picks::Entity::find()
                .filter(picks::Column::CompetitionId.eq(competition_id.to_string()))
                .filter(picks::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(picks::Column::CreatedAt)
                .all(&db_tx)
                .await
                .map_err(EngineError::from)
        })
    }

    /// Everyone's picks on an event. Hidden while picks are still open.
    pub async fn event_picks(
        &self,
        event_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<EventPickView>> {
        with_tx!(self, |db_tx| {
            let event = self.require_event(&db_tx, event_id).await?;
            let access = self
                .require_competition_read(&db_tx, &event.competition_id, user_id)
                .await?;
            if lock_reason(&event, access.competition.is_completed(), now).is_none() {
                return Err(EngineError::Forbidden(
                    "picks are hidden until the event locks".to_string(),
                ));
            }
            let rows = picks::Entity::find()
                .filter(picks::Column::EventId.eq(event.id.clone()))
                .order_by_asc(picks::Column::CreatedAt)
                .find_also_related(users::Entity)
                .all(&db_tx)
                .await?;
            Ok(rows
                .into_iter()
                .filter_map(|(pick, user)| {
                    user.map(|user| EventPickView {
                        user_id: user.id,
                        username: user.username,
                        selection: pick.selection,
                        is_correct: pick.is_correct,
                        points_awarded: pick.points_awarded,
                    })
                })
                .collect())
        })
    }
}
