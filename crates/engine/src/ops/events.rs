use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, competition_users,
    events::{self, DEFAULT_EVENT_POINTS, EventNew, EventStatus, validate_event_new},
    notifications::NotificationKind,
    picks,
};

use super::{Engine, access::CompetitionAccess, with_tx};

impl Engine {
    async fn event_access(
        &self,
        db: &DatabaseTransaction,
        event_id: &str,
        user_id: &str,
    ) -> ResultEngine<(events::Model, CompetitionAccess)> {
        let event = self.require_event(db, event_id).await?;
        let access = self
            .require_commissioner(db, &event.competition_id, user_id, true)
            .await?;
        Ok((event, access))
    }

    pub(super) async fn insert_event(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        input: &EventNew,
        now: DateTime<Utc>,
    ) -> ResultEngine<events::Model> {
        let options = validate_event_new(input, now)?;
        let model = events::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            competition_id: ActiveValue::Set(competition_id.to_string()),
            sport: ActiveValue::Set(input.sport.trim().to_string()),
            title: ActiveValue::Set(input.title.trim().to_string()),
            options: ActiveValue::Set(serde_json::to_string(&options)?),
            event_date: ActiveValue::Set(input.event_date),
            status: ActiveValue::Set(EventStatus::Upcoming.as_str().to_string()),
            winner: ActiveValue::Set(None),
            points: ActiveValue::Set(input.points.unwrap_or(DEFAULT_EVENT_POINTS)),
            created_at: ActiveValue::Set(now),
        }
        .insert(db)
        .await?;
        tracing::info!(event_id = %model.id, competition_id, "created event {}", model.title);
        Ok(model)
    }

    pub async fn create_event(
        &self,
        competition_id: &str,
        user_id: &str,
        input: EventNew,
        now: DateTime<Utc>,
    ) -> ResultEngine<events::Model> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_commissioner(&db_tx, competition_id, user_id, true)
                .await?;
            if access.competition.is_completed() {
                return Err(EngineError::InvalidInput(
                    "competition is completed".to_string(),
                ));
            }
            self.insert_event(&db_tx, competition_id, &input, now).await
        })
    }

    /// Events of a competition by start time.
    pub async fn events(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<events::Model>> {
        with_tx!(self, |db_tx| {
            self.require_competition_read(&db_tx, competition_id, user_id)
                .await?;
            events::Entity::find()
                .filter(events::Column::CompetitionId.eq(competition_id.to_string()))
                .order_by_asc(events::Column::EventDate)
                .all(&db_tx)
                .await
                .map_err(EngineError::from)
        })
    }

    /// Only `upcoming -> live` is allowed here; events complete through
    /// [`Engine::resolve_event`].
    pub async fn set_event_status(
        &self,
        event_id: &str,
        user_id: &str,
        status: EventStatus,
    ) -> ResultEngine<events::Model> {
        if status != EventStatus::Live {
            return Err(EngineError::InvalidInput(
                "events can only be moved to live; resolve them to complete".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let (event, _) = self.event_access(&db_tx, event_id, user_id).await?;
            if event.status()? != EventStatus::Upcoming {
                return Err(EngineError::InvalidInput(
                    "only upcoming events can go live".to_string(),
                ));
            }
            let mut active: events::ActiveModel = event.into();
            active.status = ActiveValue::Set(status.as_str().to_string());
            active.update(&db_tx).await.map_err(EngineError::from)
        })
    }

    /// Settles an event: every pick is marked, correct ones earn the event's
    /// points, and the points land on the members' scores.
    pub async fn resolve_event(
        &self,
        event_id: &str,
        user_id: &str,
        winner: &str,
    ) -> ResultEngine<events::Model> {
        let winner = winner.trim();
        with_tx!(self, |db_tx| {
            let (event, access) = self.event_access(&db_tx, event_id, user_id).await?;
            if event.status()? == EventStatus::Completed {
                return Err(EngineError::AlreadyResolved(
                    "event is already resolved".to_string(),
                ));
            }
            if !event.has_option(winner)? {
                return Err(EngineError::InvalidInput(format!(
                    "winner must be one of the event options, got {winner}"
                )));
            }

            let points = event.points;
            let title = event.title.clone();
            let mut active: events::ActiveModel = event.into();
            active.status = ActiveValue::Set(EventStatus::Completed.as_str().to_string());
            active.winner = ActiveValue::Set(Some(winner.to_string()));
            let event = active.update(&db_tx).await?;

            let event_picks = picks::Entity::find()
                .filter(picks::Column::EventId.eq(event.id.clone()))
                .all(&db_tx)
                .await?;
            let now = Utc::now();
            for pick in event_picks {
                let correct = pick.selection == winner;
                let awarded = if correct { points } else { 0 };
                let picker = pick.user_id.clone();
                let mut active: picks::ActiveModel = pick.into();
                active.is_correct = ActiveValue::Set(Some(correct));
                active.points_awarded = ActiveValue::Set(awarded);
                active.updated_at = ActiveValue::Set(now);
                active.update(&db_tx).await?;

                if awarded != 0 {
                    competition_users::Entity::update_many()
                        .col_expr(
                            competition_users::Column::Score,
                            Expr::col(competition_users::Column::Score).add(awarded),
                        )
                        .filter(
                            competition_users::Column::CompetitionId
                                .eq(event.competition_id.clone()),
                        )
                        .filter(competition_users::Column::UserId.eq(picker.clone()))
                        .exec(&db_tx)
                        .await?;
                }

                let body = if correct {
                    format!("{title}: {winner} won. You earned {awarded} points.")
                } else {
                    format!("{title}: {winner} won. Better luck next time.")
                };
                self.notify(
                    &db_tx,
                    &picker,
                    NotificationKind::EventResolved,
                    "Event resolved",
                    &body,
                    Some(&format!("/competitions/{}", access.competition.id)),
                )
                .await?;
            }

            tracing::info!(event_id = %event.id, winner, "resolved event");
            Ok(event)
        })
    }

    /// Deletes an event and its picks, taking back any points it awarded.
    pub async fn delete_event(&self, event_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let (event, _) = self.event_access(&db_tx, event_id, user_id).await?;
            let awarded = picks::Entity::find()
                .filter(picks::Column::EventId.eq(event.id.clone()))
                .filter(picks::Column::PointsAwarded.ne(0))
                .all(&db_tx)
                .await?;
            for pick in awarded {
                competition_users::Entity::update_many()
                    .col_expr(
                        competition_users::Column::Score,
                        Expr::col(competition_users::Column::Score).sub(pick.points_awarded),
                    )
                    .filter(competition_users::Column::CompetitionId.eq(pick.competition_id))
                    .filter(competition_users::Column::UserId.eq(pick.user_id))
                    .exec(&db_tx)
                    .await?;
            }
            picks::Entity::delete_many()
                .filter(picks::Column::EventId.eq(event.id.clone()))
                .exec(&db_tx)
                .await?;
            events::Entity::delete_by_id(event.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(event_id = %event.id, "deleted event");
            Ok(())
        })
    }
}
