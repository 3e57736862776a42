use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    ResultEngine, competition_users,
    competition_users::MemberRole,
    competitions, events,
    events::{EventStatus, lock_reason},
    notifications, picks,
};

use super::{Engine, with_tx};

#[derive(Clone, Debug)]
pub struct DashboardCompetition {
    pub competition: competitions::Model,
    pub role: MemberRole,
    pub score: i64,
    pub rank: u64,
    pub member_count: u64,
}

/// Landing page summary for one user.
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub competitions: Vec<DashboardCompetition>,
    /// Upcoming events that are still open and lack the user's pick.
    pub open_events: Vec<events::Model>,
    pub unread_notifications: u64,
}

impl Engine {
    pub async fn dashboard(&self, user_id: &str, now: DateTime<Utc>) -> ResultEngine<Dashboard> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let memberships = competition_users::Entity::find()
                .filter(competition_users::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(competition_users::Column::JoinedAt)
                .find_also_related(competitions::Entity)
                .all(&db_tx)
                .await?;

            let picked: HashSet<String> = picks::Entity::find()
                .filter(picks::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|p| p.event_id)
                .collect();

            let mut competitions = Vec::with_capacity(memberships.len());
            let mut open_events = Vec::new();
            for (membership, competition) in memberships {
                let Some(competition) = competition else {
                    continue;
                };
                let ranked = self.ranked_members(&db_tx, &competition.id).await?;
                let rank = ranked
                    .iter()
                    .find(|e| e.user_id == user_id)
                    .map(|e| e.rank)
                    .unwrap_or_default();

                let upcoming = events::Entity::find()
                    .filter(events::Column::CompetitionId.eq(competition.id.clone()))
                    .filter(events::Column::Status.eq(EventStatus::Upcoming.as_str()))
                    .order_by_asc(events::Column::EventDate)
                    .all(&db_tx)
                    .await?;
                let completed = competition.is_completed();
                open_events.extend(upcoming.into_iter().filter(|event| {
                    !picked.contains(&event.id) && lock_reason(event, completed, now).is_none()
                }));

                competitions.push(DashboardCompetition {
                    role: membership.role()?,
                    score: membership.score,
                    rank,
                    member_count: ranked.len() as u64,
                    competition,
                });
            }
            open_events.sort_by(|a, b| a.event_date.cmp(&b.event_date));

            let unread_notifications = notifications::Entity::find()
                .filter(notifications::Column::UserId.eq(user_id.to_string()))
                .filter(notifications::Column::Read.eq(false))
                .count(&db_tx)
                .await?;

            Ok(Dashboard {
                competitions,
                open_events,
                unread_notifications,
            })
        })
    }
}
