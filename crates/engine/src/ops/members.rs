use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ResultEngine, competition_users,
    competition_users::{MemberRole, would_orphan},
    notifications::NotificationKind,
    picks, users,
};

use super::{Engine, with_tx};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberEntry {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub role: MemberRole,
    pub score: i64,
    pub joined_at: DateTime<Utc>,
}

impl Engine {
    /// Members in join order.
    pub async fn members(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<MemberEntry>> {
        with_tx!(self, |db_tx| {
            self.require_competition_read(&db_tx, competition_id, user_id)
                .await?;
            let rows = competition_users::Entity::find()
                .filter(competition_users::Column::CompetitionId.eq(competition_id.to_string()))
                .order_by_asc(competition_users::Column::JoinedAt)
                .find_also_related(users::Entity)
                .all(&db_tx)
                .await?;
            rows.into_iter()
                .filter_map(|(member, user)| user.map(|user| (member, user)))
                .map(|(member, user)| {
                    Ok(MemberEntry {
                        role: member.role()?,
                        user_id: user.id,
                        username: user.username,
                        display_name: user.display_name,
                        score: member.score,
                        joined_at: member.joined_at,
                    })
                })
                .collect()
        })
    }

    pub async fn set_member_role(
        &self,
        competition_id: &str,
        target_id: &str,
        role: MemberRole,
        user_id: &str,
    ) -> ResultEngine<competition_users::Model> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_commissioner(&db_tx, competition_id, user_id, false)
                .await?;
            let target = self
                .membership(&db_tx, competition_id, target_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
            let current = target.role()?;
            if current == role {
                return Ok(target);
            }
            if !role.is_commissioner() {
                let commissioners = self.commissioner_count(&db_tx, competition_id).await?;
                if would_orphan(commissioners, current.is_commissioner()) {
                    return Err(EngineError::InvalidRole(
                        "a competition needs at least one commissioner".to_string(),
                    ));
                }
            }

            let mut active: competition_users::ActiveModel = target.into();
            active.role = ActiveValue::Set(role.as_str().to_string());
            let updated = active.update(&db_tx).await?;

            self.notify(
                &db_tx,
                target_id,
                NotificationKind::RoleChanged,
                "Role changed",
                &format!(
                    "You are now a {} of {}.",
                    role.as_str(),
                    access.competition.name
                ),
                Some(&format!("/competitions/{competition_id}")),
            )
            .await?;
            tracing::info!(competition_id, target_id, role = role.as_str(), "member role changed");
            Ok(updated)
        })
    }

    pub async fn remove_member(
        &self,
        competition_id: &str,
        target_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_commissioner(&db_tx, competition_id, user_id, false)
                .await?;
            let target = self
                .membership(&db_tx, competition_id, target_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;
            let commissioners = self.commissioner_count(&db_tx, competition_id).await?;
            if would_orphan(commissioners, target.role()?.is_commissioner()) {
                return Err(EngineError::InvalidRole(
                    "a competition needs at least one commissioner".to_string(),
                ));
            }
            self.drop_member(&db_tx, competition_id, target_id).await?;

            self.notify(
                &db_tx,
                target_id,
                NotificationKind::RemovedFromCompetition,
                "Removed from competition",
                &format!("You were removed from {}.", access.competition.name),
                None,
            )
            .await?;
            tracing::info!(competition_id, target_id, "member removed");
            Ok(())
        })
    }

    /// Deletes a membership together with the member's picks, so a later
    /// rejoin starts from a clean score.
    pub(super) async fn drop_member(
        &self,
        db_tx: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        picks::Entity::delete_many()
            .filter(picks::Column::CompetitionId.eq(competition_id.to_string()))
            .filter(picks::Column::UserId.eq(user_id.to_string()))
            .exec(db_tx)
            .await?;
        competition_users::Entity::delete_by_id((competition_id.to_string(), user_id.to_string()))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
