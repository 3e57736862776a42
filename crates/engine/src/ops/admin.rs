use sea_orm::{
    ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ResultEngine, competition_users,
    competition_users::MemberRole,
    competitions, events, messages, notifications, payments,
    payments::PaymentStatus,
    picks, users,
};

use super::{Engine, with_tx};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SiteStats {
    pub users: u64,
    pub competitions: u64,
    pub events: u64,
    pub picks: u64,
    pub payment_volume_minor: i64,
}

impl Engine {
    pub async fn list_users(&self, admin_id: &str) -> ResultEngine<Vec<users::Model>> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, admin_id).await?;
            users::Entity::find()
                .order_by_asc(users::Column::CreatedAt)
                .all(&db_tx)
                .await
                .map_err(EngineError::from)
        })
    }

    pub async fn set_admin(
        &self,
        admin_id: &str,
        target_id: &str,
        is_admin: bool,
    ) -> ResultEngine<users::Model> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, admin_id).await?;
            if admin_id == target_id && !is_admin {
                return Err(EngineError::InvalidRole(
                    "admins cannot revoke their own access".to_string(),
                ));
            }
            let target = self.require_user(&db_tx, target_id).await?;
            let mut active: users::ActiveModel = target.into();
            active.is_admin = ActiveValue::Set(is_admin);
            let updated = active.update(&db_tx).await?;
            tracing::info!(target_id, is_admin, "admin flag changed");
            Ok(updated)
        })
    }

    /// Deletes an account with its memberships, picks, messages,
    /// notifications and payments.
    ///
    /// Owners must hand over or delete their competitions first, and the
    /// last commissioner of a competition cannot be deleted.
    pub async fn delete_user(&self, admin_id: &str, target_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, admin_id).await?;
            if admin_id == target_id {
                return Err(EngineError::InvalidInput(
                    "admins cannot delete themselves".to_string(),
                ));
            }
            self.require_user(&db_tx, target_id).await?;

            let owned = competitions::Entity::find()
                .filter(competitions::Column::OwnerId.eq(target_id.to_string()))
                .count(&db_tx)
                .await?;
            if owned > 0 {
                return Err(EngineError::InvalidInput(format!(
                    "user still owns {owned} competitions"
                )));
            }
            let managed = competition_users::Entity::find()
                .filter(competition_users::Column::UserId.eq(target_id.to_string()))
                .filter(competition_users::Column::Role.eq(MemberRole::Commissioner.as_str()))
                .all(&db_tx)
                .await?;
            for membership in managed {
                if self
                    .commissioner_count(&db_tx, &membership.competition_id)
                    .await?
                    <= 1
                {
                    return Err(EngineError::InvalidRole(format!(
                        "user is the last commissioner of {}",
                        membership.competition_id
                    )));
                }
            }

            picks::Entity::delete_many()
                .filter(picks::Column::UserId.eq(target_id.to_string()))
                .exec(&db_tx)
                .await?;
            competition_users::Entity::delete_many()
                .filter(competition_users::Column::UserId.eq(target_id.to_string()))
                .exec(&db_tx)
                .await?;
            messages::Entity::delete_many()
                .filter(messages::Column::UserId.eq(target_id.to_string()))
                .exec(&db_tx)
                .await?;
            notifications::Entity::delete_many()
                .filter(notifications::Column::UserId.eq(target_id.to_string()))
                .exec(&db_tx)
                .await?;
            payments::Entity::delete_many()
                .filter(payments::Column::UserId.eq(target_id.to_string()))
                .exec(&db_tx)
                .await?;
            users::Entity::delete_by_id(target_id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!(target_id, "deleted user");
            Ok(())
        })
    }

    pub async fn all_competitions(
        &self,
        admin_id: &str,
    ) -> ResultEngine<Vec<competitions::Model>> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, admin_id).await?;
            competitions::Entity::find()
                .order_by_desc(competitions::Column::CreatedAt)
                .all(&db_tx)
                .await
                .map_err(EngineError::from)
        })
    }

    pub async fn site_stats(&self, admin_id: &str) -> ResultEngine<SiteStats> {
        with_tx!(self, |db_tx| {
            self.require_admin(&db_tx, admin_id).await?;
            let payment_volume_minor = payments::Entity::find()
                .filter(payments::Column::Status.eq(PaymentStatus::Succeeded.as_str()))
                .all(&db_tx)
                .await?
                .iter()
                .map(|p| p.amount_minor)
                .sum();
            Ok(SiteStats {
                users: users::Entity::find().count(&db_tx).await?,
                competitions: competitions::Entity::find().count(&db_tx).await?,
                events: events::Entity::find().count(&db_tx).await?,
                picks: picks::Entity::find().count(&db_tx).await?,
                payment_volume_minor,
            })
        })
    }
}
