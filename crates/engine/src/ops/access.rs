use sea_orm::{DatabaseTransaction, PaginatorTrait, QueryFilter, prelude::*};

use crate::{
    EngineError, ResultEngine, competition_users, competition_users::MemberRole, competitions,
    events, users,
};

use super::Engine;

/// What the caller may do inside one competition.
#[derive(Clone, Debug)]
pub(super) struct CompetitionAccess {
    pub(super) competition: competitions::Model,
    pub(super) membership: Option<competition_users::Model>,
    pub(super) is_admin: bool,
}

impl CompetitionAccess {
    pub(super) fn role(&self) -> ResultEngine<Option<MemberRole>> {
        self.membership
            .as_ref()
            .map(competition_users::Model::role)
            .transpose()
    }

    pub(super) fn is_commissioner(&self) -> ResultEngine<bool> {
        Ok(self.role()?.is_some_and(MemberRole::is_commissioner))
    }
}

impl Engine {
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_admin(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        let user = self.require_user(db, user_id).await?;
        if !user.is_admin {
            return Err(EngineError::Forbidden("admin only".to_string()));
        }
        Ok(user)
    }

    pub(super) async fn membership(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<competition_users::Model>> {
        competition_users::Entity::find_by_id((competition_id.to_string(), user_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Loads a competition the caller may read.
    ///
    /// Private competitions are reported as missing to non-members so their
    /// existence does not leak.
    pub(super) async fn require_competition_read(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<CompetitionAccess> {
        let user = self.require_user(db, user_id).await?;
        let competition = competitions::Entity::find_by_id(competition_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("competition not exists".to_string()))?;
        let membership = self.membership(db, competition_id, user_id).await?;
        if !competition.is_public && membership.is_none() && !user.is_admin {
            return Err(EngineError::KeyNotFound(
                "competition not exists".to_string(),
            ));
        }
        Ok(CompetitionAccess {
            competition,
            membership,
            is_admin: user.is_admin,
        })
    }

    /// Loads a competition the caller is a member of.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<CompetitionAccess> {
        let access = self
            .require_competition_read(db, competition_id, user_id)
            .await?;
        if access.membership.is_none() {
            return Err(EngineError::Forbidden(
                "not a member of this competition".to_string(),
            ));
        }
        Ok(access)
    }

    /// Loads a competition the caller manages. Admins pass when `allow_admin`.
    pub(super) async fn require_commissioner(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
        allow_admin: bool,
    ) -> ResultEngine<CompetitionAccess> {
        let access = self
            .require_competition_read(db, competition_id, user_id)
            .await?;
        if access.is_commissioner()? || (allow_admin && access.is_admin) {
            return Ok(access);
        }
        Err(EngineError::Forbidden("commissioner only".to_string()))
    }

    pub(super) async fn commissioner_count(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
    ) -> ResultEngine<u64> {
        competition_users::Entity::find()
            .filter(competition_users::Column::CompetitionId.eq(competition_id.to_string()))
            .filter(competition_users::Column::Role.eq(MemberRole::Commissioner.as_str()))
            .count(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_event(
        &self,
        db: &DatabaseTransaction,
        event_id: &str,
    ) -> ResultEngine<events::Model> {
        events::Entity::find_by_id(event_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("event not exists".to_string()))
    }
}
