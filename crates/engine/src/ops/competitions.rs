use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, competition_users,
    competition_users::{MemberRole, would_orphan},
    competitions::{
        self, CompetitionNew, CompetitionStatus, CompetitionUpdate, generate_invite_code,
        normalize_invite_code, validate_amounts, validate_window,
    },
    events, messages, notifications::NotificationKind, payments,
    payments::PaymentStatus,
    picks,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, access::CompetitionAccess, with_tx};

/// A competition as seen by one caller.
#[derive(Clone, Debug)]
pub struct CompetitionDetail {
    pub competition: competitions::Model,
    pub member_count: u64,
    /// The caller's role; `None` when the caller is not a member.
    pub role: Option<MemberRole>,
    pub prize_pool_minor: i64,
}

impl Engine {
    /// Prize pool: collected entry fees when the competition charges one,
    /// the stored constant otherwise.
    pub(super) async fn prize_pool(
        &self,
        db: &DatabaseTransaction,
        competition: &competitions::Model,
    ) -> ResultEngine<i64> {
        if competition.entry_fee_minor <= 0 {
            return Ok(competition.prize_pool_minor);
        }
        let paid = payments::Entity::find()
            .filter(payments::Column::CompetitionId.eq(competition.id.clone()))
            .filter(payments::Column::Status.eq(PaymentStatus::Succeeded.as_str()))
            .all(db)
            .await?;
        Ok(paid.iter().map(|p| p.amount_minor).sum())
    }

    async fn detail(
        &self,
        db: &DatabaseTransaction,
        competition: competitions::Model,
        role: Option<MemberRole>,
    ) -> ResultEngine<CompetitionDetail> {
        let member_count = competition_users::Entity::find()
            .filter(competition_users::Column::CompetitionId.eq(competition.id.clone()))
            .count(db)
            .await?;
        let prize_pool_minor = self.prize_pool(db, &competition).await?;
        Ok(CompetitionDetail {
            competition,
            member_count,
            role,
            prize_pool_minor,
        })
    }

    async fn access_detail(
        &self,
        db: &DatabaseTransaction,
        access: CompetitionAccess,
    ) -> ResultEngine<CompetitionDetail> {
        let role = access.role()?;
        self.detail(db, access.competition, role).await
    }

    /// Creates a competition; the owner joins as its first commissioner.
    pub async fn create_competition(
        &self,
        owner_id: &str,
        input: CompetitionNew,
    ) -> ResultEngine<competitions::Model> {
        let name = normalize_required_name(&input.name, "competition")?;
        validate_window(input.starts_at, input.ends_at)?;
        validate_amounts(input.entry_fee_minor, input.prize_pool_minor)?;

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, owner_id).await?;
            let now = Utc::now();
            let competition = competitions::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                name: ActiveValue::Set(name.clone()),
                description: ActiveValue::Set(normalize_optional_text(
                    input.description.as_deref(),
                )),
                is_public: ActiveValue::Set(input.is_public),
                invite_code: ActiveValue::Set(generate_invite_code()),
                status: ActiveValue::Set(CompetitionStatus::Active.as_str().to_string()),
                starts_at: ActiveValue::Set(input.starts_at),
                ends_at: ActiveValue::Set(input.ends_at),
                entry_fee_minor: ActiveValue::Set(input.entry_fee_minor),
                prize_pool_minor: ActiveValue::Set(input.prize_pool_minor),
                owner_id: ActiveValue::Set(owner_id.to_string()),
                created_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            competition_users::ActiveModel {
                competition_id: ActiveValue::Set(competition.id.clone()),
                user_id: ActiveValue::Set(owner_id.to_string()),
                role: ActiveValue::Set(MemberRole::Commissioner.as_str().to_string()),
                score: ActiveValue::Set(0),
                joined_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(competition_id = %competition.id, "created competition {name}");
            Ok(competition)
        })
    }

    /// Lists public competitions, newest first.
    pub async fn public_competitions(&self, user_id: &str) -> ResultEngine<Vec<CompetitionDetail>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models = competitions::Entity::find()
                .filter(competitions::Column::IsPublic.eq(true))
                .order_by_desc(competitions::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let role = self
                    .membership(&db_tx, &model.id, user_id)
                    .await?
                    .map(|m| m.role())
                    .transpose()?;
                out.push(self.detail(&db_tx, model, role).await?);
            }
            Ok(out)
        })
    }

    /// Lists competitions the user is a member of.
    pub async fn user_competitions(&self, user_id: &str) -> ResultEngine<Vec<CompetitionDetail>> {
        with_tx!(self, |db_tx| {
            let memberships = competition_users::Entity::find()
                .filter(competition_users::Column::UserId.eq(user_id.to_string()))
                .order_by_asc(competition_users::Column::JoinedAt)
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(memberships.len());
            for membership in memberships {
                let Some(model) = competitions::Entity::find_by_id(membership.competition_id.clone())
                    .one(&db_tx)
                    .await?
                else {
                    continue;
                };
                out.push(self.detail(&db_tx, model, Some(membership.role()?)).await?);
            }
            Ok(out)
        })
    }

    pub async fn competition(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<CompetitionDetail> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_competition_read(&db_tx, competition_id, user_id)
                .await?;
            self.access_detail(&db_tx, access).await
        })
    }

    async fn insert_member(
        &self,
        db: &DatabaseTransaction,
        competition: &competitions::Model,
        user_id: &str,
    ) -> ResultEngine<competition_users::Model> {
        if self.membership(db, &competition.id, user_id).await?.is_some() {
            return Err(EngineError::ExistingKey("already a member".to_string()));
        }
        if competition.is_completed() {
            return Err(EngineError::InvalidInput(
                "competition is completed".to_string(),
            ));
        }
        if competition.entry_fee_minor > 0 {
            let paid = payments::Entity::find()
                .filter(payments::Column::CompetitionId.eq(competition.id.clone()))
                .filter(payments::Column::UserId.eq(user_id.to_string()))
                .filter(payments::Column::Status.eq(PaymentStatus::Succeeded.as_str()))
                .one(db)
                .await?
                .is_some();
            if !paid {
                return Err(EngineError::PaymentRequired(format!(
                    "entry fee of {} minor units is due",
                    competition.entry_fee_minor
                )));
            }
        }
        let member = competition_users::ActiveModel {
            competition_id: ActiveValue::Set(competition.id.clone()),
            user_id: ActiveValue::Set(user_id.to_string()),
            role: ActiveValue::Set(MemberRole::Member.as_str().to_string()),
            score: ActiveValue::Set(0),
            joined_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        tracing::info!(competition_id = %competition.id, user_id, "member joined");
        Ok(member)
    }

    /// Joins by id. Private competitions need their invite code.
    pub async fn join_competition(
        &self,
        competition_id: &str,
        user_id: &str,
        invite_code: Option<&str>,
    ) -> ResultEngine<competition_users::Model> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let competition = competitions::Entity::find_by_id(competition_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("competition not exists".to_string()))?;
            if !competition.is_public {
                let matches = invite_code
                    .map(normalize_invite_code)
                    .is_some_and(|code| code == competition.invite_code);
                if !matches {
                    return Err(EngineError::Forbidden("invalid invite code".to_string()));
                }
            }
            self.insert_member(&db_tx, &competition, user_id).await
        })
    }

    /// Joins whichever competition owns `code`.
    pub async fn join_by_invite_code(
        &self,
        code: &str,
        user_id: &str,
    ) -> ResultEngine<competitions::Model> {
        let code = normalize_invite_code(code);
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let competition = competitions::Entity::find()
                .filter(competitions::Column::InviteCode.eq(code.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invite code not exists".to_string()))?;
            self.insert_member(&db_tx, &competition, user_id).await?;
            Ok(competition)
        })
    }

    pub async fn leave_competition(&self, competition_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let access = self.require_member(&db_tx, competition_id, user_id).await?;
            let commissioners = self.commissioner_count(&db_tx, competition_id).await?;
            if would_orphan(commissioners, access.is_commissioner()?) {
                return Err(EngineError::InvalidRole(
                    "the last commissioner cannot leave".to_string(),
                ));
            }
            self.drop_member(&db_tx, competition_id, user_id).await?;
            Ok(())
        })
    }

    pub async fn update_competition(
        &self,
        competition_id: &str,
        user_id: &str,
        update: CompetitionUpdate,
    ) -> ResultEngine<competitions::Model> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_commissioner(&db_tx, competition_id, user_id, true)
                .await?;
            let current = access.competition;
            let starts_at = update.starts_at.unwrap_or(current.starts_at);
            let ends_at = update.ends_at.unwrap_or(current.ends_at);
            validate_window(starts_at, ends_at)?;
            let entry_fee_minor = update.entry_fee_minor.unwrap_or(current.entry_fee_minor);
            let prize_pool_minor = update.prize_pool_minor.unwrap_or(current.prize_pool_minor);
            validate_amounts(entry_fee_minor, prize_pool_minor)?;

            let mut active: competitions::ActiveModel = current.into();
            if let Some(name) = update.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_name(name, "competition")?);
            }
            if update.description.is_some() {
                active.description =
                    ActiveValue::Set(normalize_optional_text(update.description.as_deref()));
            }
            if let Some(is_public) = update.is_public {
                active.is_public = ActiveValue::Set(is_public);
            }
            active.starts_at = ActiveValue::Set(starts_at);
            active.ends_at = ActiveValue::Set(ends_at);
            active.entry_fee_minor = ActiveValue::Set(entry_fee_minor);
            active.prize_pool_minor = ActiveValue::Set(prize_pool_minor);
            active.update(&db_tx).await.map_err(EngineError::from)
        })
    }

    pub async fn regenerate_invite_code(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<String> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_commissioner(&db_tx, competition_id, user_id, false)
                .await?;
            let code = generate_invite_code();
            let active = competitions::ActiveModel {
                id: ActiveValue::Set(access.competition.id),
                invite_code: ActiveValue::Set(code.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(code)
        })
    }

    /// Marks the competition completed; picks lock for good.
    pub async fn complete_competition(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<competitions::Model> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_commissioner(&db_tx, competition_id, user_id, true)
                .await?;
            if access.competition.is_completed() {
                return Err(EngineError::AlreadyResolved(
                    "competition is already completed".to_string(),
                ));
            }
            let name = access.competition.name.clone();
            let mut active: competitions::ActiveModel = access.competition.into();
            active.status = ActiveValue::Set(CompetitionStatus::Completed.as_str().to_string());
            let model = active.update(&db_tx).await?;

            let members = competition_users::Entity::find()
                .filter(competition_users::Column::CompetitionId.eq(model.id.clone()))
                .all(&db_tx)
                .await?;
            for member in members {
                self.notify(
                    &db_tx,
                    &member.user_id,
                    NotificationKind::CompetitionCompleted,
                    "Competition completed",
                    &format!("{name} has finished with {} points for you.", member.score),
                    Some(&format!("/competitions/{}", model.id)),
                )
                .await?;
            }
            Ok(model)
        })
    }

    /// Deletes a competition with everything that hangs off it.
    pub async fn delete_competition(&self, competition_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let access = self
                .require_competition_read(&db_tx, competition_id, user_id)
                .await?;
            if access.competition.owner_id != user_id && !access.is_admin {
                return Err(EngineError::Forbidden(
                    "only the owner can delete a competition".to_string(),
                ));
            }
            let id = access.competition.id;

            picks::Entity::delete_many()
                .filter(picks::Column::CompetitionId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            events::Entity::delete_many()
                .filter(events::Column::CompetitionId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            messages::Entity::delete_many()
                .filter(messages::Column::CompetitionId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            payments::Entity::delete_many()
                .filter(payments::Column::CompetitionId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            competition_users::Entity::delete_many()
                .filter(competition_users::Column::CompetitionId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            competitions::Entity::delete_by_id(id.clone())
                .exec(&db_tx)
                .await?;

            tracing::info!(competition_id = %id, "deleted competition");
            Ok(())
        })
    }
}
