use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    competitions::{self, normalize_invite_code},
    notifications::NotificationKind,
    payments::{self, PAYMENT_CURRENCY, PaymentStatus},
};

use super::{Engine, with_tx};

impl Engine {
    async fn fee_competition(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<competitions::Model> {
        self.require_user(db, user_id).await?;
        let competition = competitions::Entity::find_by_id(competition_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("competition not exists".to_string()))?;
        if self.membership(db, competition_id, user_id).await?.is_some() {
            return Err(EngineError::ExistingKey("already a member".to_string()));
        }
        if competition.is_completed() {
            return Err(EngineError::InvalidInput(
                "competition is completed".to_string(),
            ));
        }
        if competition.entry_fee_minor <= 0 {
            return Err(EngineError::InvalidInput(
                "competition has no entry fee".to_string(),
            ));
        }
        let paid = payments::Entity::find()
            .filter(payments::Column::CompetitionId.eq(competition_id.to_string()))
            .filter(payments::Column::UserId.eq(user_id.to_string()))
            .filter(payments::Column::Status.eq(PaymentStatus::Succeeded.as_str()))
            .one(db)
            .await?;
        if paid.is_some() {
            return Err(EngineError::ExistingKey(
                "entry fee already paid".to_string(),
            ));
        }
        Ok(competition)
    }

    /// Checks that the user owes an entry fee and returns the competition to
    /// charge for. Private competitions need their invite code.
    pub async fn entry_fee_due(
        &self,
        competition_id: &str,
        user_id: &str,
        invite_code: Option<&str>,
    ) -> ResultEngine<competitions::Model> {
        with_tx!(self, |db_tx| {
            let competition = self.fee_competition(&db_tx, competition_id, user_id).await?;
            if !competition.is_public {
                let matches = invite_code
                    .map(normalize_invite_code)
                    .is_some_and(|code| code == competition.invite_code);
                if !matches {
                    return Err(EngineError::Forbidden("invalid invite code".to_string()));
                }
            }
            Ok(competition)
        })
    }

    /// Records a pending entry-fee payment for a checkout session.
    pub async fn create_payment(
        &self,
        user_id: &str,
        competition_id: &str,
        session_id: &str,
        amount_minor: i64,
    ) -> ResultEngine<payments::Model> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidInput(
                "payment amount must be positive".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let competition = self.fee_competition(&db_tx, competition_id, user_id).await?;
            if amount_minor != competition.entry_fee_minor {
                return Err(EngineError::InvalidInput(format!(
                    "payment amount must equal the entry fee of {}",
                    competition.entry_fee_minor
                )));
            }
            let now = Utc::now();
            let model = payments::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                user_id: ActiveValue::Set(user_id.to_string()),
                competition_id: ActiveValue::Set(competition_id.to_string()),
                amount_minor: ActiveValue::Set(amount_minor),
                currency: ActiveValue::Set(PAYMENT_CURRENCY.to_string()),
                provider_session_id: ActiveValue::Set(session_id.to_string()),
                status: ActiveValue::Set(PaymentStatus::Pending.as_str().to_string()),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(payment_id = %model.id, session_id, "payment pending");
            Ok(model)
        })
    }

    /// Settles a payment by provider session id.
    ///
    /// A failed payment may still succeed when the buyer retries inside the
    /// same session. Succeeded payments never change, and repeats of the
    /// current outcome return the payment unchanged.
    pub async fn complete_payment(
        &self,
        session_id: &str,
        succeeded: bool,
    ) -> ResultEngine<payments::Model> {
        with_tx!(self, |db_tx| {
            let payment = payments::Entity::find()
                .filter(payments::Column::ProviderSessionId.eq(session_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("payment not exists".to_string()))?;
            let status = if succeeded {
                PaymentStatus::Succeeded
            } else {
                PaymentStatus::Failed
            };
            let current = PaymentStatus::try_from(payment.status.as_str())?;
            if !current.can_become(status) {
                return Ok(payment);
            }

            let mut active: payments::ActiveModel = payment.into();
            active.status = ActiveValue::Set(status.as_str().to_string());
            active.updated_at = ActiveValue::Set(Utc::now());
            let payment = active.update(&db_tx).await?;

            if succeeded {
                self.notify(
                    &db_tx,
                    &payment.user_id,
                    NotificationKind::PaymentReceived,
                    "Payment received",
                    &format!(
                        "Your entry fee of {} {} was received. You can now join.",
                        payment.amount_minor, payment.currency
                    ),
                    Some(&format!("/competitions/{}", payment.competition_id)),
                )
                .await?;
            }
            tracing::info!(payment_id = %payment.id, status = status.as_str(), "payment settled");
            Ok(payment)
        })
    }

    /// Session id of the user's only pending payment for a competition.
    /// `None` when there is no pending payment or more than one.
    pub async fn pending_payment_session(
        &self,
        user_id: &str,
        competition_id: &str,
    ) -> ResultEngine<Option<String>> {
        let mut pending = payments::Entity::find()
            .filter(payments::Column::UserId.eq(user_id.to_string()))
            .filter(payments::Column::CompetitionId.eq(competition_id.to_string()))
            .filter(payments::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .limit(2)
            .all(&self.database)
            .await?;
        if pending.len() > 1 {
            tracing::warn!(user_id, competition_id, "several pending payments, none chosen");
            return Ok(None);
        }
        Ok(pending.pop().map(|p| p.provider_session_id))
    }

    pub async fn user_payments(&self, user_id: &str) -> ResultEngine<Vec<payments::Model>> {
        payments::Entity::find()
            .filter(payments::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(payments::Column::CreatedAt)
            .all(&self.database)
            .await
            .map_err(Into::into)
    }
}
