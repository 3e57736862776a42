use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, Condition, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, mfa,
    users::{self, ProfileUpdate},
    util::{normalize_email, normalize_optional_text, normalize_username, validate_password},
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates an account. Username and email are unique (case-insensitive).
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ResultEngine<users::Model> {
        let username = normalize_username(username)?;
        let email = normalize_email(email)?;
        validate_password(password)?;
        let password_hash = bcrypt::hash(password, self.bcrypt_cost)?;

        with_tx!(self, |db_tx| {
            if users::Entity::find()
                .filter(users::Column::Username.eq(username.clone()))
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }
            if users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(email));
            }

            let model = users::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                username: ActiveValue::Set(username.clone()),
                email: ActiveValue::Set(email.clone()),
                password_hash: ActiveValue::Set(password_hash),
                display_name: ActiveValue::Set(None),
                bio: ActiveValue::Set(None),
                favorite_sport: ActiveValue::Set(None),
                mfa_secret: ActiveValue::Set(None),
                mfa_enabled: ActiveValue::Set(false),
                is_admin: ActiveValue::Set(false),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            tracing::info!(user_id = %model.id, "registered user {}", model.username);
            Ok(model)
        })
    }

    /// Checks a username-or-email and password pair.
    ///
    /// The error never says which half was wrong, and an unknown login
    /// still pays for one bcrypt verification.
    pub async fn authenticate(&self, login: &str, password: &str) -> ResultEngine<users::Model> {
        let login = login.trim().to_ascii_lowercase();
        let user = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(login.clone()))
                    .add(users::Column::Email.eq(login)),
            )
            .one(&self.database)
            .await?;
        let Some(user) = user else {
            bcrypt::verify(password, &self.decoy_hash)?;
            return Err(EngineError::Unauthorized("invalid credentials".to_string()));
        };
        if !bcrypt::verify(password, &user.password_hash)? {
            return Err(EngineError::Unauthorized("invalid credentials".to_string()));
        }
        Ok(user)
    }

    pub async fn user(&self, user_id: &str) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> ResultEngine<users::Model> {
        let email = update.email.as_deref().map(normalize_email).transpose()?;
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut active: users::ActiveModel = user.clone().into();

            if let Some(email) = email
                && email != user.email
            {
                let taken = users::Entity::find()
                    .filter(users::Column::Email.eq(email.clone()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::ExistingKey(email));
                }
                active.email = ActiveValue::Set(email);
            }
            if update.display_name.is_some() {
                active.display_name =
                    ActiveValue::Set(normalize_optional_text(update.display_name.as_deref()));
            }
            if update.bio.is_some() {
                active.bio = ActiveValue::Set(normalize_optional_text(update.bio.as_deref()));
            }
            if update.favorite_sport.is_some() {
                active.favorite_sport =
                    ActiveValue::Set(normalize_optional_text(update.favorite_sport.as_deref()));
            }

            active.update(&db_tx).await.map_err(EngineError::from)
        })
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        current: &str,
        new_password: &str,
    ) -> ResultEngine<()> {
        validate_password(new_password)?;
        let user = self.user(user_id).await?;
        if !bcrypt::verify(current, &user.password_hash)? {
            return Err(EngineError::Unauthorized(
                "current password is wrong".to_string(),
            ));
        }
        let password_hash = bcrypt::hash(new_password, self.bcrypt_cost)?;
        let active = users::ActiveModel {
            id: ActiveValue::Set(user.id),
            password_hash: ActiveValue::Set(password_hash),
            ..Default::default()
        };
        active.update(&self.database).await?;
        Ok(())
    }

    /// Stores a fresh TOTP secret (not yet active) and returns it together
    /// with its provisioning URL.
    pub async fn begin_mfa_setup(&self, user_id: &str) -> ResultEngine<(String, String)> {
        let user = self.user(user_id).await?;
        if user.mfa_enabled {
            return Err(EngineError::InvalidInput(
                "mfa is already enabled".to_string(),
            ));
        }
        let secret = mfa::generate_secret();
        let url = mfa::provisioning_url(&secret, &user.username)?;
        let active = users::ActiveModel {
            id: ActiveValue::Set(user.id),
            mfa_secret: ActiveValue::Set(Some(secret.clone())),
            mfa_enabled: ActiveValue::Set(false),
            ..Default::default()
        };
        active.update(&self.database).await?;
        Ok((secret, url))
    }

    /// Turns MFA on once the user proves their authenticator works.
    pub async fn enable_mfa(&self, user_id: &str, code: &str, now: DateTime<Utc>) -> ResultEngine<()> {
        let user = self.user(user_id).await?;
        if user.mfa_enabled {
            return Err(EngineError::InvalidInput(
                "mfa is already enabled".to_string(),
            ));
        }
        let Some(secret) = user.mfa_secret.as_deref() else {
            return Err(EngineError::InvalidInput(
                "mfa setup has not been started".to_string(),
            ));
        };
        if !mfa::verify_code(secret, &user.username, code, now)? {
            return Err(EngineError::InvalidInput("invalid mfa code".to_string()));
        }
        let active = users::ActiveModel {
            id: ActiveValue::Set(user.id.clone()),
            mfa_enabled: ActiveValue::Set(true),
            ..Default::default()
        };
        active.update(&self.database).await?;
        tracing::info!(user_id = %user.id, "mfa enabled");
        Ok(())
    }

    pub async fn disable_mfa(&self, user_id: &str, code: &str, now: DateTime<Utc>) -> ResultEngine<()> {
        let user = self.user(user_id).await?;
        if !user.mfa_enabled {
            return Err(EngineError::InvalidInput("mfa is not enabled".to_string()));
        }
        if !self.verify_mfa(&user, code, now)? {
            return Err(EngineError::InvalidInput("invalid mfa code".to_string()));
        }
        let active = users::ActiveModel {
            id: ActiveValue::Set(user.id.clone()),
            mfa_secret: ActiveValue::Set(None),
            mfa_enabled: ActiveValue::Set(false),
            ..Default::default()
        };
        active.update(&self.database).await?;
        tracing::info!(user_id = %user.id, "mfa disabled");
        Ok(())
    }

    /// Second login factor. Users without MFA always pass.
    pub fn verify_mfa(&self, user: &users::Model, code: &str, now: DateTime<Utc>) -> ResultEngine<bool> {
        match (user.mfa_enabled, user.mfa_secret.as_deref()) {
            (true, Some(secret)) => mfa::verify_code(secret, &user.username, code, now),
            (true, None) => Err(EngineError::Internal(
                "mfa enabled without a secret".to_string(),
            )),
            (false, _) => Ok(true),
        }
    }
}
