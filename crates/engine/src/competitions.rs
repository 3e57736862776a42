//! A `Competition` is a tipping league: members pick outcomes of its events
//! and are ranked by score.

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine};

/// Characters used for invite codes. Ambiguous glyphs (`0`, `O`, `1`, `I`)
/// are left out so codes can be read aloud.
pub const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 8;

/// Generates a fresh invite code.
///
/// Collisions are not retried: the unique index on `invite_code` rejects
/// the write instead.
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITE_CODE_CHARSET.len());
            INVITE_CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Normalizes user-typed invite codes (trim + uppercase).
pub(crate) fn normalize_invite_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompetitionStatus {
    #[default]
    Active,
    Completed,
}

impl CompetitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for CompetitionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::InvalidInput(format!(
                "invalid competition status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "competitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub invite_code: String,
    pub status: String,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    pub entry_fee_minor: i64,
    pub prize_pool_minor: i64,
    pub owner_id: String,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn status(&self) -> ResultEngine<CompetitionStatus> {
        CompetitionStatus::try_from(self.status.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.status == CompetitionStatus::Completed.as_str()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Owner,
    #[sea_orm(has_many = "super::competition_users::Entity")]
    CompetitionUsers,
    #[sea_orm(has_many = "super::events::Entity")]
    Events,
}

impl Related<super::competition_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompetitionUsers.def()
    }
}

impl Related<super::events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Input for a new competition.
#[derive(Clone, Debug)]
pub struct CompetitionNew {
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub entry_fee_minor: i64,
    pub prize_pool_minor: i64,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Clone, Debug, Default)]
pub struct CompetitionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub entry_fee_minor: Option<i64>,
    pub prize_pool_minor: Option<i64>,
}

pub(crate) fn validate_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> ResultEngine<()> {
    if ends_at <= starts_at {
        return Err(EngineError::InvalidInput(
            "competition must end after it starts".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_amounts(entry_fee_minor: i64, prize_pool_minor: i64) -> ResultEngine<()> {
    if entry_fee_minor < 0 {
        return Err(EngineError::InvalidInput(
            "entry fee must be >= 0".to_string(),
        ));
    }
    if prize_pool_minor < 0 {
        return Err(EngineError::InvalidInput(
            "prize pool must be >= 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn invite_code_uses_charset() {
        for _ in 0..64 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_CODE_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn normalize_code_uppercases() {
        assert_eq!(normalize_invite_code("  abcd2345 "), "ABCD2345");
    }

    #[test]
    fn status_round_trips_through_str() {
        assert_eq!(
            CompetitionStatus::try_from("completed").unwrap(),
            CompetitionStatus::Completed
        );
        assert!(CompetitionStatus::try_from("archived").is_err());
    }

    #[test]
    fn window_must_be_ordered() {
        let now = Utc::now();
        assert!(validate_window(now, now + Duration::days(1)).is_ok());
        assert!(validate_window(now, now).is_err());
    }

    #[test]
    fn negative_amounts_rejected() {
        assert!(validate_amounts(-1, 0).is_err());
        assert!(validate_amounts(0, -1).is_err());
        assert!(validate_amounts(500, 0).is_ok());
    }
}
