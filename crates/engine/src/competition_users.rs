//! Competition membership: who is in a competition, with which role, and
//! their running score.

use sea_orm::entity::prelude::*;

use crate::EngineError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemberRole {
    #[default]
    Member,
    Commissioner,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Commissioner => "commissioner",
        }
    }

    pub fn is_commissioner(self) -> bool {
        matches!(self, Self::Commissioner)
    }
}

impl TryFrom<&str> for MemberRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "member" => Ok(Self::Member),
            "commissioner" => Ok(Self::Commissioner),
            other => Err(EngineError::InvalidRole(format!(
                "invalid membership role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "competition_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub competition_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub role: String,
    pub score: i64,
    pub joined_at: DateTimeUtc,
}

impl Model {
    pub fn role(&self) -> Result<MemberRole, EngineError> {
        MemberRole::try_from(self.role.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::competitions::Entity",
        from = "Column::CompetitionId",
        to = "super::competitions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Competitions,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::competitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competitions.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Returns true when demoting or removing the target would leave the
/// competition without a commissioner.
///
/// `commissioners` is the current commissioner count.
pub(crate) fn would_orphan(commissioners: u64, target_is_commissioner: bool) -> bool {
    target_is_commissioner && commissioners <= 1
}
