//! Users table.
//!
//! Every other table references users by `id`; `username` and `email` are
//! unique but may change.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub favorite_sport: Option<String>,
    pub mfa_secret: Option<String>,
    pub mfa_enabled: bool,
    pub is_admin: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::competition_users::Entity")]
    CompetitionUsers,
    #[sea_orm(has_many = "super::picks::Entity")]
    Picks,
}

impl Related<super::competition_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompetitionUsers.def()
    }
}

impl Related<super::picks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Picks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Profile fields a user may change on their own account.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub favorite_sport: Option<String>,
}
