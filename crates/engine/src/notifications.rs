//! Per-user notifications.

use sea_orm::entity::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    EventResolved,
    EventRequestReviewed,
    RoleChanged,
    RemovedFromCompetition,
    PaymentReceived,
    CompetitionCompleted,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventResolved => "event_resolved",
            Self::EventRequestReviewed => "event_request_reviewed",
            Self::RoleChanged => "role_changed",
            Self::RemovedFromCompetition => "removed_from_competition",
            Self::PaymentReceived => "payment_received",
            Self::CompetitionCompleted => "competition_completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
