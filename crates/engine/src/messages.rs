//! Competition message log: chat lines and event requests.
//!
//! The log is append-only. Event requests carry an `EventNew` JSON payload
//! and a moderation status; chat lines have neither.

use sea_orm::entity::prelude::*;

use crate::{EngineError, ResultEngine, events::EventNew};

pub const MAX_MESSAGE_LEN: usize = 500;
pub const DEFAULT_PAGE: u64 = 50;
pub const MAX_PAGE: u64 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Chat,
    EventRequest,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::EventRequest => "event_request",
        }
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "chat" => Ok(Self::Chat),
            "event_request" => Ok(Self::EventRequest),
            other => Err(EngineError::InvalidInput(format!(
                "invalid message kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidInput(format!(
                "invalid request status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub competition_id: String,
    pub user_id: String,
    pub kind: String,
    pub content: String,
    pub payload: Option<String>,
    pub status: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn kind(&self) -> ResultEngine<MessageKind> {
        MessageKind::try_from(self.kind.as_str())
    }

    pub fn request_status(&self) -> ResultEngine<Option<RequestStatus>> {
        self.status
            .as_deref()
            .map(RequestStatus::try_from)
            .transpose()
    }

    pub fn event_request(&self) -> ResultEngine<Option<EventNew>> {
        self.payload
            .as_deref()
            .map(|raw| serde_json::from_str(raw).map_err(Into::into))
            .transpose()
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
}

impl Related<super::competitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Trims chat content and enforces 1..=500 characters.
pub(crate) fn normalize_content(content: &str) -> ResultEngine<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(EngineError::InvalidInput(format!(
            "content length 1-{MAX_MESSAGE_LEN} required"
        )));
    }
    Ok(trimmed.to_string())
}

/// Clamps a requested page size.
pub(crate) fn page_size(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE)
}
