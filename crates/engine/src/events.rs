//! Sporting events inside a competition.
//!
//! `options` is stored as a JSON array of strings; a pick must select one of
//! them and the winner must be one of them.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventStatus {
    #[default]
    Upcoming,
    Live,
    Completed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Live => "live",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "upcoming" => Ok(Self::Upcoming),
            "live" => Ok(Self::Live),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::InvalidInput(format!(
                "invalid event status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub competition_id: String,
    pub sport: String,
    pub title: String,
    pub options: String,
    pub event_date: DateTimeUtc,
    pub status: String,
    pub winner: Option<String>,
    pub points: i64,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn status(&self) -> ResultEngine<EventStatus> {
        EventStatus::try_from(self.status.as_str())
    }

    pub fn options(&self) -> ResultEngine<Vec<String>> {
        Ok(serde_json::from_str(&self.options)?)
    }

    pub fn has_option(&self, selection: &str) -> ResultEngine<bool> {
        Ok(self.options()?.iter().any(|o| o == selection))
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
    #[sea_orm(has_many = "super::picks::Entity")]
    Picks,
}

impl Related<super::competitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competitions.def()
    }
}

impl Related<super::picks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Picks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Input for a new event. Also the JSON payload of an event request message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNew {
    pub sport: String,
    pub title: String,
    pub options: Vec<String>,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub points: Option<i64>,
}

pub const DEFAULT_EVENT_POINTS: i64 = 1;

/// Trims options and checks there are at least two distinct non-empty ones.
pub(crate) fn normalize_options(options: &[String]) -> ResultEngine<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(options.len());
    for option in options {
        let trimmed = option.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidInput(
                "event options must not be empty".to_string(),
            ));
        }
        if out.iter().any(|o| o == trimmed) {
            return Err(EngineError::InvalidInput(format!(
                "duplicate event option: {trimmed}"
            )));
        }
        out.push(trimmed.to_string());
    }
    if out.len() < 2 {
        return Err(EngineError::InvalidInput(
            "an event needs at least two options".to_string(),
        ));
    }
    Ok(out)
}

/// Validates an `EventNew` against `now` and returns the cleaned options.
pub(crate) fn validate_event_new(input: &EventNew, now: DateTime<Utc>) -> ResultEngine<Vec<String>> {
    if input.sport.trim().is_empty() {
        return Err(EngineError::InvalidInput("sport must not be empty".to_string()));
    }
    if input.title.trim().is_empty() {
        return Err(EngineError::InvalidInput("title must not be empty".to_string()));
    }
    if input.event_date <= now {
        return Err(EngineError::InvalidInput(
            "event date must be in the future".to_string(),
        ));
    }
    if let Some(points) = input.points
        && points <= 0
    {
        return Err(EngineError::InvalidInput("points must be > 0".to_string()));
    }
    normalize_options(&input.options)
}

/// Why picks on `event` are closed at `now`, if they are.
///
/// Picks lock once the event starts, once it leaves `upcoming`, or once the
/// competition is completed.
pub fn lock_reason(
    event: &Model,
    competition_completed: bool,
    now: DateTime<Utc>,
) -> Option<&'static str> {
    if competition_completed {
        return Some("competition is completed");
    }
    if event.event_date <= now {
        return Some("event has started");
    }
    if event.status != EventStatus::Upcoming.as_str() {
        return Some("event is no longer upcoming");
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn event(date: DateTime<Utc>, status: EventStatus) -> Model {
        Model {
            id: "e".to_string(),
            competition_id: "c".to_string(),
            sport: "soccer".to_string(),
            title: "Derby".to_string(),
            options: r#"["Home","Away","Draw"]"#.to_string(),
            event_date: date,
            status: status.as_str().to_string(),
            winner: None,
            points: 1,
            created_at: date,
        }
    }

    #[test]
    fn open_event_is_not_locked() {
        let now = Utc::now();
        let e = event(now + Duration::hours(1), EventStatus::Upcoming);
        assert_eq!(lock_reason(&e, false, now), None);
    }

    #[test]
    fn started_event_is_locked() {
        let now = Utc::now();
        let e = event(now, EventStatus::Upcoming);
        assert_eq!(lock_reason(&e, false, now), Some("event has started"));
    }

    #[test]
    fn completed_competition_locks_everything() {
        let now = Utc::now();
        let e = event(now + Duration::days(3), EventStatus::Upcoming);
        assert_eq!(lock_reason(&e, true, now), Some("competition is completed"));
    }

    #[test]
    fn live_event_is_locked() {
        let now = Utc::now();
        let e = event(now + Duration::hours(1), EventStatus::Live);
        assert!(lock_reason(&e, false, now).is_some());
    }

    #[test]
    fn options_are_parsed() {
        let e = event(Utc::now(), EventStatus::Upcoming);
        assert_eq!(e.options().unwrap(), vec!["Home", "Away", "Draw"]);
        assert!(e.has_option("Draw").unwrap());
        assert!(!e.has_option("draw").unwrap());
    }

    #[test]
    fn options_need_two_distinct_values() {
        assert!(normalize_options(&["A".to_string()]).is_err());
        assert!(normalize_options(&["A".to_string(), " A ".to_string()]).is_err());
        assert!(normalize_options(&["A".to_string(), "".to_string()]).is_err());
        assert_eq!(
            normalize_options(&[" A".to_string(), "B ".to_string()]).unwrap(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn past_event_date_rejected() {
        let now = Utc::now();
        let input = EventNew {
            sport: "nba".to_string(),
            title: "Finals".to_string(),
            options: vec!["Lakers".to_string(), "Celtics".to_string()],
            event_date: now - Duration::minutes(1),
            points: None,
        };
        assert!(validate_event_new(&input, now).is_err());
    }
}
