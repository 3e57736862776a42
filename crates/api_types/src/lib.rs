use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Set on login when the account needs a second factor.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mfa_required: bool,
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub username: String,
        pub email: String,
        pub password: String,
    }

    /// `login` is a username or an email.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub login: String,
        pub password: String,
        #[serde(default)]
        pub code: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenResponse {
        pub token: String,
        pub expires_at: DateTime<Utc>,
        pub user: super::account::Profile,
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Profile {
        pub id: String,
        pub username: String,
        pub email: String,
        pub display_name: Option<String>,
        pub bio: Option<String>,
        pub favorite_sport: Option<String>,
        pub mfa_enabled: bool,
        pub is_admin: bool,
        pub created_at: DateTime<Utc>,
    }

    /// Omitted fields stay unchanged; blank strings clear optional ones.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub email: Option<String>,
        pub display_name: Option<String>,
        pub bio: Option<String>,
        pub favorite_sport: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordChange {
        pub current_password: String,
        pub new_password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MfaSetup {
        pub secret: String,
        pub otpauth_url: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MfaCode {
        pub code: String,
    }
}

pub mod competition {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CompetitionStatus {
        Active,
        Completed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompetitionNew {
        pub name: String,
        pub description: Option<String>,
        #[serde(default)]
        pub is_public: bool,
        pub starts_at: DateTime<Utc>,
        pub ends_at: DateTime<Utc>,
        #[serde(default)]
        pub entry_fee_minor: i64,
        #[serde(default)]
        pub prize_pool_minor: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CompetitionUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub is_public: Option<bool>,
        pub starts_at: Option<DateTime<Utc>>,
        pub ends_at: Option<DateTime<Utc>>,
        pub entry_fee_minor: Option<i64>,
        pub prize_pool_minor: Option<i64>,
    }

    /// A competition as seen by the caller.
    ///
    /// `invite_code` is only present for members.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompetitionView {
        pub id: String,
        pub name: String,
        pub description: Option<String>,
        pub is_public: bool,
        pub status: CompetitionStatus,
        pub starts_at: DateTime<Utc>,
        pub ends_at: DateTime<Utc>,
        pub entry_fee_minor: i64,
        pub prize_pool_minor: i64,
        pub owner_id: String,
        pub member_count: Option<u64>,
        pub role: Option<super::member::MemberRole>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub invite_code: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct JoinRequest {
        pub invite_code: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct JoinByCode {
        pub invite_code: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InviteCode {
        pub invite_code: String,
    }
}

pub mod member {
    use super::*;

    /// Role of a user inside a competition.
    ///
    /// - `commissioner`: manages events, members and settings.
    /// - `member`: picks and chats.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MemberRole {
        Member,
        Commissioner,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub user_id: String,
        pub username: String,
        pub display_name: Option<String>,
        pub role: MemberRole,
        pub score: i64,
        pub joined_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoleUpdate {
        pub role: MemberRole,
    }
}

pub mod event {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EventStatus {
        Upcoming,
        Live,
        Completed,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct EventNew {
        pub sport: String,
        pub title: String,
        pub options: Vec<String>,
        pub event_date: DateTime<Utc>,
        #[serde(default)]
        pub points: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventView {
        pub id: String,
        pub competition_id: String,
        pub sport: String,
        pub title: String,
        pub options: Vec<String>,
        pub event_date: DateTime<Utc>,
        pub status: EventStatus,
        pub winner: Option<String>,
        pub points: i64,
        /// Whether picks are closed for this event right now.
        pub locked: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusUpdate {
        pub status: EventStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Resolve {
        pub winner: String,
    }
}

pub mod pick {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PickNew {
        pub event_id: String,
        pub selection: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PickView {
        pub id: String,
        pub event_id: String,
        pub selection: String,
        pub is_correct: Option<bool>,
        pub points_awarded: i64,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventPick {
        pub user_id: String,
        pub username: String,
        pub selection: String,
        pub is_correct: Option<bool>,
        pub points_awarded: i64,
    }
}

pub mod leaderboard {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LeaderboardRow {
        pub rank: u64,
        pub user_id: String,
        pub username: String,
        pub display_name: Option<String>,
        pub score: i64,
        pub correct_picks: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GlobalRow {
        pub rank: u64,
        pub user_id: String,
        pub username: String,
        pub display_name: Option<String>,
        pub total_score: i64,
        pub competitions: u64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GlobalQuery {
        pub limit: Option<u64>,
    }
}

pub mod chat {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MessageKind {
        Chat,
        EventRequest,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RequestStatus {
        Pending,
        Approved,
        Rejected,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageNew {
        pub content: String,
    }

    /// Poll parameters: `after` is the last message id the client has.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MessagesQuery {
        pub after: Option<i64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MessageView {
        pub id: i64,
        pub competition_id: String,
        pub user_id: String,
        pub kind: MessageKind,
        pub content: String,
        pub request: Option<super::event::EventNew>,
        pub status: Option<RequestStatus>,
        pub reviewed_by: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Review {
        pub approve: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReviewResponse {
        pub message: MessageView,
        pub event: Option<super::event::EventView>,
    }
}

pub mod notification {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NotificationView {
        pub id: String,
        pub kind: String,
        pub title: String,
        pub body: String,
        pub link: Option<String>,
        pub read: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct NotificationsQuery {
        #[serde(default)]
        pub unread: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MarkedRead {
        pub updated: u64,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentStatus {
        Pending,
        Succeeded,
        Failed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: String,
        pub competition_id: String,
        pub amount_minor: i64,
        pub currency: String,
        pub status: PaymentStatus,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CheckoutRequest {
        pub invite_code: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CheckoutResponse {
        pub session_id: String,
        pub checkout_url: String,
    }
}

pub mod odds {
    use super::*;

    /// One game from the sports feed, merged across sports.
    ///
    /// `data` is the provider's object as received.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Game {
        pub sport: String,
        pub commence_time: Option<DateTime<Utc>>,
        pub data: serde_json::Value,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GamesResponse {
        pub games: Vec<Game>,
        /// Sports whose fetch failed and were skipped.
        pub failed: Vec<String>,
    }
}

pub mod admin {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdminUpdate {
        pub is_admin: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SiteStats {
        pub users: u64,
        pub competitions: u64,
        pub events: u64,
        pub picks: u64,
        pub payment_volume_minor: i64,
    }
}

pub mod dashboard {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardCompetition {
        pub competition: super::competition::CompetitionView,
        pub score: i64,
        pub rank: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Dashboard {
        pub competitions: Vec<DashboardCompetition>,
        pub open_events: Vec<super::event::EventView>,
        pub unread_notifications: u64,
    }
}
