pub use competition_users::MemberRole;
pub use competitions::{
    CompetitionNew, CompetitionStatus, CompetitionUpdate, INVITE_CODE_CHARSET, INVITE_CODE_LEN,
    generate_invite_code,
};
pub use error::EngineError;
pub use events::{DEFAULT_EVENT_POINTS, EventNew, EventStatus, lock_reason};
pub use messages::{MAX_MESSAGE_LEN, MessageKind, RequestStatus};
pub use notifications::NotificationKind;
pub use ops::{
    CompetitionDetail, Dashboard, DashboardCompetition, Engine, EngineBuilder, EventPickView,
    GlobalLeaderboardEntry, LeaderboardEntry, MemberEntry, SiteStats, rank_entries,
};
pub use payments::{PAYMENT_CURRENCY, PaymentStatus};
pub use users::ProfileUpdate;

pub mod competition_users;
pub mod competitions;
pub mod events;
pub mod messages;
pub mod mfa;
pub mod notifications;
pub mod odds_snapshots;
pub mod payments;
pub mod picks;
pub mod users;

mod error;
mod ops;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
