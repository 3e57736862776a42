use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod access;
mod admin;
mod chat;
mod competitions;
mod dashboard;
mod events;
mod leaderboard;
mod members;
mod notifications;
mod odds;
mod payments;
mod picks;
mod users;

pub use admin::SiteStats;
pub use competitions::CompetitionDetail;
pub use dashboard::{Dashboard, DashboardCompetition};
pub use leaderboard::{GlobalLeaderboardEntry, LeaderboardEntry, rank_entries};
pub use members::MemberEntry;
pub use picks::EventPickView;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug, Clone)]
pub struct Engine {
    database: DatabaseConnection,
    bcrypt_cost: u32,
    /// Verified against when a login matches no account.
    decoy_hash: String,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    bcrypt_cost: u32,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Work factor for password hashes. Tests lower it to keep hashing fast.
    pub fn bcrypt_cost(mut self, cost: u32) -> EngineBuilder {
        self.bcrypt_cost = cost;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(EngineError::InvalidInput(format!(
                "bcrypt cost must be within 4..=31, got {}",
                self.bcrypt_cost
            )));
        }
        let decoy_hash = bcrypt::hash(uuid::Uuid::new_v4().to_string(), self.bcrypt_cost)?;
        Ok(Engine {
            database: self.database,
            bcrypt_cost: self.bcrypt_cost,
            decoy_hash,
        })
    }
}
