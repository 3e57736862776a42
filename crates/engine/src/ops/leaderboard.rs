use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{ResultEngine, competition_users, picks, users};

use super::{Engine, with_tx};

const DEFAULT_GLOBAL_LIMIT: u64 = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub score: i64,
    pub correct_picks: u64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalLeaderboardEntry {
    pub rank: u64,
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub total_score: i64,
    pub competitions: u64,
}

/// Orders entries by score, then correct picks, then join time, and assigns
/// standard competition ranks (1, 2, 2, 4).
pub fn rank_entries(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.correct_picks.cmp(&a.correct_picks))
            .then(a.joined_at.cmp(&b.joined_at))
    });
    let mut previous: Option<(i64, u64, u64)> = None;
    for (index, entry) in entries.iter_mut().enumerate() {
        let position = index as u64 + 1;
        entry.rank = match previous {
            Some((score, correct, rank))
                if score == entry.score && correct == entry.correct_picks =>
            {
                rank
            }
            _ => position,
        };
        previous = Some((entry.score, entry.correct_picks, entry.rank));
    }
    entries
}

impl Engine {
    pub(super) async fn ranked_members(
        &self,
        db: &DatabaseTransaction,
        competition_id: &str,
    ) -> ResultEngine<Vec<LeaderboardEntry>> {
        let mut correct: HashMap<String, u64> = HashMap::new();
        let correct_picks = picks::Entity::find()
            .filter(picks::Column::CompetitionId.eq(competition_id.to_string()))
            .filter(picks::Column::IsCorrect.eq(true))
            .all(db)
            .await?;
        for pick in correct_picks {
            *correct.entry(pick.user_id).or_default() += 1;
        }

        let rows = competition_users::Entity::find()
            .filter(competition_users::Column::CompetitionId.eq(competition_id.to_string()))
            .find_also_related(users::Entity)
            .all(db)
            .await?;
        let entries = rows
            .into_iter()
            .filter_map(|(member, user)| {
                let user = user?;
                Some(LeaderboardEntry {
                    rank: 0,
                    correct_picks: correct.get(&user.id).copied().unwrap_or_default(),
                    user_id: user.id,
                    username: user.username,
                    display_name: user.display_name,
                    score: member.score,
                    joined_at: member.joined_at,
                })
            })
            .collect();
        Ok(rank_entries(entries))
    }

    pub async fn leaderboard(
        &self,
        competition_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<LeaderboardEntry>> {
        with_tx!(self, |db_tx| {
            self.require_competition_read(&db_tx, competition_id, user_id)
                .await?;
            self.ranked_members(&db_tx, competition_id).await
        })
    }

    /// Users ranked by their summed score across every competition.
    pub async fn global_leaderboard(
        &self,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<GlobalLeaderboardEntry>> {
        let limit = limit.unwrap_or(DEFAULT_GLOBAL_LIMIT).clamp(1, 500) as usize;
        let memberships = competition_users::Entity::find()
            .all(&self.database)
            .await?;
        let mut totals: HashMap<String, (i64, u64)> = HashMap::new();
        for member in memberships {
            let total = totals.entry(member.user_id).or_default();
            total.0 += member.score;
            total.1 += 1;
        }

        let ids: Vec<String> = totals.keys().cloned().collect();
        let users = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.database)
            .await?;
        let mut entries: Vec<GlobalLeaderboardEntry> = users
            .into_iter()
            .filter_map(|user| {
                let (total_score, competitions) = totals.get(&user.id).copied()?;
                Some(GlobalLeaderboardEntry {
                    rank: 0,
                    user_id: user.id,
                    username: user.username,
                    display_name: user.display_name,
                    total_score,
                    competitions,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.username.cmp(&b.username))
        });

        let mut previous: Option<(i64, u64)> = None;
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = match previous {
                Some((score, rank)) if score == entry.total_score => rank,
                _ => index as u64 + 1,
            };
            previous = Some((entry.total_score, entry.rank));
        }
        entries.truncate(limit);
        Ok(entries)
    }
}
