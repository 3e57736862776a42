//! Odds and scores from The Odds API, fanned out over the tracked sports.
//!
//! Every sport is fetched concurrently and failures are skipped, so one
//! broken feed never empties the page. Without an api key the last stored
//! odds snapshots are served instead.

use std::{sync::Arc, time::Duration};

use api_types::odds::{Game, GamesResponse};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::{ServerError, config::SportsConfig, server::ServerState};

pub const SPORTS: [&str; 5] = [
    "americanfootball_nfl",
    "basketball_nba",
    "baseball_mlb",
    "icehockey_nhl",
    "soccer_epl",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Feed {
    Odds,
    Scores,
}

impl Feed {
    fn cache_key(self) -> &'static str {
        match self {
            Feed::Odds => "odds",
            Feed::Scores => "scores",
        }
    }
}

type SportResult = (String, Result<Vec<Value>, String>);

#[derive(Clone)]
pub struct SportsClient {
    http: reqwest::Client,
    config: Arc<SportsConfig>,
}

impl SportsClient {
    pub fn new(http: reqwest::Client, config: SportsConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    fn ttl(&self, feed: Feed) -> Duration {
        match feed {
            Feed::Odds => Duration::from_secs(self.config.odds_ttl_secs),
            Feed::Scores => Duration::from_secs(self.config.scores_ttl_secs),
        }
    }

    async fn fetch_sport(
        &self,
        feed: Feed,
        sport: &str,
        api_key: &str,
    ) -> Result<Vec<Value>, String> {
        let base = format!("{}/v4/sports/{sport}", self.config.base_url);
        let request = match feed {
            Feed::Odds => self.http.get(format!("{base}/odds")).query(&[
                ("apiKey", api_key),
                ("regions", self.config.regions.as_str()),
                ("markets", "h2h"),
            ]),
            Feed::Scores => self
                .http
                .get(format!("{base}/scores"))
                .query(&[("apiKey", api_key), ("daysFrom", "1")]),
        };

        let response = request.send().await.map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|err| err.to_string())
    }

    async fn fetch_all(&self, feed: Feed, api_key: &str) -> Vec<SportResult> {
        let mut tasks = JoinSet::new();
        for sport in SPORTS {
            let client = self.clone();
            let api_key = api_key.to_string();
            tasks.spawn(async move {
                let result = client.fetch_sport(feed, sport, &api_key).await;
                (sport.to_string(), result)
            });
        }

        let mut results = Vec::with_capacity(SPORTS.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => tracing::error!("sports fetch task failed: {err}"),
            }
        }
        results
    }
}

fn commence_time(data: &Value) -> Option<DateTime<Utc>> {
    let raw = data.get("commence_time")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Flattens per-sport results into one list ordered by start time. Games
/// without a start time go last.
fn merge(results: Vec<SportResult>) -> GamesResponse {
    let mut games = Vec::new();
    let mut failed = Vec::new();
    for (sport, result) in results {
        match result {
            Ok(items) => games.extend(items.into_iter().map(|data| Game {
                sport: sport.clone(),
                commence_time: commence_time(&data),
                data,
            })),
            Err(err) => {
                tracing::warn!(%sport, "sports feed failed: {err}");
                failed.push(sport);
            }
        }
    }
    games.sort_by_key(|game| (game.commence_time.is_none(), game.commence_time));
    failed.sort();
    GamesResponse { games, failed }
}

async fn from_snapshots(state: &ServerState) -> Result<Vec<SportResult>, ServerError> {
    let mut results = Vec::with_capacity(SPORTS.len());
    for sport in SPORTS {
        let games = match state.engine.latest_odds_snapshot(sport).await? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        results.push((sport.to_string(), Ok(games)));
    }
    Ok(results)
}

async fn games(state: &ServerState, feed: Feed) -> Result<Json<Value>, ServerError> {
    if let Some(cached) = state.cache.get(feed.cache_key()) {
        return Ok(Json(cached));
    }

    let results = match state.sports.config.api_key.as_deref() {
        None => from_snapshots(state).await?,
        Some(api_key) => {
            let results = state.sports.fetch_all(feed, api_key).await;
            if feed == Feed::Odds {
                for (sport, result) in &results {
                    let Ok(items) = result else { continue };
                    let payload = Value::Array(items.clone());
                    if let Err(err) = state.engine.store_odds_snapshot(sport, &payload).await {
                        tracing::error!(%sport, "failed to store odds snapshot: {err}");
                    }
                }
            }
            results
        }
    };

    let value = serde_json::to_value(merge(results))
        .map_err(|err| ServerError::Generic(format!("failed to encode games: {err}")))?;
    state
        .cache
        .insert(feed.cache_key(), value.clone(), state.sports.ttl(feed));
    Ok(Json(value))
}

pub async fn odds(State(state): State<ServerState>) -> Result<Json<Value>, ServerError> {
    games(&state, Feed::Odds).await
}

pub async fn scores(State(state): State<ServerState>) -> Result<Json<Value>, ServerError> {
    games(&state, Feed::Scores).await
}
