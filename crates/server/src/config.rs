//! Runtime options for the HTTP layer. The `app` binary fills these from
//! `settings.toml`; the provider sections deserialize as they are.

use serde::Deserialize;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Allowed browser origin. Any origin when unset.
    pub cors_origin: Option<String>,
    pub sports: SportsConfig,
    pub stripe: StripeConfig,
}

impl ServerConfig {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origin: None,
            sports: SportsConfig::default(),
            stripe: StripeConfig::default(),
        }
    }
}

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;
/// One day.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

impl ServerConfig {
    /// Rejects lifetimes outside `1..=MAX_TOKEN_TTL_HOURS` and cache TTLs
    /// above `MAX_CACHE_TTL_SECS`.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours) {
            return Err(format!(
                "server.token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {}",
                self.token_ttl_hours
            ));
        }
        for (name, secs) in [
            ("sports.odds_ttl_secs", self.sports.odds_ttl_secs),
            ("sports.scores_ttl_secs", self.sports.scores_ttl_secs),
        ] {
            if secs > MAX_CACHE_TTL_SECS {
                return Err(format!(
                    "{name} must be at most {MAX_CACHE_TTL_SECS}, got {secs}"
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SportsConfig {
    pub base_url: String,
    /// Without a key the stored snapshots are served.
    pub api_key: Option<String>,
    pub regions: String,
    pub odds_ttl_secs: u64,
    pub scores_ttl_secs: u64,
}

impl Default for SportsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.the-odds-api.com".to_string(),
            api_key: None,
            regions: "us".to_string(),
            odds_ttl_secs: 300,
            scores_ttl_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    pub base_url: String,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stripe.com".to_string(),
            secret_key: None,
            webhook_secret: None,
            success_url: "http://localhost:5173/payments/success".to_string(),
            cancel_url: "http://localhost:5173/payments/cancel".to_string(),
        }
    }
}
