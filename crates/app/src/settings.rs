//! Handles settings for the application. Configuration is read from
//! `settings.toml` in the working directory, and `BIGTIP__SECTION__KEY`
//! environment variables override single values.
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use server::{DEFAULT_TOKEN_TTL_HOURS, ServerConfig, SportsConfig, StripeConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    pub jwt_secret: String,
    pub token_ttl_hours: Option<i64>,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub sports: SportsConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("BIGTIP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Options for the HTTP layer, when a `server` section exists.
    pub fn server_config(&self) -> Result<Option<ServerConfig>, ConfigError> {
        let Some(server) = self.server.as_ref() else {
            return Ok(None);
        };
        let config = ServerConfig {
            jwt_secret: server.jwt_secret.clone(),
            token_ttl_hours: server.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
            cors_origin: server.cors_origin.clone(),
            sports: self.sports.clone(),
            stripe: self.stripe.clone(),
        };
        config.validate().map_err(ConfigError::Message)?;
        Ok(Some(config))
    }
}
