//! Configuration loader for the `codemetal-weatherwatch` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase. Loading goes
//! through a lookup closure so tests never have to mutate the process
//! environment.
use std::{env, fmt};

use anyhow::{anyhow, Result};

use crate::cities::{CityRegistry, DEFAULT_CITIES};

pub const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Parse an optional unsigned integer variable with a default value.
macro_rules! parse_env_num {
    ($lookup:expr, $ty:ty, $var_name:expr, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .filter(|v: &String| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// OpenWeatherMap API key.
    pub api_key: String,

    /// Current-weather endpoint of the provider.
    pub api_url: String,

    /// Monitored cities, with optional coordinates.
    pub cities: CityRegistry,

    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,

    /// Per-request timeout for provider calls.
    pub http_timeout_secs: u64,

    /// Alerts retained per city before the oldest are dropped.
    pub alert_history_max: usize,

    /// Port the HTTP server binds on.
    pub http_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `OPENWEATHERMAP_API_KEY` – provider API key
///
/// Optional:
/// - `CITIES` – JSON list of names or map of name to `{lat, lon}`
/// - `OPENWEATHERMAP_API_URL` – provider endpoint (default: OpenWeatherMap 2.5)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `POLL_INTERVAL_SECS` – poll period (default: 300)
/// - `WEATHER_HTTP_TIMEOUT_SECS` – provider request timeout (default: 10)
/// - `ALERT_HISTORY_MAX` – alerts kept per city (default: 1000)
/// - `HTTP_PORT` – listen port (default: 8080)
///
/// Returns an error if any required variable is missing or any value is invalid.
/// A malformed `CITIES` value is reported as a configuration error.
pub fn load_from_env() -> Result<Config> {
    load_with(|name| env::var(name).ok())
}

/// Load configuration from an arbitrary variable lookup.
pub fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let db_url = require_env!(lookup, "DATABASE_URL");
    let api_key = require_env!(lookup, "OPENWEATHERMAP_API_KEY");
    let api_url = lookup("OPENWEATHERMAP_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let db_pool_max = parse_env_num!(lookup, u32, "DB_POOL_MAX", 5);
    let poll_interval_secs = parse_env_num!(lookup, u64, "POLL_INTERVAL_SECS", 300);
    let http_timeout_secs = parse_env_num!(lookup, u64, "WEATHER_HTTP_TIMEOUT_SECS", 10);
    let alert_history_max = parse_env_num!(lookup, usize, "ALERT_HISTORY_MAX", 1000);
    let http_port = parse_env_num!(lookup, u16, "HTTP_PORT", 8080);

    if poll_interval_secs == 0 {
        return Err(anyhow!("POLL_INTERVAL_SECS must be greater than zero"));
    }
    if alert_history_max == 0 {
        return Err(anyhow!("ALERT_HISTORY_MAX must be greater than zero"));
    }

    let cities = match lookup("CITIES") {
        Some(raw) => CityRegistry::from_json_str(&raw)?,
        None => CityRegistry::from_names(DEFAULT_CITIES)?,
    };

    Ok(Config {
        db_url,
        db_pool_max,
        api_key,
        api_url,
        cities,
        poll_interval_secs,
        http_timeout_secs,
        alert_history_max,
        http_port,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the API key
    /// while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL              : {}", mask_db_url(&self.db_url));
        tracing::info!("  OPENWEATHERMAP_API_KEY    : {}", mask_secret(&self.api_key));
        tracing::info!("  OPENWEATHERMAP_API_URL    : {}", self.api_url);
        tracing::info!("  CITIES                    : {:?}", self.cities.list_cities());
        tracing::info!("  DB_POOL_MAX               : {}", self.db_pool_max);
        tracing::info!("  POLL_INTERVAL_SECS        : {}", self.poll_interval_secs);
        tracing::info!("  WEATHER_HTTP_TIMEOUT_SECS : {}", self.http_timeout_secs);
        tracing::info!("  ALERT_HISTORY_MAX         : {}", self.alert_history_max);
        tracing::info!("  HTTP_PORT                 : {}", self.http_port);
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        f.debug_struct("Config")
            .field("db_url", &mask_db_url(&self.db_url))
            .field("db_pool_max", &self.db_pool_max)
            .field("api_key", &mask_secret(&self.api_key))
            .field("api_url", &self.api_url)
            .field("cities", &self.cities.list_cities())
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("alert_history_max", &self.alert_history_max)
            .field("http_port", &self.http_port)
            .finish()
    }
}

/// Replace the password portion of a connection URL with `****`.
///
/// Only a `:` inside the userinfo (between `scheme://` and the last `@` of
/// the authority) marks a password.
fn mask_db_url(db_url: &str) -> String {
    // ---
    let start = db_url.find("://").map_or(0, |i| i + 3);
    let rest = &db_url[start..];
    let authority_end = rest.find('/').unwrap_or(rest.len());

    if let Some(at_pos) = rest[..authority_end].rfind('@') {
        if let Some(colon_pos) = rest[..at_pos].find(':') {
            return format!(
                "{}{}:****{}",
                &db_url[..start],
                &rest[..colon_pos],
                &rest[at_pos..]
            );
        }
    }
    db_url.to_string()
}

fn mask_secret(secret: &str) -> String {
    // ---
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
