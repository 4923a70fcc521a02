//! Environment-driven configuration with compiled-in defaults.
//!
//! Every knob has a sensible default, so the daemon runs with no
//! environment at all; variables only override.

use std::env;
use std::time::Duration;

/// Top-level feed configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub endpoints: Endpoints,
    pub refresh: RefreshTuning,
}

/// Upstream endpoint URLs.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub where_iss_url: String,
    pub astros_url: String,
    pub spacex_next_launch_url: String,
}

/// Polling and retry tuning.
#[derive(Clone, Debug)]
pub struct RefreshTuning {
    /// Recurring background refresh interval.
    pub refresh_interval: Duration,
    /// Time budget for a single domain fetch before it falls back.
    pub fetch_timeout: Duration,
    /// Consecutive invalid cycles tolerated before settling best-effort.
    pub max_retries: u32,
    /// Linear backoff unit: retry n waits `retry_base_delay * n`.
    pub retry_base_delay: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let endpoints = Endpoints {
            where_iss_url: env::var("WHERE_ISS_URL")
                .unwrap_or_else(|_| "https://api.wheretheiss.at/v1/satellites/25544".to_string()),
            astros_url: env::var("ASTROS_URL")
                .unwrap_or_else(|_| "http://api.open-notify.org/astros.json".to_string()),
            spacex_next_launch_url: env::var("SPACEX_NEXT_LAUNCH_URL")
                .unwrap_or_else(|_| "https://api.spacexdata.com/v4/launches/next".to_string()),
        };

        let refresh = RefreshTuning {
            // A zero interval would wedge the timer; one second is the floor.
            refresh_interval: Duration::from_secs(env_parse("REFRESH_EVERY_SECONDS", 300u64).max(1)),
            fetch_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECONDS", 5u64)),
            // Parsed at u32 width so out-of-range values fall back instead
            // of truncating.
            max_retries: env_parse("REFRESH_MAX_RETRIES", 3u32),
            retry_base_delay: Duration::from_millis(env_parse("RETRY_BASE_DELAY_MS", 2000u64)),
        };

        Self {
            endpoints,
            refresh,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
