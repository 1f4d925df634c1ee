//! Environment-only configuration. No config files; every knob has a
//! documented default and a `DATATALK_`-prefixed override.

use std::time::Duration;

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
const MAX_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub query_timeout: Duration,
    pub max_ingest_bytes: u64,
    /// Master switch for intent extraction; an AI Assist request still
    /// falls through to guidance text when this is off even if an API
    /// key happens to be present in the environment.
    pub ai_mode_on: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("DATATALK_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let query_timeout_secs: u64 = std::env::var("DATATALK_QUERY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS)
            .min(MAX_QUERY_TIMEOUT_SECS);

        let max_ingest_bytes = std::env::var("DATATALK_MAX_INGEST_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(datatalk_executor::DEFAULT_MAX_INGEST_BYTES);

        let ai_mode_on = std::env::var("AI_MODE")
            .map(|v| v.eq_ignore_ascii_case("on"))
            .unwrap_or(false);

        Self {
            port,
            query_timeout: Duration::from_secs(query_timeout_secs),
            max_ingest_bytes,
            ai_mode_on,
        }
    }
}
