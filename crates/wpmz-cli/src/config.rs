//! CLI configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Stamped into converted documents
    pub author: Option<String>,
    /// Log filter directive
    pub log_filter: String,
    /// `WPMZ_LOG_FORMAT=json` switches to JSON log lines
    pub log_json: bool,
    pub compression_level: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            author: env::var("WPMZ_AUTHOR").ok().filter(|s| !s.trim().is_empty()),
            log_filter: env::var("WPMZ_LOG").unwrap_or_else(|_| "wpmz=info".to_string()),
            log_json: env::var("WPMZ_LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            compression_level: env::var("WPMZ_COMPRESSION_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|level| (0..=9).contains(level))
                .unwrap_or(6),
        }
    }
}
