//! Configuration for streams and the server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

/// Default address the server binds to.
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default fixture directory.
const DEFAULT_FIXTURES: &str = "fixtures";

/// Configuration for a consolidated stream.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Subscribe completed requests to live corrections.
    pub watch_after_finish: bool,

    /// Buffer size of the notification broadcast channel.
    /// Observers that fall further behind miss notifications.
    pub notification_capacity: usize,

    /// How far back an "earlier" continuation reaches (minutes).
    pub earlier_window_mins: i64,
}

impl StreamConfig {
    /// Returns the earlier-page window as a Duration.
    pub fn earlier_window(&self) -> Duration {
        Duration::minutes(self.earlier_window_mins)
    }

    /// Enable or disable live corrections after a request completes.
    pub fn with_watch_after_finish(mut self, watch: bool) -> Self {
        self.watch_after_finish = watch;
        self
    }

    /// Set the notification channel capacity.
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Set the earlier-page window in minutes.
    pub fn with_earlier_window_mins(mut self, mins: i64) -> Self {
        self.earlier_window_mins = mins;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            watch_after_finish: true,
            notification_capacity: 256,
            earlier_window_mins: 60,
        }
    }
}

/// Error building the application configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {source}")]
    InvalidBind {
        value: String,
        source: std::net::AddrParseError,
    },
}

/// Configuration for the server binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Directory holding `boards/*.json` and `routes.json`.
    pub fixtures_dir: PathBuf,
    /// Settings shared by both streams.
    pub stream: StreamConfig,
}

impl AppConfig {
    /// Read `RAIL_BOARD_BIND` and `RAIL_BOARD_FIXTURES`, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_str = lookup("RAIL_BOARD_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|source| ConfigError::InvalidBind {
                value: bind_str.clone(),
                source,
            })?;

        let fixtures_dir = lookup("RAIL_BOARD_FIXTURES")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURES));

        Ok(Self {
            bind,
            fixtures_dir,
            stream: StreamConfig::default(),
        })
    }
}
