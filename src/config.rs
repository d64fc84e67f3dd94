//! Server configuration read from the environment (and `.env` via dotenvy).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 4001;
pub const DEFAULT_TICK_MS: u64 = 33;
pub const DEFAULT_BACKLOG_SIZE: u32 = 5;
pub const MAX_NAME_LEN: usize = 24;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Wall-clock interval between simulation ticks
    pub tick_interval: Duration,
    /// Rounds per session before `session_complete`
    pub backlog_size: u32,
    /// Allowed CORS origin; `None` means permissive
    pub cors_origin: Option<String>,
    pub static_dir: String,
    /// Spawn a ticker task per mini-game. Tests turn this off and call
    /// `AppState::tick_room` by hand.
    pub drive_ticks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            backlog_size: DEFAULT_BACKLOG_SIZE,
            cors_origin: None,
            static_dir: "static".to_string(),
            drive_ticks: true,
        }
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an env var, falling back (with a warning) when it doesn't parse
fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match env_trimmed(key) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}

/// Like [`env_parsed`], but zero counts as invalid too
fn env_positive<T: FromStr + PartialEq + Default + Copy>(key: &str, default: T) -> T {
    let value = env_parsed(key, default);
    if value == T::default() {
        tracing::warn!("Ignoring {}=0, using default", key);
        return default;
    }
    value
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let tick_ms = env_positive("TICK_MS", DEFAULT_TICK_MS);
        let backlog_size = env_positive("BACKLOG_SIZE", DEFAULT_BACKLOG_SIZE);

        let config = Self {
            bind_addr: env_parsed("BIND_ADDR", defaults.bind_addr),
            port: env_parsed("PORT", defaults.port),
            tick_interval: Duration::from_millis(tick_ms),
            backlog_size,
            cors_origin: env_trimmed("CORS_ORIGIN"),
            static_dir: env_trimmed("STATIC_DIR").unwrap_or(defaults.static_dir),
            drive_ticks: true,
        };

        tracing::info!(
            "Config: tick={:?}, backlog={} rounds, cors={}",
            config.tick_interval,
            config.backlog_size,
            config.cors_origin.as_deref().unwrap_or("permissive")
        );
        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Config for tests: no background tickers
    pub fn manual_ticks() -> Self {
        Self {
            drive_ticks: false,
            ..Self::default()
        }
    }
}
