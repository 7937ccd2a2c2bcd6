//! Server configuration loaded from environment variables.
//!
//! Only the save cooldown is required; everything else has a default
//! suitable for running next to a local platform adapter.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ringvc_shared::constants::{DEFAULT_DATA_DIR, DEFAULT_HTTP_PORT};

use crate::error::ConfigError;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Minimum time between the starts of two saves.
    /// Env: `SAVE_COOLDOWN` (seconds, fractional allowed)
    /// Required.
    pub save_cooldown: Duration,

    /// Directory holding the data file and its temporary sibling.
    /// Env: `DATA_DIR`
    /// Default: `./data`
    pub data_dir: PathBuf,

    /// Socket address the adapter posts events and commands to.
    /// Env: `HTTP_ADDR`
    /// Default: `127.0.0.1:8080`
    pub http_addr: SocketAddr,

    /// Webhook ring messages are posted to.
    /// Env: `DELIVERY_URL`
    /// Default: unset (messages are only logged).
    pub delivery_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let save_cooldown = match var("SAVE_COOLDOWN") {
            Some(raw) => parse_cooldown(&raw)?,
            None => return Err(ConfigError::MissingCooldown),
        };

        let mut config = Self {
            save_cooldown,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            http_addr: ([127, 0, 0, 1], DEFAULT_HTTP_PORT).into(),
            delivery_url: None,
        };

        if let Some(dir) = var("DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(url) = var("DELIVERY_URL") {
            if !url.is_empty() {
                config.delivery_url = Some(url);
            }
        }

        Ok(config)
    }
}

fn parse_cooldown(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidCooldown(raw.to_string());
    let secs: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}
