//! Startup configuration (C15): loaded once from the environment, fail-closed,
//! never echoes the shared secret back in an error or log line (§4.10, §6).

use std::str::FromStr;

use reaper_core::Environment;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{0} is not a valid u16 port")]
    InvalidPort(&'static str),
    #[error("REAPER_SHARED_SECRET must be at least 32 characters")]
    SecretTooShort,
    #[error("REAPER_ENVIRONMENT must be one of development|staging|production")]
    InvalidEnvironment,
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub bind_port: u16,
    pub store_dsn: String,
    pub shared_secret: String,
    pub environment: Environment,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_port", &self.bind_port)
            .field("store_dsn", &self.store_dsn)
            .field("shared_secret", &"<redacted>")
            .field("environment", &self.environment)
            .finish()
    }
}

impl ServiceConfig {
    /// Validate every required variable before returning; the caller exits
    /// non-zero on `Err` before binding any socket (§4.10).
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_dsn = required("REAPER_STORE_DSN")?;
        let shared_secret = required("REAPER_SHARED_SECRET")?;
        if shared_secret.len() < 32 {
            return Err(ConfigError::SecretTooShort);
        }
        let bind_port = required("REAPER_BIND_PORT")?
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("REAPER_BIND_PORT"))?;
        let environment = Environment::from_str(&required("REAPER_ENVIRONMENT")?)
            .map_err(|_| ConfigError::InvalidEnvironment)?;
        Ok(ServiceConfig { bind_port, store_dsn, shared_secret, environment })
    }

    /// Constant-time comparison, for the rare path where the shared secret
    /// authenticates an inter-service caller rather than a per-agent key.
    pub fn shared_secret_matches(&self, presented: &str) -> bool {
        let (a, b) = (self.shared_secret.as_bytes(), presented.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}
