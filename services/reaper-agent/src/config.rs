//! Startup configuration (C15): the enforcement sidecar's own
//! `ServiceConfig`, loaded once, fail-closed, never echoes the shared secret
//! (§4.10, §6). Carries one addition beyond the four required variables: the
//! platform base URL the sidecar calls back to resolve a mandate by ID, since
//! this binary holds no mandate store of its own.

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
    pub platform_url: String,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_port", &self.bind_port)
            .field("store_dsn", &self.store_dsn)
            .field("shared_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("platform_url", &self.platform_url)
            .finish()
    }
}

impl ServiceConfig {
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
        let platform_url =
            std::env::var("REAPER_PLATFORM_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string());
        Ok(ServiceConfig { bind_port, store_dsn, shared_secret, environment, platform_url })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_impl_never_prints_the_secret() {
        let cfg = ServiceConfig {
            bind_port: 8080,
            store_dsn: "memory://".into(),
            shared_secret: "super-secret-value-that-must-not-leak".into(),
            environment: Environment::Production,
            platform_url: "http://platform".into(),
        };
        assert!(!format!("{cfg:?}").contains("super-secret-value"));
    }
}
