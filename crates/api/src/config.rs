//! Process configuration read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use datagate_auth::AuthConfig;

pub const CLIENT_SECRET_VAR: &str = "DATAGATE_CLIENT_SECRET";
pub const TOKEN_ISSUER_VAR: &str = "DATAGATE_TOKEN_ISSUER";
pub const TOKEN_EXPIRATION_VAR: &str = "DATAGATE_TOKEN_EXPIRATION_MS";
pub const LONG_TERM_TOKEN_EXPIRATION_VAR: &str = "DATAGATE_LONG_TERM_TOKEN_EXPIRATION_MS";
pub const BIND_ADDR_VAR: &str = "DATAGATE_BIND_ADDR";
pub const SEED_FILE_VAR: &str = "DATAGATE_SEED_FILE";
/// `dev` enables the built-in signing secret.
pub const ENV_VAR: &str = "DATAGATE_ENV";

const DEV_CLIENT_SECRET: &str = "datagate-dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_EXPIRATION_MS: i64 = 3_600_000;
const DEFAULT_LONG_TERM_TOKEN_EXPIRATION_MS: i64 = 30 * 24 * 3_600_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of milliseconds, got '{value}'")]
    InvalidDuration { var: &'static str, value: String },

    #[error("{var} is not a valid socket address: '{value}'")]
    InvalidAddress { var: &'static str, value: String },

    #[error("{var} must not be blank")]
    Blank { var: &'static str },

    #[error("{var} must be set outside dev ({env_var}=dev)")]
    Missing {
        var: &'static str,
        env_var: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    /// Optional JSON document loaded into the in-memory store at startup.
    pub seed_file: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dev = lookup(ENV_VAR).is_some_and(|env| env.trim().eq_ignore_ascii_case("dev"));
        let client_secret = match lookup(CLIENT_SECRET_VAR) {
            Some(secret) if !secret.trim().is_empty() => secret,
            Some(_) => return Err(ConfigError::Blank { var: CLIENT_SECRET_VAR }),
            None if dev => {
                tracing::warn!("{CLIENT_SECRET_VAR} not set; using insecure dev default");
                DEV_CLIENT_SECRET.to_string()
            }
            None => {
                return Err(ConfigError::Missing {
                    var: CLIENT_SECRET_VAR,
                    env_var: ENV_VAR,
                });
            }
        };

        let mut auth = AuthConfig::new(client_secret.into_bytes());
        if let Some(issuer) = lookup(TOKEN_ISSUER_VAR) {
            if issuer.trim().is_empty() {
                return Err(ConfigError::Blank { var: TOKEN_ISSUER_VAR });
            }
            auth.issuer = issuer.trim().to_string();
        }
        auth.token_ttl = millis(&lookup, TOKEN_EXPIRATION_VAR, DEFAULT_TOKEN_EXPIRATION_MS)?;
        auth.long_term_token_ttl = millis(
            &lookup,
            LONG_TERM_TOKEN_EXPIRATION_VAR,
            DEFAULT_LONG_TERM_TOKEN_EXPIRATION_MS,
        )?;

        let raw_addr = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddress {
                var: BIND_ADDR_VAR,
                value: raw_addr.clone(),
            })?;

        let seed_file = lookup(SEED_FILE_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_addr,
            auth,
            seed_file,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(Duration::milliseconds(default));
    };
    match raw.trim().parse::<i64>() {
        Ok(ms) if ms > 0 => Ok(Duration::milliseconds(ms)),
        _ => Err(ConfigError::InvalidDuration { var, value: raw }),
    }
}
