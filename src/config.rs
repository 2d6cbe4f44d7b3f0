//! Process configuration, read once at startup.

use crate::db::PasswordScheme;
use jsonwebtoken::Algorithm;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 38;
pub const DEFAULT_MODEL_PATH: &str = "model/churn_model.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,
    #[error("unsupported JWT_ALGORITHM {0:?} (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("malformed SEED_USERS entry {0:?} (expected username:password)")]
    MalformedSeed(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub token_ttl: Duration,
    pub password_scheme: PasswordScheme,
    pub seed_users: Vec<(String, String)>,
    pub model_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => 8000,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let jwt_algorithm = match lookup("JWT_ALGORITHM").as_deref().map(str::trim) {
            None | Some("HS256") => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(other) => return Err(ConfigError::UnsupportedAlgorithm(other.to_string())),
        };

        let ttl_minutes = match lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&m| m > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                    value: raw,
                })?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let password_scheme = match lookup("PASSWORD_SCHEME") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "plain" => PasswordScheme::Plain,
                "bcrypt" => PasswordScheme::Bcrypt,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PASSWORD_SCHEME",
                        value: raw,
                    })
                }
            },
            None => PasswordScheme::Plain,
        };

        let seed_users = match lookup("SEED_USERS") {
            Some(raw) => parse_seed_users(&raw)?,
            None => Vec::new(),
        };

        let model_path = lookup("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        Ok(Self {
            host,
            port,
            jwt_secret,
            jwt_algorithm,
            token_ttl: Duration::from_secs(ttl_minutes * 60),
            password_scheme,
            seed_users,
            model_path,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_seed_users(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((user, pass)) if !user.is_empty() => Ok((user.to_string(), pass.to_string())),
            _ => Err(ConfigError::MalformedSeed(entry.to_string())),
        })
        .collect()
}
