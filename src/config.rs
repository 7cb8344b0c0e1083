use std::{env, ops::RangeInclusive, path::PathBuf, time::Duration};

use thiserror::Error;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("You need to add {0} to the env")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub public_dir: PathBuf,
    pub mongodb_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            mongodb_uri: required("MONGODB_URI")?,
            database_name: or_default("MONGODB_DATABASE", "expense_tracker"),
            host: or_default("HOST", "0.0.0.0"),
            port: parse("PORT", or_default("PORT", "5000"))?,
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_hours: parse_in_range(
                "JWT_EXPIRES_IN_HOURS",
                or_default("JWT_EXPIRES_IN_HOURS", "24"),
                1..=MAX_TOKEN_TTL_HOURS,
            )?,
            public_dir: PathBuf::from(or_default("PUBLIC_DIR", "public")),
            mongodb_timeout: Duration::from_secs(parse(
                "MONGODB_TIMEOUT_SECS",
                or_default("MONGODB_TIMEOUT_SECS", "10"),
            )?),
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_in_range(
    key: &'static str,
    value: String,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    match parse(key, value.clone())? {
        parsed if range.contains(&parsed) => Ok(parsed),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}
