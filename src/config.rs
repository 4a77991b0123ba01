use anyhow::{bail, Context};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string. Without it requests live in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    /// Directory for the daily rolling log file.
    pub log_dir: Option<PathBuf>,
    pub board_cache_ttl: Duration,
    pub mission_cache_ttl: Duration,
    /// Growth actors may only unclaim requests assigned to themselves.
    pub enforce_unclaim_ownership: bool,
}

impl Config {
    /// Load `.env`, then read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ => bail!("JWT_SECRET must be set"),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            jwt_secret,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_flag(&lookup, "RUN_MIGRATIONS", true)?,
            log_dir: lookup("LOG_DIR").map(PathBuf::from),
            board_cache_ttl: Duration::from_secs(parse_or(&lookup, "BOARD_CACHE_TTL_SECS", 30)?),
            mission_cache_ttl: Duration::from_secs(parse_or(&lookup, "MISSION_CACHE_TTL_SECS", 600)?),
            enforce_unclaim_ownership: parse_flag(&lookup, "ENFORCE_UNCLAIM_OWNERSHIP", true)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => bail!("{key} must be true or false, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.db_max_connections, 10);
        assert!(config.run_migrations);
        assert!(config.enforce_unclaim_ownership);
        assert_eq!(config.board_cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/requests"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("ENFORCE_UNCLAIM_OWNERSHIP", "false"),
            ("LOG_DIR", "logs"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/requests"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.enforce_unclaim_ownership);
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("DB_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }
}
