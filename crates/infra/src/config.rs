//! Service configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::aggregation::EngineConfig;
use crate::seat_ledger::RetryPolicy;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub stale_days: u32,
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub allocation_max_attempts: u32,
    pub retry_backoff: Duration,
    pub invite_ttl_days: u32,
    /// Postgres seat ledger when set, in-memory otherwise.
    pub database_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            stale_days: 7,
            fetch_timeout: Duration::from_millis(3000),
            max_concurrent_fetches: 16,
            allocation_max_attempts: 5,
            retry_backoff: Duration::from_millis(5),
            invite_ttl_days: 7,
            database_url: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys take the default;
    /// unparseable values warn and take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty()).unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        Self {
            bind_addr: parse_or(&lookup, "SEATWISE_BIND_ADDR", defaults.bind_addr),
            jwt_secret,
            stale_days: parse_or(&lookup, "SEATWISE_STALE_DAYS", defaults.stale_days),
            fetch_timeout: Duration::from_millis(parse_or(
                &lookup,
                "SEATWISE_FETCH_TIMEOUT_MS",
                defaults.fetch_timeout.as_millis() as u64,
            )),
            max_concurrent_fetches: parse_or(&lookup, "SEATWISE_MAX_CONCURRENT_FETCHES", defaults.max_concurrent_fetches)
                .max(1),
            allocation_max_attempts: parse_or(
                &lookup,
                "SEATWISE_ALLOCATION_MAX_ATTEMPTS",
                defaults.allocation_max_attempts,
            )
            .max(1),
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "SEATWISE_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            invite_ttl_days: parse_or(&lookup, "SEATWISE_INVITE_TTL_DAYS", defaults.invite_ttl_days).max(1),
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
        }
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = secret.into();
        self
    }

    pub fn with_stale_days(mut self, days: u32) -> Self {
        self.stale_days = days;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig::default()
            .with_stale_days(self.stale_days)
            .with_fetch_timeout(self.fetch_timeout)
            .with_max_concurrent_fetches(self.max_concurrent_fetches)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.allocation_max_attempts)
            .with_backoff_step(self.retry_backoff)
    }

    pub fn invite_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.invite_ttl_days))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, "invalid configuration value; using default");
                default
            }
        },
    }
}
