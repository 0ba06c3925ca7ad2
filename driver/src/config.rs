use std::str::FromStr;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use kernel::prelude::entity::LendingPolicy;
use kernel::KernelError;

use crate::env;

static POSTGRES_URL: &str = "POSTGRES_URL";
static POSTGRES_MAX_CONNECTIONS: &str = "POSTGRES_MAX_CONNECTIONS";
static LOCK_TIMEOUT_MS: &str = "LOCK_TIMEOUT_MS";
static LENDING_WINDOW_DAYS: &str = "LENDING_WINDOW_DAYS";
static LENDING_MAX_LOANS: &str = "LENDING_MAX_LOANS";

#[derive(Debug, Clone)]
pub struct LendingConfig {
    postgres_url: Option<String>,
    max_connections: u32,
    lock_timeout: Duration,
    policy: LendingPolicy,
}

impl LendingConfig {
    pub fn from_env() -> error_stack::Result<Self, KernelError> {
        Self::from_source(env)
    }

    pub fn from_source<F>(lookup: F) -> error_stack::Result<Self, KernelError>
    where
        F: Fn(&str) -> error_stack::Result<Option<String>, KernelError>,
    {
        let postgres_url = lookup(POSTGRES_URL)?;
        let max_connections = parse_or(&lookup, POSTGRES_MAX_CONNECTIONS, 10u32)?;
        let lock_timeout_ms = parse_or(&lookup, LOCK_TIMEOUT_MS, 5000u64)?;
        let window_days = parse_or(
            &lookup,
            LENDING_WINDOW_DAYS,
            LendingPolicy::DEFAULT_WINDOW_DAYS,
        )?;
        let max_loans = parse_or(&lookup, LENDING_MAX_LOANS, LendingPolicy::DEFAULT_MAX_LOANS)?;
        if lock_timeout_ms == 0 {
            return Err(Report::new(KernelError::Internal).attach_printable(format!(
                "{LOCK_TIMEOUT_MS} must be positive; 0 disables the PostgreSQL lock timeout"
            )));
        }
        if window_days < 0 || max_loans < 1 {
            return Err(Report::new(KernelError::Internal).attach_printable(format!(
                "{LENDING_WINDOW_DAYS} must not be negative and {LENDING_MAX_LOANS} must be positive"
            )));
        }
        Ok(Self {
            postgres_url,
            max_connections,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            policy: LendingPolicy::new(time::Duration::days(window_days), max_loans),
        })
    }

    pub fn postgres_url(&self) -> error_stack::Result<&str, KernelError> {
        self.postgres_url.as_deref().ok_or_else(|| {
            Report::new(KernelError::Internal).attach_printable(format!("{POSTGRES_URL} is not set"))
        })
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn policy(&self) -> &LendingPolicy {
        &self.policy
    }
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            max_connections: 10,
            lock_timeout: Duration::from_millis(5000),
            policy: LendingPolicy::default(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> error_stack::Result<T, KernelError>
where
    F: Fn(&str) -> error_stack::Result<Option<String>, KernelError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key)? {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .change_context_lazy(|| KernelError::Internal)
            .attach_printable_lazy(|| format!("Invalid value for {key}: {raw}")),
    }
}
