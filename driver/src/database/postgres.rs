use std::ops::{Deref, DerefMut};
use std::time::Duration;

use error_stack::Report;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Error, PgConnection, Pool, Postgres};

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::KernelError;

use crate::config::LendingConfig;
use crate::error::ConvertError;

pub use self::{inventory::*, loan::*};

mod inventory;
mod loan;

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool<Postgres>,
    lock_timeout: Duration,
}

impl PostgresDatabase {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        let config = LendingConfig::from_env()?;
        Self::connect(&config).await
    }

    pub async fn connect(config: &LendingConfig) -> error_stack::Result<Self, KernelError> {
        let url = config.postgres_url()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections())
            .connect(url)
            .await
            .convert_error()?;
        Ok(Self {
            pool,
            lock_timeout: config.lock_timeout(),
        })
    }

    /// Same pool, different bound on `FOR UPDATE` waits for transactions
    /// opened through the returned handle.
    pub fn with_lock_timeout(&self, lock_timeout: Duration) -> Self {
        Self {
            pool: self.pool.clone(),
            lock_timeout,
        }
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for PostgresDatabase {
    type Transaction = PostgresTransaction;
    async fn transact(&self) -> error_stack::Result<Self::Transaction, KernelError> {
        let mut tx = self.pool.begin().await.convert_error()?;
        // Bounds every `FOR UPDATE` wait inside this transaction.
        let statement = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        );
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .convert_error()?;
        Ok(PostgresTransaction(tx))
    }
}

pub struct PostgresTransaction(sqlx::Transaction<'static, Postgres>);

#[async_trait::async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        self.0.commit().await.convert_error()
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        self.0.rollback().await.convert_error()
    }
}

impl Deref for PostgresTransaction {
    type Target = PgConnection;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PostgresTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

fn classify(error: &Error) -> KernelError {
    match error {
        Error::PoolTimedOut => KernelError::Timeout,
        Error::Database(database) => match database.code().as_deref() {
            // lock_not_available
            Some("55P03") => KernelError::Timeout,
            // serialization_failure, deadlock_detected, unique_violation
            Some("40001") | Some("40P01") | Some("23505") => KernelError::Concurrency,
            _ => KernelError::Internal,
        },
        _ => KernelError::Internal,
    }
}

impl<T> ConvertError for Result<T, Error> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| {
            let context = classify(&error);
            Report::from(error).change_context(context)
        })
    }
}

#[cfg(test)]
mod test {
    use kernel::KernelError;

    use crate::database::postgres::classify;

    #[test]
    fn pool_timeout_is_retryable() {
        assert_eq!(classify(&sqlx::Error::PoolTimedOut), KernelError::Timeout);
        assert_eq!(classify(&sqlx::Error::RowNotFound), KernelError::Internal);
    }
}
