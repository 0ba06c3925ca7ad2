use sqlx::PgConnection;
use uuid::Uuid;

use kernel::interface::query::InventoryQuery;
use kernel::interface::update::InventoryModifier;
use kernel::prelude::entity::{AvailableQuantity, BookId, BookInventory};
use kernel::KernelError;

use crate::database::postgres::PostgresTransaction;
use crate::error::ConvertError;

pub struct PostgresInventoryRepository;

#[async_trait::async_trait]
impl InventoryQuery for PostgresInventoryRepository {
    type Transaction = PostgresTransaction;

    async fn find_by_id(
        &self,
        con: &mut PostgresTransaction,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError> {
        PgInventoryInternal::find_by_id(con, id).await
    }

    async fn lock_for_update(
        &self,
        con: &mut PostgresTransaction,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError> {
        PgInventoryInternal::lock_for_update(con, id).await
    }
}

#[async_trait::async_trait]
impl InventoryModifier for PostgresInventoryRepository {
    type Transaction = PostgresTransaction;

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError> {
        PgInventoryInternal::create(con, inventory).await
    }

    async fn apply_delta(
        &self,
        con: &mut PostgresTransaction,
        id: &BookId,
        delta: i32,
    ) -> error_stack::Result<u64, KernelError> {
        PgInventoryInternal::apply_delta(con, id, delta).await
    }
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    id: Uuid,
    quantity: i32,
}

impl From<InventoryRow> for BookInventory {
    fn from(value: InventoryRow) -> Self {
        BookInventory::new(BookId::new(value.id), AvailableQuantity::new(value.quantity))
    }
}

pub(in crate::database) struct PgInventoryInternal;

impl PgInventoryInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError> {
        let row = sqlx::query_as::<_, InventoryRow>(
            // language=postgresql
            r#"
            SELECT id, quantity
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        Ok(row.map(BookInventory::from))
    }

    #[tracing::instrument(skip(con))]
    async fn lock_for_update(
        con: &mut PgConnection,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError> {
        let row = sqlx::query_as::<_, InventoryRow>(
            // language=postgresql
            r#"
            SELECT id, quantity
            FROM books
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        Ok(row.map(BookInventory::from))
    }

    async fn create(
        con: &mut PgConnection,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError> {
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO books (id, quantity)
            VALUES ($1, $2)
            "#,
        )
        .bind(inventory.id().as_ref())
        .bind(inventory.available().as_ref())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn apply_delta(
        con: &mut PgConnection,
        id: &BookId,
        delta: i32,
    ) -> error_stack::Result<u64, KernelError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE books
            SET quantity = quantity + $2, updated_at = now()
            WHERE id = $1 AND quantity + $2 >= 0
            "#,
        )
        .bind(id.as_ref())
        .bind(delta)
        .execute(con)
        .await
        .convert_error()?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use uuid::Uuid;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::InventoryQuery;
    use kernel::interface::update::InventoryModifier;
    use kernel::prelude::entity::{AvailableQuantity, BookId, BookInventory};
    use kernel::KernelError;

    use crate::database::postgres::{PostgresDatabase, PostgresInventoryRepository};

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn test() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;
        let id = BookId::new(Uuid::new_v4());
        let inventory = BookInventory::new(id.clone(), AvailableQuantity::new(1));
        PostgresInventoryRepository
            .create(&mut con, &inventory)
            .await?;

        let locked = PostgresInventoryRepository
            .lock_for_update(&mut con, &id)
            .await?;
        assert_eq!(locked, Some(inventory));

        let changed = PostgresInventoryRepository
            .apply_delta(&mut con, &id, -1)
            .await?;
        assert_eq!(changed, 1);

        let changed = PostgresInventoryRepository
            .apply_delta(&mut con, &id, -1)
            .await?;
        assert_eq!(changed, 0);

        let found = PostgresInventoryRepository.find_by_id(&mut con, &id).await?;
        assert_eq!(
            found,
            Some(BookInventory::new(id.clone(), AvailableQuantity::new(0)))
        );

        let missing = PostgresInventoryRepository
            .lock_for_update(&mut con, &BookId::new(Uuid::new_v4()))
            .await?;
        assert!(missing.is_none());

        con.roll_back().await?;
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn contended_lock_times_out() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let id = BookId::new(Uuid::new_v4());
        let mut con = db.transact().await?;
        PostgresInventoryRepository
            .create(
                &mut con,
                &BookInventory::new(id.clone(), AvailableQuantity::new(1)),
            )
            .await?;
        con.commit().await?;

        let mut holder = db.transact().await?;
        let held = PostgresInventoryRepository
            .lock_for_update(&mut holder, &id)
            .await?;
        assert!(held.is_some());

        let impatient = db.with_lock_timeout(Duration::from_millis(200));
        let mut waiter = impatient.transact().await?;
        let started = Instant::now();
        let error = PostgresInventoryRepository
            .lock_for_update(&mut waiter, &id)
            .await
            .unwrap_err();
        assert_eq!(error.current_context(), &KernelError::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(200));
        drop(waiter);

        holder.roll_back().await?;
        let mut waiter = impatient.transact().await?;
        let granted = PostgresInventoryRepository
            .lock_for_update(&mut waiter, &id)
            .await?;
        assert!(granted.is_some());
        waiter.roll_back().await?;
        Ok(())
    }
}
