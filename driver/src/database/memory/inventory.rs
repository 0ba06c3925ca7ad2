use error_stack::Report;

use kernel::interface::query::InventoryQuery;
use kernel::interface::update::InventoryModifier;
use kernel::prelude::entity::{BookId, BookInventory};
use kernel::KernelError;

use crate::database::memory::InMemoryTransaction;

pub struct InMemoryInventoryRepository;

#[async_trait::async_trait]
impl InventoryQuery for InMemoryInventoryRepository {
    type Transaction = InMemoryTransaction;

    async fn find_by_id(
        &self,
        con: &mut InMemoryTransaction,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError> {
        Ok(con.inventory(id).await)
    }

    #[tracing::instrument(skip(self, con))]
    async fn lock_for_update(
        &self,
        con: &mut InMemoryTransaction,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError> {
        con.lock_row(id).await?;
        let found = con.inventory(id).await;
        if found.is_none() {
            con.unlock_row(id).await;
        }
        Ok(found)
    }
}

#[async_trait::async_trait]
impl InventoryModifier for InMemoryInventoryRepository {
    type Transaction = InMemoryTransaction;

    async fn create(
        &self,
        con: &mut InMemoryTransaction,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError> {
        if *inventory.available().as_ref() < 0 {
            return Err(Report::new(KernelError::Internal).attach_printable(format!(
                "Book {:?} cannot start with negative stock",
                inventory.id()
            )));
        }
        if con.inventory(inventory.id()).await.is_some() {
            return Err(Report::new(KernelError::Concurrency)
                .attach_printable(format!("Book {:?} already exists", inventory.id())));
        }
        con.stage_book(inventory.clone());
        Ok(())
    }

    async fn apply_delta(
        &self,
        con: &mut InMemoryTransaction,
        id: &BookId,
        delta: i32,
    ) -> error_stack::Result<u64, KernelError> {
        if !con.holds_lock(id) {
            return Err(Report::new(KernelError::Internal)
                .attach_printable(format!("Book {:?} was not locked for update", id)));
        }
        let Some(current) = con.inventory(id).await else {
            return Ok(0);
        };
        if *current.available().as_ref() + delta < 0 {
            return Ok(0);
        }
        con.stage_delta(id, delta);
        Ok(1)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use uuid::Uuid;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::InventoryQuery;
    use kernel::interface::update::InventoryModifier;
    use kernel::prelude::entity::{AvailableQuantity, BookId, BookInventory};
    use kernel::KernelError;

    use crate::database::memory::{InMemoryDatabase, InMemoryInventoryRepository};

    async fn seed(db: &InMemoryDatabase, amount: i32) -> error_stack::Result<BookId, KernelError> {
        let id = BookId::new(Uuid::new_v4());
        let mut con = db.transact().await?;
        InMemoryInventoryRepository
            .create(
                &mut con,
                &BookInventory::new(id.clone(), AvailableQuantity::new(amount)),
            )
            .await?;
        con.commit().await?;
        Ok(id)
    }

    #[tokio::test]
    async fn staged_until_commit() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::new();
        let id = seed(&db, 2).await?;

        let mut con = db.transact().await?;
        InMemoryInventoryRepository
            .lock_for_update(&mut con, &id)
            .await?;
        let changed = InMemoryInventoryRepository
            .apply_delta(&mut con, &id, -1)
            .await?;
        assert_eq!(changed, 1);
        let own = InMemoryInventoryRepository.find_by_id(&mut con, &id).await?;
        assert_eq!(own.map(|b| *b.available().as_ref()), Some(1));

        let mut other = db.transact().await?;
        let outside = InMemoryInventoryRepository
            .find_by_id(&mut other, &id)
            .await?;
        assert_eq!(outside.map(|b| *b.available().as_ref()), Some(2));

        con.commit().await?;
        let outside = InMemoryInventoryRepository
            .find_by_id(&mut other, &id)
            .await?;
        assert_eq!(outside.map(|b| *b.available().as_ref()), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn roll_back_discards() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::new();
        let id = seed(&db, 1).await?;

        let mut con = db.transact().await?;
        InMemoryInventoryRepository
            .lock_for_update(&mut con, &id)
            .await?;
        InMemoryInventoryRepository
            .apply_delta(&mut con, &id, -1)
            .await?;
        con.roll_back().await?;

        let mut con = db.transact().await?;
        let found = InMemoryInventoryRepository.find_by_id(&mut con, &id).await?;
        assert_eq!(found.map(|b| *b.available().as_ref()), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn never_below_zero() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::new();
        let id = seed(&db, 0).await?;

        let mut con = db.transact().await?;
        InMemoryInventoryRepository
            .lock_for_update(&mut con, &id)
            .await?;
        let changed = InMemoryInventoryRepository
            .apply_delta(&mut con, &id, -1)
            .await?;
        assert_eq!(changed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn negative_stock_is_rejected() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::new();
        let id = BookId::new(Uuid::new_v4());
        let mut con = db.transact().await?;
        let error = InMemoryInventoryRepository
            .create(
                &mut con,
                &BookInventory::new(id.clone(), AvailableQuantity::new(-1)),
            )
            .await
            .unwrap_err();
        assert_eq!(error.current_context(), &KernelError::Internal);
        con.commit().await?;

        let mut con = db.transact().await?;
        let found = InMemoryInventoryRepository.find_by_id(&mut con, &id).await?;
        assert!(found.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn delta_requires_lock() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::new();
        let id = seed(&db, 1).await?;

        let mut con = db.transact().await?;
        let error = InMemoryInventoryRepository
            .apply_delta(&mut con, &id, -1)
            .await
            .unwrap_err();
        assert_eq!(error.current_context(), &KernelError::Internal);
        Ok(())
    }

    #[tokio::test]
    async fn lock_wait_is_bounded() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::with_lock_timeout(Duration::from_millis(50));
        let id = seed(&db, 1).await?;

        let mut holder = db.transact().await?;
        InMemoryInventoryRepository
            .lock_for_update(&mut holder, &id)
            .await?;

        let mut waiter = db.transact().await?;
        let error = InMemoryInventoryRepository
            .lock_for_update(&mut waiter, &id)
            .await
            .unwrap_err();
        assert_eq!(error.current_context(), &KernelError::Timeout);

        holder.roll_back().await?;
        let granted = InMemoryInventoryRepository
            .lock_for_update(&mut waiter, &id)
            .await?;
        assert!(granted.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn missing_row_is_not_held() -> error_stack::Result<(), KernelError> {
        let db = InMemoryDatabase::with_lock_timeout(Duration::from_millis(50));
        let id = BookId::new(Uuid::new_v4());

        let mut first = db.transact().await?;
        let found = InMemoryInventoryRepository
            .lock_for_update(&mut first, &id)
            .await?;
        assert!(found.is_none());

        let mut second = db.transact().await?;
        let found = InMemoryInventoryRepository
            .lock_for_update(&mut second, &id)
            .await?;
        assert!(found.is_none());

        for _ in 0..16 {
            let mut con = db.transact().await?;
            InMemoryInventoryRepository
                .lock_for_update(&mut con, &BookId::new(Uuid::new_v4()))
                .await?;
        }
        assert_eq!(db.tracked_rows().await, 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn contended_deltas_serialize() -> error_stack::Result<(), KernelError> {
        use rand::random;

        let db = InMemoryDatabase::new();
        let id = seed(&db, 10).await?;

        let tasks = (0..32)
            .map(|_| {
                let db = db.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    let delta = if random() { 1 } else { -1 };
                    let mut con = db.transact().await?;
                    InMemoryInventoryRepository
                        .lock_for_update(&mut con, &id)
                        .await?;
                    tokio::task::yield_now().await;
                    let changed = InMemoryInventoryRepository
                        .apply_delta(&mut con, &id, delta)
                        .await?;
                    con.commit().await?;
                    Ok::<_, error_stack::Report<KernelError>>(delta * changed as i32)
                })
            })
            .collect::<Vec<_>>();
        let mut expected = 10;
        for task in tasks {
            expected += task.await.unwrap()?;
        }

        let mut con = db.transact().await?;
        let found = InMemoryInventoryRepository.find_by_id(&mut con, &id).await?;
        assert_eq!(found.map(|b| *b.available().as_ref()), Some(expected));
        assert!(expected >= 0);
        Ok(())
    }
}
