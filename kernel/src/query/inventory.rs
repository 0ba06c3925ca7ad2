use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{BookId, BookInventory};
use crate::KernelError;

#[async_trait::async_trait]
pub trait InventoryQuery: 'static + Sync + Send {
    type Transaction: Transaction;

    /// Plain read for display. May observe a value that a concurrent
    /// transaction is about to change.
    async fn find_by_id(
        &self,
        con: &mut Self::Transaction,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError>;

    /// Exclusive read-for-update. Blocks while another transaction holds the
    /// row, up to the adapter's lock timeout ([`KernelError::Timeout`]). The
    /// lock is released when `con` commits or rolls back.
    async fn lock_for_update(
        &self,
        con: &mut Self::Transaction,
        id: &BookId,
    ) -> error_stack::Result<Option<BookInventory>, KernelError>;
}

pub trait DependOnInventoryQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type InventoryQuery: InventoryQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn inventory_query(&self) -> &Self::InventoryQuery;
}
