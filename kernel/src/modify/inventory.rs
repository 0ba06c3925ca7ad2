use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{BookId, BookInventory};
use crate::KernelError;

#[async_trait::async_trait]
pub trait InventoryModifier: 'static + Sync + Send {
    type Transaction: Transaction;

    async fn create(
        &self,
        con: &mut Self::Transaction,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError>;

    /// Adds `delta` to the available quantity of a row previously locked by
    /// `con`. Returns the number of rows changed: `0` when the row is missing
    /// or the result would drop below zero.
    async fn apply_delta(
        &self,
        con: &mut Self::Transaction,
        id: &BookId,
        delta: i32,
    ) -> error_stack::Result<u64, KernelError>;
}

pub trait DependOnInventoryModifier: 'static + Sync + Send + DependOnDatabaseConnection {
    type InventoryModifier: InventoryModifier<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn inventory_modifier(&self) -> &Self::InventoryModifier;
}
