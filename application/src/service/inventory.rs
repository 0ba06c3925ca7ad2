use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{DependOnInventoryQuery, InventoryQuery};
use kernel::prelude::entity::BookId;
use kernel::KernelError;

use crate::transfer::{GetInventoryDto, InventoryDto};

/// Unlocked read for display. The value may already be stale when returned.
#[async_trait::async_trait]
pub trait GetInventoryService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnInventoryQuery
{
    async fn get_inventory(
        &self,
        dto: GetInventoryDto,
    ) -> error_stack::Result<Option<InventoryDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let inventory = self
            .inventory_query()
            .find_by_id(&mut connection, &BookId::new(dto.book_id))
            .await?;
        connection.commit().await?;
        Ok(inventory.map(InventoryDto::from))
    }
}

impl<T> GetInventoryService for T where T: DependOnDatabaseConnection + DependOnInventoryQuery {}
