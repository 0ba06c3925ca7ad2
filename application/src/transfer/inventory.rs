use kernel::prelude::entity::{BookInventory, DestructBookInventory};
use uuid::Uuid;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InventoryDto {
    pub book_id: Uuid,
    pub available: i32,
}

impl From<BookInventory> for InventoryDto {
    fn from(value: BookInventory) -> Self {
        let DestructBookInventory { id, available } = value.into_destruct();
        Self {
            book_id: *id.as_ref(),
            available: *available.as_ref(),
        }
    }
}

pub struct GetInventoryDto {
    pub book_id: Uuid,
}
