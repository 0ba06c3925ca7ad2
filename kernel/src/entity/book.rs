mod available;
mod id;

pub use self::{available::*, id::*};
use destructure::Destructure;
use vodca::References;

/// Stock counter for one title. `available` never goes below zero in a
/// committed state.
#[derive(Debug, Clone, Eq, PartialEq, References, Destructure)]
pub struct BookInventory {
    id: BookId,
    available: AvailableQuantity,
}

impl BookInventory {
    pub fn new(id: BookId, available: AvailableQuantity) -> Self {
        Self { id, available }
    }

    pub fn is_in_stock(&self) -> bool {
        *self.available.as_ref() >= 1
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use crate::entity::{AvailableQuantity, BookId, BookInventory};

    #[test]
    fn stock() {
        let id = BookId::new(Uuid::new_v4());
        assert!(BookInventory::new(id.clone(), AvailableQuantity::new(1)).is_in_stock());
        assert!(!BookInventory::new(id, AvailableQuantity::new(0)).is_in_stock());
    }
}
