mod inventory;
mod loan;

pub use self::{inventory::*, loan::*};
