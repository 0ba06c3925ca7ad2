mod inventory;
mod lending;
mod loan;

pub use self::{inventory::*, lending::*, loan::*};
