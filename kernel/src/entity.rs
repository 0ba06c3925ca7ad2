mod book;
mod loan;
mod policy;
mod user;

pub use self::{book::*, loan::*, policy::*, user::*};
