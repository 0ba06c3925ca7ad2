mod borrowed_at;
mod id;
mod returned_at;
mod status;

pub use self::{borrowed_at::*, id::*, returned_at::*, status::*};
use crate::entity::{BookId, UserId};
use destructure::Destructure;
use vodca::References;

/// One borrow/return cycle of one book by one user.
///
/// Created as [`LoanStatus::Borrowed`] and moved exactly once to
/// [`LoanStatus::Returned`]. Loans are never deleted or reopened.
#[derive(Debug, Clone, Eq, PartialEq, References, Destructure)]
pub struct Loan {
    id: LoanId,
    user_id: UserId,
    book_id: BookId,
    borrowed_at: BorrowedAt,
    returned_at: Option<ReturnedAt>,
    status: LoanStatus,
}

impl Loan {
    pub fn new(
        id: LoanId,
        user_id: UserId,
        book_id: BookId,
        borrowed_at: BorrowedAt,
        returned_at: Option<ReturnedAt>,
        status: LoanStatus,
    ) -> Self {
        Self {
            id,
            user_id,
            book_id,
            borrowed_at,
            returned_at,
            status,
        }
    }

    pub fn borrow(id: LoanId, user_id: UserId, book_id: BookId, at: BorrowedAt) -> Self {
        Self::new(id, user_id, book_id, at, None, LoanStatus::Borrowed)
    }

    pub fn is_borrowed(&self) -> bool {
        self.status == LoanStatus::Borrowed
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}
