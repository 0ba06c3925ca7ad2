use kernel::prelude::entity::{DestructLoan, Loan, LoanStatus};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoanDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrowed_at: OffsetDateTime,
    pub returned_at: Option<OffsetDateTime>,
    pub status: LoanStatus,
}

impl From<Loan> for LoanDto {
    fn from(value: Loan) -> Self {
        let DestructLoan {
            id,
            user_id,
            book_id,
            borrowed_at,
            returned_at,
            status,
        } = value.into_destruct();
        Self {
            id: *id.as_ref(),
            user_id: *user_id.as_ref(),
            book_id: *book_id.as_ref(),
            borrowed_at: *borrowed_at.as_ref(),
            returned_at: returned_at.map(|at| *at.as_ref()),
            status,
        }
    }
}

pub struct BorrowBookDto {
    pub book_id: Uuid,
    pub user_id: Uuid,
}

pub struct ReturnBookDto {
    pub loan_id: Uuid,
    pub user_id: Uuid,
}

pub struct GetLoansByUserDto {
    pub user_id: Uuid,
}
