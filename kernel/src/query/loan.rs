use time::OffsetDateTime;

use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{BookId, Loan, LoanId, UserId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait LoanQuery: 'static + Sync + Send {
    type Transaction: Transaction;

    async fn find_active_by_user_and_book(
        &self,
        con: &mut Self::Transaction,
        user_id: &UserId,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Loan>, KernelError>;

    /// Counts every loan of the user, whatever its status, borrowed at or
    /// after `since`.
    async fn count_by_user_since(
        &self,
        con: &mut Self::Transaction,
        user_id: &UserId,
        since: &OffsetDateTime,
    ) -> error_stack::Result<i64, KernelError>;

    /// Never matches a loan that has already been returned.
    async fn find_borrowed_by_id(
        &self,
        con: &mut Self::Transaction,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError>;

    async fn find_by_user_id(
        &self,
        con: &mut Self::Transaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError>;
}

pub trait DependOnLoanQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type LoanQuery: LoanQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn loan_query(&self) -> &Self::LoanQuery;
}
