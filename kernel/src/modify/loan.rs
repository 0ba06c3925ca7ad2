use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{Loan, LoanId, LoanStatus, ReturnedAt};
use crate::KernelError;

#[async_trait::async_trait]
pub trait LoanModifier: 'static + Sync + Send {
    type Transaction: Transaction;

    async fn create(
        &self,
        con: &mut Self::Transaction,
        loan: &Loan,
    ) -> error_stack::Result<(), KernelError>;

    /// Moves a loan that is still [`LoanStatus::Borrowed`] to `status`.
    /// Returns the number of loans changed, `0` when it was already closed.
    async fn update_status(
        &self,
        con: &mut Self::Transaction,
        id: &LoanId,
        status: LoanStatus,
        returned_at: &ReturnedAt,
    ) -> error_stack::Result<u64, KernelError>;
}

pub trait DependOnLoanModifier: 'static + Sync + Send + DependOnDatabaseConnection {
    type LoanModifier: LoanModifier<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn loan_modifier(&self) -> &Self::LoanModifier;
}
