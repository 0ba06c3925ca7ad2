use time::OffsetDateTime;

use kernel::interface::query::LoanQuery;
use kernel::interface::update::LoanModifier;
use kernel::prelude::entity::{BookId, Loan, LoanId, LoanStatus, ReturnedAt, UserId};
use kernel::KernelError;

use crate::database::memory::InMemoryTransaction;

pub struct InMemoryLoanRepository;

#[async_trait::async_trait]
impl LoanQuery for InMemoryLoanRepository {
    type Transaction = InMemoryTransaction;

    async fn find_active_by_user_and_book(
        &self,
        con: &mut InMemoryTransaction,
        user_id: &UserId,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        Ok(con.loans().await.into_iter().find(|loan| {
            loan.is_borrowed() && loan.is_owned_by(user_id) && loan.book_id() == book_id
        }))
    }

    async fn count_by_user_since(
        &self,
        con: &mut InMemoryTransaction,
        user_id: &UserId,
        since: &OffsetDateTime,
    ) -> error_stack::Result<i64, KernelError> {
        let count = con
            .loans()
            .await
            .iter()
            .filter(|loan| loan.is_owned_by(user_id) && loan.borrowed_at().as_ref() >= since)
            .count();
        Ok(count as i64)
    }

    async fn find_borrowed_by_id(
        &self,
        con: &mut InMemoryTransaction,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        Ok(con
            .loans()
            .await
            .into_iter()
            .find(|loan| loan.id() == id && loan.is_borrowed()))
    }

    async fn find_by_user_id(
        &self,
        con: &mut InMemoryTransaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let mut loans = con
            .loans()
            .await
            .into_iter()
            .filter(|loan| loan.is_owned_by(user_id))
            .collect::<Vec<_>>();
        loans.sort_by_key(|loan| *loan.borrowed_at().as_ref());
        Ok(loans)
    }
}

#[async_trait::async_trait]
impl LoanModifier for InMemoryLoanRepository {
    type Transaction = InMemoryTransaction;

    async fn create(
        &self,
        con: &mut InMemoryTransaction,
        loan: &Loan,
    ) -> error_stack::Result<(), KernelError> {
        con.stage_loan(loan.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        con: &mut InMemoryTransaction,
        id: &LoanId,
        status: LoanStatus,
        returned_at: &ReturnedAt,
    ) -> error_stack::Result<u64, KernelError> {
        let open = con
            .loans()
            .await
            .iter()
            .any(|loan| loan.id() == id && loan.is_borrowed());
        if !open {
            return Ok(0);
        }
        con.stage_return(id, status, returned_at.clone());
        Ok(1)
    }
}
