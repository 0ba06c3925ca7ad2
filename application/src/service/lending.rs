use error_stack::Report;
use tracing::{debug, warn};

use kernel::interface::clock::{Clock, DependOnClock};
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::policy::DependOnLendingPolicy;
use kernel::interface::query::{
    DependOnInventoryQuery, DependOnLoanQuery, InventoryQuery, LoanQuery,
};
use kernel::interface::update::{
    DependOnInventoryModifier, DependOnLoanModifier, InventoryModifier, LoanModifier,
};
use kernel::prelude::entity::{
    BookId, BorrowedAt, Loan, LoanId, LoanStatus, ReturnedAt, UserId,
};
use kernel::KernelError;

use crate::transfer::{BorrowBookDto, LoanDto, ReturnBookDto};

/// Borrow one copy of a book.
///
/// Every check runs inside the same transaction that decrements the stock,
/// after the inventory row has been locked. A concurrent borrow of the same
/// book waits on that lock and then sees the committed result of this one.
#[async_trait::async_trait]
pub trait BorrowBookService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnInventoryQuery
    + DependOnInventoryModifier
    + DependOnLoanQuery
    + DependOnLoanModifier
    + DependOnClock
    + DependOnLendingPolicy
{
    async fn borrow_book(&self, dto: BorrowBookDto) -> error_stack::Result<LoanDto, KernelError> {
        let book_id = BookId::new(dto.book_id);
        let user_id = UserId::new(dto.user_id);
        let mut connection = self.database_connection().transact().await?;
        match borrow_within(self, &mut connection, &book_id, &user_id).await {
            Ok(loan) => {
                connection.commit().await?;
                debug!(loan_id = ?loan.id(), ?book_id, ?user_id, "Book borrowed");
                Ok(LoanDto::from(loan))
            }
            Err(report) => Err(abort(connection, report).await),
        }
    }
}

impl<T> BorrowBookService for T where
    T: DependOnDatabaseConnection
        + DependOnInventoryQuery
        + DependOnInventoryModifier
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnClock
        + DependOnLendingPolicy
{
}

/// Return a borrowed book. A loan that is already returned is reported the
/// same way as one that never existed.
#[async_trait::async_trait]
pub trait ReturnBookService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnInventoryQuery
    + DependOnInventoryModifier
    + DependOnLoanQuery
    + DependOnLoanModifier
    + DependOnClock
{
    async fn return_book(&self, dto: ReturnBookDto) -> error_stack::Result<(), KernelError> {
        let loan_id = LoanId::new(dto.loan_id);
        let user_id = UserId::new(dto.user_id);
        let mut connection = self.database_connection().transact().await?;
        match return_within(self, &mut connection, &loan_id, &user_id).await {
            Ok(()) => {
                connection.commit().await?;
                debug!(?loan_id, ?user_id, "Book returned");
                Ok(())
            }
            Err(report) => Err(abort(connection, report).await),
        }
    }
}

impl<T> ReturnBookService for T where
    T: DependOnDatabaseConnection
        + DependOnInventoryQuery
        + DependOnInventoryModifier
        + DependOnLoanQuery
        + DependOnLoanModifier
        + DependOnClock
{
}

async fn borrow_within<S>(
    service: &S,
    con: &mut <S::DatabaseConnection as DatabaseConnection>::Transaction,
    book_id: &BookId,
    user_id: &UserId,
) -> error_stack::Result<Loan, KernelError>
where
    S: BorrowBookService + ?Sized,
{
    let now = service.clock().now();

    let inventory = service
        .inventory_query()
        .lock_for_update(con, book_id)
        .await?
        .ok_or_else(|| {
            Report::new(KernelError::NotFound).attach_printable(format!("Book {book_id:?}"))
        })?;

    if !inventory.is_in_stock() {
        return Err(Report::new(KernelError::OutOfStock).attach_printable(format!("Book {book_id:?}")));
    }

    let active = service
        .loan_query()
        .find_active_by_user_and_book(con, user_id, book_id)
        .await?;
    if let Some(active) = active {
        return Err(Report::new(KernelError::AlreadyBorrowed)
            .attach_printable(format!("Open loan {:?}", active.id())));
    }

    let policy = service.lending_policy();
    let recent = service
        .loan_query()
        .count_by_user_since(con, user_id, &policy.window_start(now))
        .await?;
    if policy.is_exceeded(recent) {
        return Err(Report::new(KernelError::BorrowLimitExceeded).attach_printable(format!(
            "{recent} loans within {} (limit {})",
            policy.window(),
            policy.max_loans()
        )));
    }

    let changed = service
        .inventory_modifier()
        .apply_delta(con, book_id, -1)
        .await?;
    if changed != 1 {
        return Err(Report::new(KernelError::Internal)
            .attach_printable(format!("Decrement of book {book_id:?} changed {changed} rows")));
    }

    let loan = Loan::borrow(
        LoanId::generate(),
        user_id.clone(),
        book_id.clone(),
        BorrowedAt::new(now),
    );
    service.loan_modifier().create(con, &loan).await?;
    Ok(loan)
}

async fn return_within<S>(
    service: &S,
    con: &mut <S::DatabaseConnection as DatabaseConnection>::Transaction,
    loan_id: &LoanId,
    user_id: &UserId,
) -> error_stack::Result<(), KernelError>
where
    S: ReturnBookService + ?Sized,
{
    let now = service.clock().now();

    let loan = service
        .loan_query()
        .find_borrowed_by_id(con, loan_id)
        .await?
        .ok_or_else(|| {
            Report::new(KernelError::NotFound).attach_printable(format!("Loan {loan_id:?}"))
        })?;

    if !loan.is_owned_by(user_id) {
        return Err(Report::new(KernelError::Unauthorized)
            .attach_printable(format!("Loan {loan_id:?} requested by {user_id:?}")));
    }

    let book_id = loan.book_id();
    service
        .inventory_query()
        .lock_for_update(con, book_id)
        .await?
        .ok_or_else(|| {
            Report::new(KernelError::Internal)
                .attach_printable(format!("Loan {loan_id:?} refers to missing book {book_id:?}"))
        })?;

    let changed = service
        .inventory_modifier()
        .apply_delta(con, book_id, 1)
        .await?;
    if changed != 1 {
        return Err(Report::new(KernelError::Internal)
            .attach_printable(format!("Increment of book {book_id:?} changed {changed} rows")));
    }

    // Zero rows means another return of this loan committed while we waited
    // for the inventory lock.
    let changed = service
        .loan_modifier()
        .update_status(con, loan_id, LoanStatus::Returned, &ReturnedAt::new(now))
        .await?;
    if changed != 1 {
        return Err(Report::new(KernelError::NotFound)
            .attach_printable(format!("Loan {loan_id:?} was returned concurrently")));
    }
    Ok(())
}

async fn abort<T: Transaction>(con: T, report: Report<KernelError>) -> Report<KernelError> {
    if let Err(failure) = con.roll_back().await {
        warn!("Roll back failed after {:?}: {failure:?}", report.current_context());
    }
    report
}
