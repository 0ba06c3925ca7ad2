use error_stack::Report;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::LoanQuery;
use kernel::interface::update::LoanModifier;
use kernel::prelude::entity::{
    BookId, BorrowedAt, Loan, LoanId, LoanStatus, ReturnedAt, UserId,
};
use kernel::KernelError;

use crate::database::postgres::PostgresTransaction;
use crate::error::ConvertError;

pub struct PostgresLoanRepository;

#[async_trait::async_trait]
impl LoanQuery for PostgresLoanRepository {
    type Transaction = PostgresTransaction;

    async fn find_active_by_user_and_book(
        &self,
        con: &mut PostgresTransaction,
        user_id: &UserId,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        PgLoanInternal::find_active_by_user_and_book(con, user_id, book_id).await
    }

    async fn count_by_user_since(
        &self,
        con: &mut PostgresTransaction,
        user_id: &UserId,
        since: &OffsetDateTime,
    ) -> error_stack::Result<i64, KernelError> {
        PgLoanInternal::count_by_user_since(con, user_id, since).await
    }

    async fn find_borrowed_by_id(
        &self,
        con: &mut PostgresTransaction,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        PgLoanInternal::find_borrowed_by_id(con, id).await
    }

    async fn find_by_user_id(
        &self,
        con: &mut PostgresTransaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        PgLoanInternal::find_by_user_id(con, user_id).await
    }
}

#[async_trait::async_trait]
impl LoanModifier for PostgresLoanRepository {
    type Transaction = PostgresTransaction;

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        loan: &Loan,
    ) -> error_stack::Result<(), KernelError> {
        PgLoanInternal::create(con, loan).await
    }

    async fn update_status(
        &self,
        con: &mut PostgresTransaction,
        id: &LoanId,
        status: LoanStatus,
        returned_at: &ReturnedAt,
    ) -> error_stack::Result<u64, KernelError> {
        PgLoanInternal::update_status(con, id, status, returned_at).await
    }
}

#[derive(sqlx::FromRow)]
struct LoanRow {
    id: Uuid,
    user_id: Uuid,
    book_id: Uuid,
    borrow_date: OffsetDateTime,
    return_date: Option<OffsetDateTime>,
    status: String,
}

impl TryFrom<LoanRow> for Loan {
    type Error = Report<KernelError>;

    fn try_from(value: LoanRow) -> Result<Self, Self::Error> {
        Ok(Loan::new(
            LoanId::new(value.id),
            UserId::new(value.user_id),
            BookId::new(value.book_id),
            BorrowedAt::new(value.borrow_date),
            value.return_date.map(ReturnedAt::new),
            value.status.parse()?,
        ))
    }
}

pub(in crate::database) struct PgLoanInternal;

impl PgLoanInternal {
    async fn find_active_by_user_and_book(
        con: &mut PgConnection,
        user_id: &UserId,
        book_id: &BookId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        let row = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, user_id, book_id, borrow_date, return_date, status
            FROM lending_records
            WHERE user_id = $1 AND book_id = $2 AND status = $3
            LIMIT 1
            "#,
        )
        .bind(user_id.as_ref())
        .bind(book_id.as_ref())
        .bind(LoanStatus::Borrowed.as_str())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Loan::try_from).transpose()
    }

    async fn count_by_user_since(
        con: &mut PgConnection,
        user_id: &UserId,
        since: &OffsetDateTime,
    ) -> error_stack::Result<i64, KernelError> {
        sqlx::query_scalar::<_, i64>(
            // language=postgresql
            r#"
            SELECT COUNT(*)
            FROM lending_records
            WHERE user_id = $1 AND borrow_date >= $2
            "#,
        )
        .bind(user_id.as_ref())
        .bind(since)
        .fetch_one(con)
        .await
        .convert_error()
    }

    async fn find_borrowed_by_id(
        con: &mut PgConnection,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        let row = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, user_id, book_id, borrow_date, return_date, status
            FROM lending_records
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.as_ref())
        .bind(LoanStatus::Borrowed.as_str())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Loan::try_from).transpose()
    }

    async fn find_by_user_id(
        con: &mut PgConnection,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, user_id, book_id, borrow_date, return_date, status
            FROM lending_records
            WHERE user_id = $1
            ORDER BY borrow_date
            "#,
        )
        .bind(user_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        rows.into_iter().map(Loan::try_from).collect()
    }

    async fn create(con: &mut PgConnection, loan: &Loan) -> error_stack::Result<(), KernelError> {
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO lending_records (id, user_id, book_id, borrow_date, return_date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(loan.id().as_ref())
        .bind(loan.user_id().as_ref())
        .bind(loan.book_id().as_ref())
        .bind(loan.borrowed_at().as_ref())
        .bind(loan.returned_at().as_ref().map(|at| *at.as_ref()))
        .bind(loan.status().as_str())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn update_status(
        con: &mut PgConnection,
        id: &LoanId,
        status: LoanStatus,
        returned_at: &ReturnedAt,
    ) -> error_stack::Result<u64, KernelError> {
        // Only an open loan is closed; a second return changes no row.
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE lending_records
            SET status = $2, return_date = $3, updated_at = now()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id.as_ref())
        .bind(status.as_str())
        .bind(returned_at.as_ref())
        .bind(LoanStatus::Borrowed.as_str())
        .execute(con)
        .await
        .convert_error()?;
        Ok(result.rows_affected())
    }
}
