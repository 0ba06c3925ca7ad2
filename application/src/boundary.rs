use std::fmt::{Display, Formatter};

use error_stack::Report;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use kernel::KernelError;

use crate::service::{BorrowBookService, ReturnBookService};
use crate::transfer::{BorrowBookDto, LoanDto, ReturnBookDto};

static INFRASTRUCTURE_MESSAGE: &str = "temporary failure, please try again";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    OutOfStock,
    AlreadyBorrowed,
    BorrowLimitExceeded,
    Unauthorized,
    Infrastructure,
}

/// What a caller gets back when a lending request is refused. Business
/// refusals keep their own kind and message; every storage problem collapses
/// into [`FailureKind::Infrastructure`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Failure {
    kind: FailureKind,
    message: &'static str,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Infrastructure
    }
}

impl From<&Report<KernelError>> for Failure {
    fn from(report: &Report<KernelError>) -> Self {
        let error = report.current_context();
        let kind = match error {
            KernelError::NotFound => FailureKind::NotFound,
            KernelError::OutOfStock => FailureKind::OutOfStock,
            KernelError::AlreadyBorrowed => FailureKind::AlreadyBorrowed,
            KernelError::BorrowLimitExceeded => FailureKind::BorrowLimitExceeded,
            KernelError::Unauthorized => FailureKind::Unauthorized,
            KernelError::Concurrency | KernelError::Timeout | KernelError::Internal => {
                return Self {
                    kind: FailureKind::Infrastructure,
                    message: INFRASTRUCTURE_MESSAGE,
                }
            }
        };
        Self {
            kind,
            message: error.message(),
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message)
    }
}

fn reject(report: Report<KernelError>) -> Failure {
    let failure = Failure::from(&report);
    if report.current_context().is_business_rule() {
        info!(kind = ?failure.kind(), "{}", failure.message());
    } else {
        error!("{report:?}");
    }
    failure
}

/// Entry points for whatever host accepts lending requests.
#[async_trait::async_trait]
pub trait LendingBoundary: 'static + Sync + Send + BorrowBookService + ReturnBookService {
    async fn borrow(&self, book_id: Uuid, user_id: Uuid) -> Result<LoanDto, Failure> {
        self.borrow_book(BorrowBookDto { book_id, user_id })
            .await
            .map_err(reject)
    }

    async fn return_loan(&self, loan_id: Uuid, user_id: Uuid) -> Result<(), Failure> {
        self.return_book(ReturnBookDto { loan_id, user_id })
            .await
            .map_err(reject)
    }
}

impl<T> LendingBoundary for T where T: BorrowBookService + ReturnBookService {}

#[cfg(test)]
mod test {
    use error_stack::Report;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use driver::clock::ManualClock;
    use driver::database::{InMemoryDatabase, InMemoryInventoryRepository};
    use driver::module::LendingModule;
    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::update::InventoryModifier;
    use kernel::prelude::entity::{AvailableQuantity, BookId, BookInventory, LendingPolicy};
    use kernel::KernelError;

    use crate::boundary::{Failure, FailureKind, LendingBoundary};

    #[test]
    fn business_errors_keep_their_kind() {
        let cases = [
            (KernelError::NotFound, FailureKind::NotFound),
            (KernelError::OutOfStock, FailureKind::OutOfStock),
            (KernelError::AlreadyBorrowed, FailureKind::AlreadyBorrowed),
            (KernelError::BorrowLimitExceeded, FailureKind::BorrowLimitExceeded),
            (KernelError::Unauthorized, FailureKind::Unauthorized),
        ];
        for (error, kind) in cases {
            let failure = Failure::from(&Report::new(error));
            assert_eq!(failure.kind(), kind);
            assert_eq!(failure.message(), error.message());
            assert!(!failure.is_retryable());
        }
    }

    #[test]
    fn infrastructure_errors_are_opaque() {
        for error in [
            KernelError::Concurrency,
            KernelError::Timeout,
            KernelError::Internal,
        ] {
            let report = Report::new(error).attach_printable("connection reset");
            let failure = Failure::from(&report);
            assert_eq!(failure.kind(), FailureKind::Infrastructure);
            assert_eq!(failure.to_string(), "temporary failure, please try again");
            assert!(failure.is_retryable());
        }
    }

    #[tokio::test]
    async fn boundary_round_trip() -> error_stack::Result<(), KernelError> {
        let _ = driver::logging::init_tracing();
        let module = LendingModule::new(
            InMemoryDatabase::new(),
            ManualClock::new(OffsetDateTime::UNIX_EPOCH),
            LendingPolicy::default(),
        );
        let book = Uuid::new_v4();
        let mut con = module.database().transact().await?;
        InMemoryInventoryRepository
            .create(
                &mut con,
                &BookInventory::new(BookId::new(book), AvailableQuantity::new(1)),
            )
            .await?;
        con.commit().await?;

        let user = Uuid::new_v4();
        let loan = module.borrow(book, user).await.unwrap();
        let failure = module.borrow(book, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::OutOfStock);
        assert_eq!(failure.message(), "book is out of stock");

        let failure = module.return_loan(loan.id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Unauthorized);

        module.return_loan(loan.id, user).await.unwrap();
        let failure = module.return_loan(loan.id, user).await.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::NotFound);
        Ok(())
    }
}
