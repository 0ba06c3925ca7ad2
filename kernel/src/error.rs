use std::fmt::Display;

use error_stack::Context;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KernelError {
    NotFound,
    OutOfStock,
    AlreadyBorrowed,
    BorrowLimitExceeded,
    Unauthorized,
    Concurrency,
    Timeout,
    Internal,
}

impl KernelError {
    /// Business-rule failures are terminal for the call. Everything else is an
    /// infrastructure failure that left no committed effect and may be retried.
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            KernelError::NotFound
                | KernelError::OutOfStock
                | KernelError::AlreadyBorrowed
                | KernelError::BorrowLimitExceeded
                | KernelError::Unauthorized
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            KernelError::NotFound => "requested book or active loan was not found",
            KernelError::OutOfStock => "book is out of stock",
            KernelError::AlreadyBorrowed => "you have already borrowed this book",
            KernelError::BorrowLimitExceeded => "borrowing limit exceeded for the current window",
            KernelError::Unauthorized => "you are not authorized to return this book",
            KernelError::Concurrency => "Concurrency error",
            KernelError::Timeout => "Process timed out",
            KernelError::Internal => "Internal kernel error",
        }
    }
}

impl Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl Context for KernelError {}

#[cfg(test)]
mod test {
    use crate::KernelError;

    #[test]
    fn classify() {
        let business = [
            KernelError::NotFound,
            KernelError::OutOfStock,
            KernelError::AlreadyBorrowed,
            KernelError::BorrowLimitExceeded,
            KernelError::Unauthorized,
        ];
        for error in business {
            assert!(error.is_business_rule(), "{error:?}");
        }
        for error in [
            KernelError::Concurrency,
            KernelError::Timeout,
            KernelError::Internal,
        ] {
            assert!(!error.is_business_rule(), "{error:?}");
        }
    }

    #[test]
    fn messages_are_distinct() {
        let messages = [
            KernelError::NotFound,
            KernelError::OutOfStock,
            KernelError::AlreadyBorrowed,
            KernelError::BorrowLimitExceeded,
            KernelError::Unauthorized,
        ]
        .map(|error| error.to_string());
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
