use std::env::VarError;

use error_stack::Report;
use kernel::KernelError;

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod module;

pub(crate) fn env(key: &str) -> error_stack::Result<Option<String>, KernelError> {
    match dotenvy::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
        Err(error) => Err(Report::new(error)
            .change_context(KernelError::Internal)
            .attach_printable(format!("Failed to read {key}"))),
    }
}
