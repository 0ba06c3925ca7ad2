use kernel::KernelError;

/// Lifts a driver-specific error into a [`KernelError`] report, choosing the
/// context from the kind of failure.
pub trait ConvertError {
    type Ok;
    fn convert_error(self) -> error_stack::Result<Self::Ok, KernelError>;
}
