use error_stack::ResultExt;
use kernel::KernelError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

static DEFAULT_FILTER: &str = "driver=debug,application=debug,sqlx=warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Fails if a subscriber is already installed.
pub fn init_tracing() -> error_stack::Result<(), KernelError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| DEFAULT_FILTER.into()),
            ),
        )
        .try_init()
        .change_context_lazy(|| KernelError::Internal)
        .attach_printable_lazy(|| "Failed to install tracing subscriber")
}
