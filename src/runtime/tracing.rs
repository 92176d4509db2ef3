use super::ContextConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Initializes the tracing/logging infrastructure for the application.
///
/// This sets up structured logging using the `tracing` crate with:
/// - **Environment-based filtering**: Controlled via `RUST_LOG` environment variable
/// - **Compact formatting**: One line per event with its structured fields
///
/// # Environment Variables
///
/// Set `RUST_LOG` to control log verbosity:
/// - `RUST_LOG=info` - Phase banners (`=== starting... ===`) and failures
/// - `RUST_LOG=debug` - Per-service steps: registration, dependency requests, notifications
/// - `RUST_LOG=app_context=debug` - Debug only for this crate
///
/// Panics if a global subscriber is already installed; see [`try_setup_tracing`].
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Application started");
/// ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(None))
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a subscriber is
/// already installed. Safe to call from every test.
pub fn try_setup_tracing() -> bool {
    try_setup_tracing_with(&ContextConfig::default())
}

/// Installs the subscriber, using the config's log filter when `RUST_LOG` is unset.
pub fn try_setup_tracing_with(config: &ContextConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config.log_filter()))
        .compact()
        .try_init()
        .is_ok()
}

fn env_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_FILTER)))
}
