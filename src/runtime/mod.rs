//! Process-level runtime around an [`AppContext`](crate::AppContext).
//!
//! - [`Application`] - starts a context from [`ServicePackage`]s and runs its supervisor loop
//! - [`ContextConfig`] - channel capacity, signal handling, default log filter
//! - [`TimerTask`] - periodic work for lifecycle-aware services
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

mod application;
mod config;
mod os_signals;
mod package;
mod supervisor;
mod timer;
mod tracing;

pub use application::*;
pub use config::*;
pub use package::*;
pub use timer::*;
pub use self::tracing::*;
