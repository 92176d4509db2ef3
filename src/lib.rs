//! # Application Context
//!
//! > **An in-process application context for Tokio services.**
//!
//! Register independently authored services, let the context initialize them in dependency
//! order, and have it drive their lifecycle until the process is asked to stop.
//!
//! ## 🚀 Core Concepts
//!
//! ### Services
//! A [`Service`] has a unique name and an async `init` that receives a [`Provider`]. Every
//! lookup through the provider is both a dependency request and a recorded edge: if the
//! requested service is not initialized yet, it is initialized right there, recursively.
//! The order in which services are registered therefore never matters.
//!
//! ### Startup is all-or-nothing
//! An unknown dependency, a dependency cycle or a failing `init` aborts startup. Services
//! that were already initialized are disposed and [`AppContext::start`] returns the error.
//!
//! ### Optional roles
//! - [`LifecycleAware`]: `after_start` is fanned out concurrently once everything is
//!   initialized; `before_stop` runs sequentially in reverse initialization order.
//! - [`HealthReporter`]: polled by [`ContextHealth::aggregate`], which rolls the reports up
//!   into the worst status.
//!
//! ## 🗺️ Module Tour
//!
//! - [`context`]: the [`AppContext`] state machine (`NotInitialized → Initializing →
//!   Initialized → Used`).
//! - [`service`] and [`provider`]: the component contract and dependency resolution.
//! - `lifecycle`: start/stop notifications and disposal, each behind a recovery boundary.
//! - [`event`]: the control channel. Background work reports failures or stop requests.
//! - [`runtime`]: [`Application`], the supervisor loop, OS signals, [`TimerTask`], config and
//!   tracing setup.
//! - [`health`] and [`stats`]: operational snapshots, serializable with `serde`.
//! - [`testing`]: [`TestingApplication`] for integration tests.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs, stop it with Ctrl-C
//! RUST_LOG=info cargo run -p context-demo
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod health;
mod lifecycle;
pub mod provider;
mod registry;
pub mod runtime;
pub mod service;
pub mod state;
pub mod stats;
pub mod testing;

pub use context::AppContext;
pub use error::{BoxError, ContextError};
pub use event::{ContextEvent, EventSender};
pub use health::{rollup_status, ContextHealth, HealthReport, HealthStatus};
pub use provider::{Dependency, Provider};
pub use registry::CTX_NAME;
pub use runtime::{
    run_application, setup_tracing, try_setup_tracing, try_setup_tracing_with, Application,
    ContextConfig, ServicePackage, TimerTask,
};
pub use service::{HealthReporter, LifecycleAware, Service, ServiceHandle};
pub use state::{ContextState, ContextStateView};
pub use stats::{ContextStats, ServiceDescriptor};
pub use testing::TestingApplication;
