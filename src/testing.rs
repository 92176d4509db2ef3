//! # Testing Harness
//!
//! Runs a real [`Application`] with OS signal handling disabled, so tests can start a set
//! of services, exercise them through the context, and stop them deterministically.
//!
//! ```rust
//! use app_context::{BoxError, Provider, Service, TestingApplication};
//!
//! struct Clock;
//!
//! #[async_trait::async_trait]
//! impl Service for Clock {
//!     fn name(&self) -> &str { "clock" }
//!     async fn init(&self, _: &mut Provider<'_>) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), app_context::ContextError> {
//! let mut app = TestingApplication::new().with_service(Clock);
//! let context = app.start().await?;
//! let _clock = context.get::<Clock>("clock").await?;
//! app.stop().await?;
//! # Ok(())
//! # }
//! ```

use crate::context::AppContext;
use crate::error::ContextError;
use crate::runtime::{try_setup_tracing, Application, ContextConfig, ServicePackage};
use crate::service::{Service, ServiceHandle};

#[derive(Debug)]
pub struct TestingApplication {
    config: ContextConfig,
    package: ServicePackage,
    app: Option<Application>,
}

impl Default for TestingApplication {
    fn default() -> Self {
        Self::new()
    }
}

impl TestingApplication {
    pub fn new() -> Self {
        try_setup_tracing();
        Self {
            config: ContextConfig::default().with_os_signals(false),
            package: ServicePackage::new(),
            app: None,
        }
    }

    pub fn with_service<S: Service>(mut self, service: S) -> Self {
        self.package = self.package.with(service);
        self
    }

    /// Registers `service` under `name`, e.g. a stub standing in for a real component.
    pub fn with_named<S: Service>(mut self, name: impl Into<String>, service: S) -> Self {
        self.package = self.package.with_named(name, service);
        self
    }

    /// Registers an already shared instance, so the test keeps its own handle to it.
    pub fn with_handle(mut self, handle: ServiceHandle) -> Self {
        self.package = self.package.with_handle(handle);
        self
    }

    pub fn with_package(mut self, package: ServicePackage) -> Self {
        self.package = self.package.merge(package);
        self
    }

    /// Signal handling stays disabled regardless of `config`.
    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config.with_os_signals(false);
        self
    }

    /// Starts the application. Returns once every lifecycle-aware service has handled
    /// `after_start`.
    pub async fn start(&mut self) -> Result<AppContext, ContextError> {
        let package = std::mem::take(&mut self.package);
        let app = Application::start(self.config.clone(), [package]).await?;
        let context = app.context().clone();
        self.app = Some(app);
        Ok(context)
    }

    pub fn context(&self) -> Option<&AppContext> {
        self.app.as_ref().map(Application::context)
    }

    /// Stops the application and returns how the run ended. A no-op if not started.
    pub async fn stop(&mut self) -> Result<(), ContextError> {
        match self.app.take() {
            Some(app) => {
                app.stop().await;
                app.join().await
            }
            None => Ok(()),
        }
    }
}
