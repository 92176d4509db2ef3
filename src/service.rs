//! # Service Contract
//!
//! A service is an independently authored component owned by an [`AppContext`](crate::AppContext).
//! The context calls `init` exactly once (resolving dependencies through a [`Provider`]),
//! notifies lifecycle-aware services after start and before stop, and calls `dispose` at the end.
//!
//! ## Optional roles
//!
//! A service declares which optional roles it fulfills by overriding
//! [`Service::as_lifecycle_aware`] and [`Service::as_health_reporter`]. The context asks once,
//! at registration, and keeps the answer in the registry entry:
//!
//! ```rust
//! use std::sync::Arc;
//! use app_context::{BoxError, LifecycleAware, Provider, Service};
//! use async_trait::async_trait;
//!
//! struct Poller;
//!
//! #[async_trait]
//! impl Service for Poller {
//!     fn name(&self) -> &str { "poller" }
//!
//!     async fn init(&self, _provider: &mut Provider<'_>) -> Result<(), BoxError> { Ok(()) }
//!
//!     fn as_lifecycle_aware(self: Arc<Self>) -> Option<Arc<dyn LifecycleAware>> { Some(self) }
//! }
//!
//! #[async_trait]
//! impl LifecycleAware for Poller {
//!     async fn after_start(&self) -> Result<(), BoxError> { Ok(()) }
//!     async fn before_stop(&self) -> Result<(), BoxError> { Ok(()) }
//! }
//! ```

use crate::error::{BoxError, ContextError};
use crate::health::HealthReport;
use crate::provider::Provider;
use async_trait::async_trait;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Contract every registered component implements.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Unique name within one context. `"CTX"` is reserved.
    fn name(&self) -> &str;

    /// Resolves dependencies and prepares the service.
    ///
    /// Every `provider` lookup is recorded as a dependency edge of this service.
    /// Returning an error aborts the whole startup.
    async fn init(&self, provider: &mut Provider<'_>) -> Result<(), BoxError>;

    /// Releases resources. Called concurrently with the disposal of other services.
    async fn dispose(&self) -> Result<(), BoxError> {
        Ok(())
    }

    fn as_lifecycle_aware(self: Arc<Self>) -> Option<Arc<dyn LifecycleAware>> {
        None
    }

    fn as_health_reporter(self: Arc<Self>) -> Option<Arc<dyn HealthReporter>> {
        None
    }
}

/// Start/stop notifications for services that run background work.
#[async_trait]
pub trait LifecycleAware: Send + Sync {
    /// Called concurrently for every lifecycle-aware service once all are initialized.
    async fn after_start(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called sequentially, in reverse initialization order, when the context stops.
    async fn before_stop(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Services that report their own operational health.
#[async_trait]
pub trait HealthReporter: Send + Sync {
    async fn health(&self) -> HealthReport;
}

/// Type-erased registry entry for one service instance.
///
/// Holds the same allocation twice: as `dyn Service` for the lifecycle calls and as
/// `dyn Any` so dependents can get the concrete type back. Cheap to clone.
#[derive(Clone)]
pub struct ServiceHandle {
    name: String,
    type_name: &'static str,
    service: Arc<dyn Service>,
    instance: Arc<dyn Any + Send + Sync>,
    lifecycle: Option<Arc<dyn LifecycleAware>>,
    health: Option<Arc<dyn HealthReporter>>,
}

impl ServiceHandle {
    pub fn new<S: Service>(service: S) -> Self {
        Self::from_arc(Arc::new(service))
    }

    pub fn from_arc<S: Service>(service: Arc<S>) -> Self {
        let lifecycle = service.clone().as_lifecycle_aware();
        let health = service.clone().as_health_reporter();
        Self {
            name: service.name().to_string(),
            type_name: type_name::<S>(),
            instance: service.clone(),
            service,
            lifecycle,
            health,
        }
    }

    /// Registers the service under `name` instead of its own [`Service::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified Rust type of the service.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }

    pub fn is_lifecycle_aware(&self) -> bool {
        self.lifecycle.is_some()
    }

    pub fn is_health_reporter(&self) -> bool {
        self.health.is_some()
    }

    pub(crate) fn lifecycle(&self) -> Option<&Arc<dyn LifecycleAware>> {
        self.lifecycle.as_ref()
    }

    pub(crate) fn health_reporter(&self) -> Option<&Arc<dyn HealthReporter>> {
        self.health.as_ref()
    }

    /// Returns the concrete service, or `TypeMismatch` if it is not a `T`.
    pub fn downcast<T: Service>(&self) -> Result<Arc<T>, ContextError> {
        Arc::downcast::<T>(self.instance.clone()).map_err(|_| ContextError::TypeMismatch {
            name: self.name.clone(),
            expected: type_name::<T>(),
            actual: self.type_name,
        })
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("lifecycle_aware", &self.is_lifecycle_aware())
            .field("health_reporter", &self.is_health_reporter())
            .finish()
    }
}
