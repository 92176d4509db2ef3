//! # Dependency Resolution
//!
//! Services do not declare their dependencies up front. Each one receives a [`Provider`]
//! in `init` and asks it for other services by name; the resolver initializes whatever is
//! still missing on demand and records every request as a dependency edge.
//!
//! ```text
//! start()
//!   └─ initialize(b)                b: Initializing
//!        └─ b.init(provider)
//!             └─ provider.get("a")  a: NotInitialized → recurse
//!                  └─ initialize(a) a: Initializing → Initialized, order = [a]
//!        b: Initialized, order = [a, b]
//! ```
//!
//! Requesting a service that is itself still `Initializing` means the graph has a cycle.

use crate::context::AppContext;
use crate::error::{BoxError, ContextError};
use crate::event::panic_reason;
use crate::registry::{Registry, CTX_NAME};
use crate::service::{Service, ServiceHandle};
use crate::state::ContextState;
use crate::stats::ServiceDescriptor;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Result of a lookup by name: either the context facade or a registered service.
#[derive(Debug, Clone)]
pub enum Dependency {
    Context(AppContext),
    Service(ServiceHandle),
}

/// Dependency lookup handed to [`Service::init`].
///
/// A provider is scoped to the service being initialized and only lives for the duration
/// of its `init` call.
pub struct Provider<'a> {
    registry: &'a mut Registry,
    context: &'a AppContext,
    requester: &'a str,
    descriptor: &'a mut ServiceDescriptor,
}

impl Provider<'_> {
    /// Name of the service this provider resolves for.
    pub fn requester(&self) -> &str {
        self.requester
    }

    /// Resolves `name`, initializing it first if needed.
    ///
    /// `"CTX"` resolves to the context itself and is not recorded as a dependency.
    pub async fn by_name(&mut self, name: &str) -> Result<Dependency, ContextError> {
        debug!(service = %self.requester, requested = %name, "requested service");

        if name == CTX_NAME {
            return Ok(Dependency::Context(self.context.clone()));
        }

        self.descriptor.add_dependency(name);

        match self.registry.state_of(name) {
            None => Err(self.registry.latch(ContextError::ServiceNotFound {
                requested_by: self.requester.to_string(),
                name: name.to_string(),
            })),
            Some(ContextState::Initializing) => {
                Err(self.registry.latch(ContextError::CyclicDependency {
                    from: self.requester.to_string(),
                    to: name.to_string(),
                }))
            }
            Some(ContextState::NotInitialized) => {
                initialize(&mut *self.registry, self.context, name.to_string()).await?;
                self.initialized(name)
            }
            Some(ContextState::Initialized) => self.initialized(name),
            Some(actual) => Err(ContextError::wrong_state(ContextState::Initialized, actual)),
        }
    }

    /// Resolves `name` to a registered service; the context facade is not a service.
    pub async fn service(&mut self, name: &str) -> Result<ServiceHandle, ContextError> {
        match self.by_name(name).await? {
            Dependency::Service(handle) => Ok(handle),
            Dependency::Context(_) => Err(self.registry.latch(ContextError::TypeMismatch {
                name: name.to_string(),
                expected: "service",
                actual: std::any::type_name::<AppContext>(),
            })),
        }
    }

    /// Resolves `name` and downcasts it to the concrete service type.
    pub async fn get<T: Service>(&mut self, name: &str) -> Result<Arc<T>, ContextError> {
        let handle = self.service(name).await?;
        handle.downcast::<T>().map_err(|err| self.registry.latch(err))
    }

    /// The context facade, same as `by_name("CTX")`.
    pub fn context(&self) -> AppContext {
        debug!(service = %self.requester, requested = CTX_NAME, "requested service");
        self.context.clone()
    }

    fn initialized(&self, name: &str) -> Result<Dependency, ContextError> {
        self.registry
            .get(name)
            .cloned()
            .map(Dependency::Service)
            .ok_or_else(|| ContextError::ServiceNotFound {
                requested_by: self.requester.to_string(),
                name: name.to_string(),
            })
    }
}

type InitFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ContextError>> + Send + 'a>>;

/// Initializes `name` and, through its provider, everything it requests.
///
/// The service is `Initializing` while its `init` runs and is appended to the
/// initialization order only once `init` has returned successfully. On failure, including
/// a panic inside `init`, it stays `Initializing` and the failure is latched so that no
/// dependent can complete either.
pub(crate) fn initialize<'a>(
    registry: &'a mut Registry,
    context: &'a AppContext,
    name: String,
) -> InitFuture<'a> {
    Box::pin(async move {
        let handle = registry
            .get(&name)
            .cloned()
            .ok_or_else(|| ContextError::ServiceNotFound {
                requested_by: CTX_NAME.to_string(),
                name: name.clone(),
            })?;

        registry.mark_initializing(&name);
        debug!(service = %name, "service initialization started...");

        let mut descriptor =
            ServiceDescriptor::new(&name, handle.type_name(), handle.is_lifecycle_aware());
        let result = {
            let mut provider = Provider {
                registry: &mut *registry,
                context,
                requester: &name,
                descriptor: &mut descriptor,
            };
            AssertUnwindSafe(handle.service().init(&mut provider))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(format!("panicked: {}", panic_reason(payload)).into())
                })
        };

        // A service may swallow a failed lookup; the startup still fails.
        let result: Result<(), BoxError> = match (result, registry.latched_failure()) {
            (Err(source), _) => Err(source),
            (Ok(()), Some(latched)) => Err(Box::new(latched)),
            (Ok(()), None) => Ok(()),
        };
        if let Err(source) = result {
            return Err(registry.latch(ContextError::InitFailed {
                service: name,
                source,
            }));
        }

        registry.mark_initialized(descriptor);
        debug!(service = %name, "...service initialized");
        Ok(())
    })
}
