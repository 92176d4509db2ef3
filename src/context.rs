//! # Application Context
//!
//! [`AppContext`] owns the registry, the context state machine and the control channel of
//! one run. It is single-shot:
//!
//! ```text
//! register* ──► start ──► (running) ──► stop ──► discard
//! NotInitialized  Initializing  Initialized    Used
//! ```
//!
//! ## Locking
//!
//! One reader/writer lock guards the registry. `register`, `start` and `stop` hold the write
//! guard for their whole duration; `get_service`, `stats` and `health` take the read guard.
//! [`AppContext::state`] reads a lock-free copy and never waits.
//!
//! Services receive the context through `Provider::context()` during `init`, but must not
//! call its locking methods before `start` has returned: `start` still holds the write guard.

use crate::error::ContextError;
use crate::event::{ContextEvent, EventSender};
use crate::health::ContextHealth;
use crate::lifecycle;
use crate::provider::initialize;
use crate::registry::{Registry, CTX_NAME};
use crate::runtime::ContextConfig;
use crate::service::{Service, ServiceHandle};
use crate::state::{ContextState, ContextStateView, StateCell};
use crate::stats::ContextStats;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

/// Cloneable handle to one application context.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    registry: RwLock<Registry>,
    state: StateCell,
    events: EventSender,
    /// Taken by the single supervisor loop of this context.
    event_rx: Mutex<Option<mpsc::Receiver<ContextEvent>>>,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(&ContextConfig::default())
    }
}

impl AppContext {
    pub fn new(config: &ContextConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.event_capacity());
        Self {
            inner: Arc::new(ContextInner {
                registry: RwLock::new(Registry::default()),
                state: StateCell::new(ContextState::NotInitialized),
                events: EventSender::new(tx),
                event_rx: Mutex::new(Some(rx)),
            }),
        }
    }

    /// Adds a service. Only allowed before `start`.
    pub async fn register(&self, handle: ServiceHandle) -> Result<(), ContextError> {
        let mut registry = self.inner.registry.write().await;
        self.expect_state(ContextState::NotInitialized)?;
        registry.insert(handle)
    }

    pub async fn register_service<S: Service>(&self, service: S) -> Result<(), ContextError> {
        self.register(ServiceHandle::new(service)).await
    }

    /// Initializes every registered service, then notifies the lifecycle-aware ones.
    ///
    /// Startup is all-or-nothing: if any service fails to initialize, every service that
    /// already reached `Initialized` is disposed, the context becomes `Used` and the
    /// failure is returned.
    pub async fn start(&self) -> Result<(), ContextError> {
        let mut registry = self.inner.registry.write().await;
        self.expect_state(ContextState::NotInitialized)?;
        self.inner.state.set(ContextState::Initializing);

        info!(services = registry.len(), "=== starting... ===");

        // Registry order is arbitrary; recursion makes the result independent of it.
        for name in registry.names() {
            if registry.state_of(&name) != Some(ContextState::NotInitialized) {
                continue;
            }
            if let Err(err) = initialize(&mut registry, self, name.clone()).await {
                error!(
                    service = %name,
                    error = %err,
                    cause = %err.root_cause(),
                    "on initialization"
                );
                for disposed in lifecycle::dispose_all(registry.initialized()).await {
                    registry.mark_used(&disposed);
                }
                self.inner.state.set(ContextState::Used);
                error!("can't start context, see log above");
                return Err(err);
            }
        }

        info!("=== all services have been initialized ===");

        lifecycle::notify_after_start(registry.initialized()).await;

        self.inner.state.set(ContextState::Initialized);
        info!("=== ...started ===");
        Ok(())
    }

    /// Notifies lifecycle-aware services in reverse initialization order, then disposes
    /// every service concurrently. A no-op unless the context is `Initialized`.
    pub async fn stop(&self) {
        let mut registry = self.inner.registry.write().await;
        let state = self.inner.state.get();
        if state != ContextState::Initialized {
            debug!(%state, "stop ignored");
            return;
        }

        info!("=== stopping... ===");

        let order: Vec<ServiceHandle> = registry
            .init_order()
            .iter()
            .filter_map(|name| registry.get(name).cloned())
            .collect();
        lifecycle::notify_before_stop(order).await;

        self.inner.state.set(ContextState::Used);

        for disposed in lifecycle::dispose_all(registry.initialized()).await {
            registry.mark_used(&disposed);
        }
        registry.clear();

        info!("=== ...stopped ===");
    }

    /// Looks up a running service by name.
    pub async fn get_service(&self, name: &str) -> Result<ServiceHandle, ContextError> {
        let registry = self.inner.registry.read().await;
        self.expect_state(ContextState::Initialized)?;
        registry.get(name).cloned().ok_or_else(|| ContextError::ServiceNotFound {
            requested_by: CTX_NAME.to_string(),
            name: name.to_string(),
        })
    }

    /// Looks up a running service and downcasts it to its concrete type.
    pub async fn get<T: Service>(&self, name: &str) -> Result<Arc<T>, ContextError> {
        self.get_service(name).await?.downcast::<T>()
    }

    /// Descriptors of every initialized service.
    pub async fn stats(&self) -> Result<ContextStats, ContextError> {
        let registry = self.inner.registry.read().await;
        self.expect_state(ContextState::Initialized)?;
        Ok(registry.stats().clone())
    }

    /// Health reporters of the running context; call [`ContextHealth::aggregate`] on it.
    pub async fn health(&self) -> Result<ContextHealth, ContextError> {
        let registry = self.inner.registry.read().await;
        self.expect_state(ContextState::Initialized)?;
        Ok(registry.health().clone())
    }

    pub fn state(&self) -> ContextStateView {
        self.inner.state.get().view()
    }

    pub fn current_state(&self) -> ContextState {
        self.inner.state.get()
    }

    /// State of a single registered service, `None` if the name is unknown or the
    /// registry has been cleared by `stop`.
    pub async fn service_state(&self, name: &str) -> Option<ContextState> {
        self.inner.registry.read().await.state_of(name)
    }

    /// Names in the order their initialization completed.
    pub async fn initialization_order(&self) -> Vec<String> {
        self.inner.registry.read().await.init_order().to_vec()
    }

    /// Producer side of this context's control channel.
    pub fn events(&self) -> EventSender {
        self.inner.events.clone()
    }

    /// Hands the control channel to the supervisor. Returns `None` after the first call.
    pub(crate) fn take_event_receiver(&self) -> Option<mpsc::Receiver<ContextEvent>> {
        self.inner
            .event_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    fn expect_state(&self, expected: ContextState) -> Result<(), ContextError> {
        let actual = self.inner.state.get();
        if actual != expected {
            return Err(ContextError::wrong_state(expected, actual));
        }
        Ok(())
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("state", &self.current_state())
            .finish_non_exhaustive()
    }
}
