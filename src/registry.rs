//! # Service Registry
//!
//! Owns every registered [`ServiceHandle`], the per-service state map, the initialization
//! order and the metadata collected during initialization. The registry itself is not
//! synchronized; [`AppContext`](crate::AppContext) keeps it behind one reader/writer lock.

use crate::error::ContextError;
use crate::health::ContextHealth;
use crate::service::ServiceHandle;
use crate::state::ContextState;
use crate::stats::{ContextStats, ServiceDescriptor};
use std::collections::HashMap;
use tracing::debug;

/// Name reserved for the context's own facade.
pub const CTX_NAME: &str = "CTX";

#[derive(Debug, Default)]
pub(crate) struct Registry {
    services: HashMap<String, ServiceHandle>,
    states: HashMap<String, ContextState>,
    /// Append-only; a name is pushed once its `init` has completed.
    init_order: Vec<String>,
    stats: ContextStats,
    health: ContextHealth,
    /// First failure of the current startup: a resolution error or a failed `init`.
    failure: Option<ContextError>,
}

impl Registry {
    pub(crate) fn insert(&mut self, handle: ServiceHandle) -> Result<(), ContextError> {
        let name = handle.name().to_string();
        if name == CTX_NAME {
            return Err(ContextError::ReservedName(name));
        }
        if self.services.contains_key(&name) {
            return Err(ContextError::DuplicateName(name));
        }
        debug!(service = %name, type_name = handle.type_name(), "registered service");
        self.states.insert(name.clone(), ContextState::NotInitialized);
        self.services.insert(name, handle);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ServiceHandle> {
        self.services.get(name)
    }

    pub(crate) fn state_of(&self, name: &str) -> Option<ContextState> {
        self.states.get(name).copied()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.services.len()
    }

    pub(crate) fn mark_initializing(&mut self, name: &str) {
        self.states.insert(name.to_string(), ContextState::Initializing);
    }

    /// Completes a service's initialization: state, order, stats and health registration.
    pub(crate) fn mark_initialized(&mut self, descriptor: ServiceDescriptor) {
        let name = descriptor.name.clone();
        if let Some(reporter) = self.services.get(&name).and_then(|h| h.health_reporter()) {
            self.health.register(&name, reporter.clone());
        }
        self.states.insert(name.clone(), ContextState::Initialized);
        self.init_order.push(name);
        self.stats.record(descriptor);
    }

    pub(crate) fn mark_used(&mut self, name: &str) {
        self.states.insert(name.to_string(), ContextState::Used);
    }

    pub(crate) fn init_order(&self) -> &[String] {
        &self.init_order
    }

    /// Handles of every service currently in `Initialized`.
    pub(crate) fn initialized(&self) -> Vec<ServiceHandle> {
        self.services
            .iter()
            .filter(|(name, _)| self.state_of(name) == Some(ContextState::Initialized))
            .map(|(_, handle)| handle.clone())
            .collect()
    }

    pub(crate) fn stats(&self) -> &ContextStats {
        &self.stats
    }

    pub(crate) fn health(&self) -> &ContextHealth {
        &self.health
    }

    /// Records `err` as the startup failure (first one wins) and returns it.
    pub(crate) fn latch(&mut self, err: ContextError) -> ContextError {
        if self.failure.is_none() {
            self.failure = Some(err.duplicate());
        }
        err
    }

    pub(crate) fn latched_failure(&self) -> Option<ContextError> {
        self.failure.as_ref().map(ContextError::duplicate)
    }

    /// Drops every service; the registry is unusable afterwards.
    pub(crate) fn clear(&mut self) {
        self.services.clear();
        self.states.clear();
        self.health.clear();
        self.failure = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::provider::Provider;
    use crate::service::Service;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Service for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn init(&self, _provider: &mut Provider<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn rejects_duplicate_and_reserved_names() {
        let mut registry = Registry::default();
        registry.insert(ServiceHandle::new(Named("a"))).unwrap();

        let dup = registry.insert(ServiceHandle::new(Named("a"))).unwrap_err();
        assert!(matches!(dup, ContextError::DuplicateName(ref n) if n == "a"));

        let reserved = registry.insert(ServiceHandle::new(Named(CTX_NAME))).unwrap_err();
        assert!(matches!(reserved, ContextError::ReservedName(_)));

        let renamed = ServiceHandle::new(Named("b")).with_name(CTX_NAME);
        assert!(matches!(registry.insert(renamed), Err(ContextError::ReservedName(_))));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state_of("a"), Some(ContextState::NotInitialized));
    }

    #[test]
    fn latch_keeps_the_first_failure() {
        let mut registry = Registry::default();
        registry.latch(ContextError::CyclicDependency {
            from: "b".into(),
            to: "a".into(),
        });
        registry.latch(ContextError::ServiceNotFound {
            requested_by: "c".into(),
            name: "d".into(),
        });

        let latched = registry.latched_failure().unwrap();
        assert_eq!(latched.as_label(), "ctx_cyclic_dependency");
    }

    #[test]
    fn init_order_only_grows_on_completion() {
        let mut registry = Registry::default();
        registry.insert(ServiceHandle::new(Named("a"))).unwrap();
        registry.mark_initializing("a");
        assert!(registry.init_order().is_empty());
        assert!(registry.initialized().is_empty());

        registry.mark_initialized(ServiceDescriptor::new("a", "Named", false));
        assert_eq!(registry.init_order(), ["a".to_string()]);
        assert_eq!(registry.initialized().len(), 1);
        assert!(registry.stats().service("a").is_some());
    }
}
