//! # Lifecycle Orchestration
//!
//! Fans lifecycle notifications out to the services of one context:
//!
//! - **after start**: one tokio task per lifecycle-aware service, all joined before returning.
//!   No ordering between siblings.
//! - **before stop**: strictly sequential, in the exact reverse of the initialization order,
//!   so a service is told to stop only after everything depending on it has been told.
//! - **dispose**: one task per initialized service, joined. Unordered.
//!
//! Every notification runs behind its own recovery boundary. An `Err` or a panic from one
//! service is logged at `error` and never stops the others.

use crate::error::BoxError;
use crate::event::panic_reason;
use crate::service::ServiceHandle;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

/// Calls `after_start` concurrently on every lifecycle-aware service in `services`.
pub(crate) async fn notify_after_start(services: Vec<ServiceHandle>) {
    let mut tasks = Vec::new();
    for handle in services {
        let Some(lifecycle) = handle.lifecycle().cloned() else {
            continue;
        };
        let name = handle.name().to_string();
        debug!(service = %name, "service is lifecycle-aware, notify it for start event");
        tasks.push((name, tokio::spawn(async move { lifecycle.after_start().await })));
    }

    if tasks.is_empty() {
        return;
    }
    for (name, task) in tasks {
        contain(&name, "after_start", task.await);
    }
    info!("=== all lifecycle-aware services handled after start event ===");
}

/// Calls `before_stop` on lifecycle-aware services, one at a time, in `order` reversed.
///
/// `order` is the initialization order.
pub(crate) async fn notify_before_stop(order: Vec<ServiceHandle>) {
    let mut notified = false;
    for handle in order.into_iter().rev() {
        let Some(lifecycle) = handle.lifecycle().cloned() else {
            continue;
        };
        notified = true;
        debug!(service = %handle.name(), "service is lifecycle-aware, notify it for stop event");
        let outcome = tokio::spawn(async move { lifecycle.before_stop().await }).await;
        contain(handle.name(), "before_stop", outcome);
    }

    if notified {
        info!("=== all lifecycle-aware services handled before stop event ===");
    }
}

/// Disposes `services` concurrently and returns the names that disposed cleanly.
pub(crate) async fn dispose_all(services: Vec<ServiceHandle>) -> Vec<String> {
    let tasks: Vec<(String, JoinHandle<Result<(), BoxError>>)> = services
        .into_iter()
        .map(|handle| {
            let name = handle.name().to_string();
            debug!(service = %name, "dispose service");
            (name, tokio::spawn(async move { handle.service().dispose().await }))
        })
        .collect();

    let mut disposed = Vec::with_capacity(tasks.len());
    for (name, task) in tasks {
        if contain(&name, "dispose", task.await) {
            disposed.push(name);
        }
    }
    disposed
}

/// Logs a failed or panicked hook. Returns `true` if the hook succeeded.
fn contain(service: &str, hook: &str, outcome: Result<Result<(), BoxError>, JoinError>) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(service, hook, error = %e, "lifecycle hook failed");
            false
        }
        Err(join_error) if join_error.is_panic() => {
            let reason = panic_reason(join_error.into_panic());
            error!(service, hook, reason = %reason, "lifecycle hook panicked");
            false
        }
        Err(join_error) => {
            error!(service, hook, error = %join_error, "lifecycle hook was cancelled");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use crate::service::{LifecycleAware, Service};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        faulty: bool,
    }

    #[async_trait]
    impl Service for Probe {
        fn name(&self) -> &str {
            self.name
        }

        async fn init(&self, _provider: &mut Provider<'_>) -> Result<(), BoxError> {
            Ok(())
        }

        async fn dispose(&self) -> Result<(), BoxError> {
            if self.faulty {
                return Err("dispose failed".into());
            }
            Ok(())
        }

        fn as_lifecycle_aware(self: Arc<Self>) -> Option<Arc<dyn LifecycleAware>> {
            Some(self)
        }
    }

    #[async_trait]
    impl LifecycleAware for Probe {
        async fn before_stop(&self) -> Result<(), BoxError> {
            if self.faulty {
                panic!("{} refuses to stop", self.name);
            }
            self.log.lock().unwrap().push(self.name.to_string());
            Ok(())
        }
    }

    fn stub(name: &'static str, log: &Arc<Mutex<Vec<String>>>, faulty: bool) -> ServiceHandle {
        ServiceHandle::new(Probe {
            name,
            log: log.clone(),
            faulty,
        })
    }

    #[tokio::test]
    async fn before_stop_runs_in_reverse_and_survives_a_panic() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let order = vec![
            stub("a", &log, false),
            stub("b", &log, true),
            stub("c", &log, false),
        ];

        notify_before_stop(order).await;

        assert_eq!(*log.lock().unwrap(), vec!["c".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn dispose_reports_only_clean_disposals() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut disposed = dispose_all(vec![stub("a", &log, false), stub("b", &log, true)]).await;
        disposed.sort();
        assert_eq!(disposed, vec!["a".to_string()]);
    }
}
