#![allow(dead_code)]

use app_context::{
    BoxError, HealthReport, HealthReporter, HealthStatus, LifecycleAware, Provider, Service,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared log of lifecycle calls, e.g. `"init:a"`, `"before_stop:b"`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    /// Service names recorded for `hook`, in call order.
    pub fn calls(&self, hook: &str) -> Vec<String> {
        let prefix = format!("{hook}:");
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

/// Configurable service that records every call it receives.
pub struct Recorder {
    name: String,
    journal: Journal,
    dependencies: Vec<String>,
    lifecycle: bool,
    health: Option<HealthStatus>,
    swallow_errors: bool,
    fail_init: bool,
    panic_init: bool,
    fail_after_start: bool,
    panic_after_start: bool,
    fail_dispose: bool,
}

impl Recorder {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            dependencies: Vec::new(),
            lifecycle: false,
            health: None,
            swallow_errors: false,
            fail_init: false,
            panic_init: false,
            fail_after_start: false,
            panic_after_start: false,
            fail_dispose: false,
        }
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    pub fn lifecycle(mut self) -> Self {
        self.lifecycle = true;
        self
    }

    pub fn health(mut self, status: HealthStatus) -> Self {
        self.health = Some(status);
        self
    }

    /// Ignores failed lookups instead of returning them from `init`.
    pub fn swallowing_errors(mut self) -> Self {
        self.swallow_errors = true;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Panics in `init` once its dependencies are resolved.
    pub fn panicking_init(mut self) -> Self {
        self.panic_init = true;
        self
    }

    pub fn failing_after_start(mut self) -> Self {
        self.lifecycle = true;
        self.fail_after_start = true;
        self
    }

    /// Records the call, then reports a failure.
    pub fn failing_dispose(mut self) -> Self {
        self.fail_dispose = true;
        self
    }

    pub fn panicking_after_start(mut self) -> Self {
        self.lifecycle = true;
        self.panic_after_start = true;
        self
    }
}

#[async_trait]
impl Service for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, provider: &mut Provider<'_>) -> Result<(), BoxError> {
        for dependency in &self.dependencies {
            let resolved = provider.service(dependency).await;
            if !self.swallow_errors {
                resolved?;
            }
        }
        if self.panic_init {
            panic!("{} blew up", self.name);
        }
        if self.fail_init {
            return Err(format!("{} refuses to start", self.name).into());
        }
        self.journal.record(format!("init:{}", self.name));
        Ok(())
    }

    async fn dispose(&self) -> Result<(), BoxError> {
        self.journal.record(format!("dispose:{}", self.name));
        if self.fail_dispose {
            return Err(format!("{} leaked a handle", self.name).into());
        }
        Ok(())
    }

    fn as_lifecycle_aware(self: Arc<Self>) -> Option<Arc<dyn LifecycleAware>> {
        if self.lifecycle {
            Some(self)
        } else {
            None
        }
    }

    fn as_health_reporter(self: Arc<Self>) -> Option<Arc<dyn HealthReporter>> {
        if self.health.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl LifecycleAware for Recorder {
    async fn after_start(&self) -> Result<(), BoxError> {
        if self.panic_after_start {
            panic!("{} crashed while starting", self.name);
        }
        if self.fail_after_start {
            return Err(format!("{} could not reach its upstream", self.name).into());
        }
        self.journal.record(format!("after_start:{}", self.name));
        Ok(())
    }

    async fn before_stop(&self) -> Result<(), BoxError> {
        self.journal.record(format!("before_stop:{}", self.name));
        Ok(())
    }
}

#[async_trait]
impl HealthReporter for Recorder {
    async fn health(&self) -> HealthReport {
        HealthReport::status(self.health.unwrap_or(HealthStatus::Up))
            .with_detail("service", self.name.clone())
    }
}
