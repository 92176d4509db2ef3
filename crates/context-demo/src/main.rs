//! # Application Context Demo
//!
//! Four services wired by name:
//!
//! - **a_service**: no dependencies, reports `UP` health.
//! - **b_service**: depends on `a_service`.
//! - **timed_service**: ticks every two seconds between `after_start` and `before_stop`.
//! - **app_lc_service**: depends on `b_service`, calls into it once the application is up.
//!
//! Run with `RUST_LOG=info cargo run -p context-demo` and stop with Ctrl-C. The shutdown log
//! shows `before_stop` running in reverse initialization order.

use app_context::{
    run_application, BoxError, ContextConfig, HealthReport, HealthReporter, LifecycleAware,
    Provider, Service, ServicePackage, TimerTask,
};
use async_trait::async_trait;
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{error, info};

const A_SERVICE: &str = "a_service";
const B_SERVICE: &str = "b_service";
const TIMED_SERVICE: &str = "timed_service";
const APP_LC_SERVICE: &str = "app_lc_service";

struct AService {
    param_a: u32,
}

impl AService {
    fn run(&self) {
        info!(service = A_SERVICE, param_a = self.param_a, "invoked");
    }
}

#[async_trait]
impl Service for AService {
    fn name(&self) -> &str {
        A_SERVICE
    }

    async fn init(&self, _provider: &mut Provider<'_>) -> Result<(), BoxError> {
        info!(service = A_SERVICE, "initialized");
        Ok(())
    }

    async fn dispose(&self) -> Result<(), BoxError> {
        info!(service = A_SERVICE, "disposed");
        Ok(())
    }

    fn as_health_reporter(self: Arc<Self>) -> Option<Arc<dyn HealthReporter>> {
        Some(self)
    }
}

#[async_trait]
impl HealthReporter for AService {
    async fn health(&self) -> HealthReport {
        HealthReport::up().with_detail("param_a", self.param_a)
    }
}

#[derive(Default)]
struct BService {
    a: OnceLock<Arc<AService>>,
}

impl BService {
    fn run(&self) {
        info!(service = B_SERVICE, "invoked");
        if let Some(a) = self.a.get() {
            a.run();
        }
    }
}

#[async_trait]
impl Service for BService {
    fn name(&self) -> &str {
        B_SERVICE
    }

    async fn init(&self, provider: &mut Provider<'_>) -> Result<(), BoxError> {
        let _ = self.a.set(provider.get::<AService>(A_SERVICE).await?);
        info!(service = B_SERVICE, "initialized");
        Ok(())
    }

    async fn dispose(&self) -> Result<(), BoxError> {
        info!(service = B_SERVICE, "disposed");
        Ok(())
    }
}

#[derive(Default)]
struct TimedService {
    timer: TimerTask,
}

#[async_trait]
impl Service for TimedService {
    fn name(&self) -> &str {
        TIMED_SERVICE
    }

    async fn init(&self, _provider: &mut Provider<'_>) -> Result<(), BoxError> {
        info!(service = TIMED_SERVICE, "initialized");
        Ok(())
    }

    async fn dispose(&self) -> Result<(), BoxError> {
        info!(service = TIMED_SERVICE, "disposed");
        Ok(())
    }

    fn as_lifecycle_aware(self: Arc<Self>) -> Option<Arc<dyn LifecycleAware>> {
        Some(self)
    }
}

#[async_trait]
impl LifecycleAware for TimedService {
    async fn after_start(&self) -> Result<(), BoxError> {
        self.timer.start(Duration::from_secs(2), || async {
            info!(service = TIMED_SERVICE, "on timer");
        });
        info!(service = TIMED_SERVICE, "timer started");
        Ok(())
    }

    async fn before_stop(&self) -> Result<(), BoxError> {
        info!(service = TIMED_SERVICE, "before stop");
        self.timer.stop();
        Ok(())
    }
}

#[derive(Default)]
struct AppLcService {
    b: OnceLock<Arc<BService>>,
}

#[async_trait]
impl Service for AppLcService {
    fn name(&self) -> &str {
        APP_LC_SERVICE
    }

    async fn init(&self, provider: &mut Provider<'_>) -> Result<(), BoxError> {
        let _ = self.b.set(provider.get::<BService>(B_SERVICE).await?);
        info!(service = APP_LC_SERVICE, "initialized");
        Ok(())
    }

    async fn dispose(&self) -> Result<(), BoxError> {
        info!(service = APP_LC_SERVICE, "disposed");
        Ok(())
    }

    fn as_lifecycle_aware(self: Arc<Self>) -> Option<Arc<dyn LifecycleAware>> {
        Some(self)
    }
}

#[async_trait]
impl LifecycleAware for AppLcService {
    async fn after_start(&self) -> Result<(), BoxError> {
        info!(service = APP_LC_SERVICE, "app started");
        if let Some(b) = self.b.get() {
            b.run();
        }
        Ok(())
    }

    async fn before_stop(&self) -> Result<(), BoxError> {
        info!(service = APP_LC_SERVICE, "app stopped");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let package = ServicePackage::new()
        .with(AppLcService::default())
        .with(TimedService::default())
        .with(BService::default())
        .with(AService { param_a: 5 });

    let config = ContextConfig::from_env();
    match run_application(config, [package]).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, label = e.as_label(), "application terminated");
            ExitCode::FAILURE
        }
    }
}
