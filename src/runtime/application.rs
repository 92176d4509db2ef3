use super::{supervisor, try_setup_tracing_with, ContextConfig, ServicePackage};
use crate::context::AppContext;
use crate::error::ContextError;
use crate::event::{panic_reason, EventSender};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A started context together with its supervisor loop.
///
/// ```ignore
/// let app = Application::start(ContextConfig::from_env(), [package]).await?;
/// // ... until a signal, a stop request or an unhandled failure
/// app.join().await?;
/// ```
#[derive(Debug)]
pub struct Application {
    context: AppContext,
    events: EventSender,
    supervisor: JoinHandle<Result<(), ContextError>>,
}

impl Application {
    /// Registers every package's services in a fresh context and starts it.
    ///
    /// Returns once all services are initialized and every lifecycle-aware service has
    /// handled `after_start`.
    pub async fn start(
        config: ContextConfig,
        packages: impl IntoIterator<Item = ServicePackage>,
    ) -> Result<Self, ContextError> {
        let context = AppContext::new(&config);
        let package = packages.into_iter().fold(ServicePackage::new(), ServicePackage::merge);
        for handle in package.into_handles() {
            context.register(handle).await?;
        }

        let events = context.take_event_receiver().ok_or(ContextError::EventChannelClosed)?;
        // Running before `start` so events published from `after_start` never back up.
        let supervisor = tokio::spawn(supervisor::run(
            context.clone(),
            events,
            config.handle_os_signals(),
        ));

        if let Err(e) = context.start().await {
            supervisor.abort();
            return Err(e);
        }

        Ok(Self {
            events: context.events(),
            context,
            supervisor,
        })
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Asks the supervisor to stop the context. Idempotent.
    pub async fn stop(&self) {
        if self.events.request_stop().await.is_err() {
            debug!("stop ignored, supervisor already finished");
        }
    }

    /// Waits for the run to end. `Err` if it ended because of an unhandled failure.
    pub async fn join(self) -> Result<(), ContextError> {
        match self.supervisor.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    panic_reason(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                error!(reason = %reason, "supervisor terminated abnormally");
                self.context.stop().await;
                Err(ContextError::UnhandledFailure {
                    reason,
                    trace: String::new(),
                })
            }
        }
    }
}

/// Starts the application and blocks until it is stopped by a signal, a stop request or
/// an unhandled failure.
pub async fn run_application(
    config: ContextConfig,
    packages: impl IntoIterator<Item = ServicePackage>,
) -> Result<(), ContextError> {
    try_setup_tracing_with(&config);
    Application::start(config, packages).await?.join().await
}
