//! The single consumer of a context's control channel.

use super::os_signals::wait_for_shutdown_signal;
use crate::context::AppContext;
use crate::error::ContextError;
use crate::event::ContextEvent;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Processes control events until the context is stopped.
///
/// - `StopRequested` or a shutdown signal: stop, return `Ok`.
/// - `SuppressedFailure`: log, keep running.
/// - `UnhandledFailure`: stop, return the failure.
pub(crate) async fn run(
    context: AppContext,
    mut events: mpsc::Receiver<ContextEvent>,
    handle_signals: bool,
) -> Result<(), ContextError> {
    let signal = wait_for_shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ContextEvent::StopRequested) => {
                    info!("stop requested");
                    context.stop().await;
                    return Ok(());
                }
                Some(ContextEvent::SuppressedFailure { reason, trace }) => {
                    error!(reason = %reason, trace = %trace, "suppressed failure");
                }
                Some(ContextEvent::UnhandledFailure { reason, trace }) => {
                    error!(reason = %reason, trace = %trace, "unhandled failure, stopping context");
                    context.stop().await;
                    return Err(ContextError::UnhandledFailure { reason, trace });
                }
                None => {
                    warn!("control channel closed");
                    context.stop().await;
                    return Ok(());
                }
            },
            received = &mut signal, if handle_signals => {
                stop_on_signal(&context, received).await?;
                return Ok(());
            }
        }
    }
}

async fn stop_on_signal(
    context: &AppContext,
    received: std::io::Result<&'static str>,
) -> Result<(), ContextError> {
    match &received {
        Ok(name) => info!(signal = %name, "shutdown signal received"),
        Err(e) => error!(error = %e, "can't listen for shutdown signals, stopping context"),
    }
    context.stop().await;
    received.map(|_| ()).map_err(ContextError::from)
}
