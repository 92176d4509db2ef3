//! # Control Events
//!
//! Background work cannot touch the context's state directly. Instead it reports to the
//! context's single control channel, consumed by the supervisor loop that
//! [`Application`](crate::Application) runs:
//!
//! ```text
//! Publishers (many):                    Consumer (one per context):
//!   spawned task ──┐
//!   service hook ──┼── EventSender ──► mpsc ──► supervisor loop ──► stop / log
//!   Application  ──┘
//! ```
//!
//! - [`ContextEvent::UnhandledFailure`] stops the context and ends the run with an error.
//! - [`ContextEvent::SuppressedFailure`] is logged; the context keeps running.
//! - [`ContextEvent::StopRequested`] stops the context and ends the run cleanly.

use crate::error::ContextError;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// A failure that escaped every containment boundary.
    UnhandledFailure { reason: String, trace: String },
    /// A failure that was contained but is still worth surfacing.
    SuppressedFailure { reason: String, trace: String },
    StopRequested,
}

impl ContextEvent {
    pub fn unhandled(reason: impl Display) -> Self {
        ContextEvent::UnhandledFailure {
            reason: reason.to_string(),
            trace: capture_trace(),
        }
    }

    pub fn suppressed(reason: impl Display) -> Self {
        ContextEvent::SuppressedFailure {
            reason: reason.to_string(),
            trace: capture_trace(),
        }
    }
}

/// Cloneable producer side of a context's control channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ContextEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<ContextEvent>) -> Self {
        Self { tx }
    }

    /// Delivers `event` to the supervisor, waiting if the channel is full.
    pub async fn send(&self, event: ContextEvent) -> Result<(), ContextError> {
        self.tx.send(event).await.map_err(|_| ContextError::EventChannelClosed)
    }

    pub async fn request_stop(&self) -> Result<(), ContextError> {
        self.send(ContextEvent::StopRequested).await
    }

    /// Runs `work` on a new task. An `Err` or a panic escalates to a full shutdown.
    pub fn spawn<F, E>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.supervise(work, |reason| ContextEvent::unhandled(reason), || {})
    }

    /// Runs `work` on a new task. An `Err` or a panic is logged by the supervisor only.
    pub fn spawn_contained<F, E>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.supervise(work, |reason| ContextEvent::suppressed(reason), || {})
    }

    /// Like [`spawn`](Self::spawn), but `finally` always runs once `work` ends, before
    /// any failure is reported.
    pub fn spawn_finally<F, E, C>(&self, work: F, finally: C) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.supervise(work, |reason| ContextEvent::unhandled(reason), finally)
    }

    fn supervise<F, E, C>(
        &self,
        work: F,
        on_failure: fn(String) -> ContextEvent,
        finally: C,
    ) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let events = self.clone();
        tokio::spawn(async move {
            let outcome = tokio::spawn(work).await;
            finally();
            let reason = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(join_error) if join_error.is_panic() => panic_reason(join_error.into_panic()),
                Err(join_error) => join_error.to_string(),
            };
            if events.send(on_failure(reason)).await.is_err() {
                warn!("failure of a background task was dropped, no supervisor is running");
            }
        })
    }
}

/// Human-readable reason extracted from a panic payload.
pub(crate) fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        return (*reason).to_string();
    }
    if let Some(reason) = payload.downcast_ref::<String>() {
        return reason.clone();
    }
    "panic with a non-string payload".to_string()
}

/// Backtrace of the reporting site; empty unless `RUST_BACKTRACE` enables capture.
fn capture_trace() -> String {
    let trace = Backtrace::capture();
    match trace.status() {
        std::backtrace::BacktraceStatus::Captured => trace.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn channel() -> (EventSender, mpsc::Receiver<ContextEvent>) {
        let (tx, rx) = mpsc::channel(4);
        (EventSender::new(tx), rx)
    }

    #[tokio::test]
    async fn failed_task_escalates_as_unhandled() {
        let (events, mut rx) = channel();
        events.spawn(async { Err::<(), _>("disk full") }).await.unwrap();

        match rx.recv().await {
            Some(ContextEvent::UnhandledFailure { reason, .. }) => assert_eq!(reason, "disk full"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_contained_task_is_suppressed() {
        let (events, mut rx) = channel();
        events
            .spawn_contained(async {
                if true {
                    panic!("worker crashed");
                }
                Ok::<(), String>(())
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(ContextEvent::SuppressedFailure { reason, .. }) => {
                assert_eq!(reason, "worker crashed")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn finally_runs_and_success_sends_nothing() {
        let (events, mut rx) = channel();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        events
            .spawn_finally(async { Ok::<(), String>(()) }, move || {
                flag.store(true, Ordering::SeqCst)
            })
            .await
            .unwrap();

        assert!(ran.load(Ordering::SeqCst));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_fails_once_the_supervisor_is_gone() {
        let (events, rx) = channel();
        drop(rx);
        assert!(matches!(events.request_stop().await, Err(ContextError::EventChannelClosed)));
    }
}
