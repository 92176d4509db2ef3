//! # Context Errors
//!
//! Every fatal condition of the context surfaces as a [`ContextError`] returned from
//! `register`, `start` or [`Application::join`](crate::Application::join). Configuration
//! defects are never retried; the binary entry point logs them and exits non-zero.
//!
//! Failures that are contained per service (`after_start`, `before_stop`, `dispose`) are
//! only logged and never become a `ContextError`.

use crate::state::ContextState;

/// Error type produced by component code (`init`, lifecycle hooks, `dispose`).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur within the application context itself.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("wrong state: current ({actual}), expected ({expected})")]
    WrongState {
        expected: ContextState,
        actual: ContextState,
    },
    #[error("service name duplication: [{0}]")]
    DuplicateName(String),
    #[error("service can't have reserved name: [{0}]")]
    ReservedName(String),
    #[error("service [{name}] not found, requested by [{requested_by}]")]
    ServiceNotFound { requested_by: String, name: String },
    #[error("cyclic dependency between [{from}] and [{to}]")]
    CyclicDependency { from: String, to: String },
    #[error("service [{name}] is {actual}, not {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("on initialization [{service}]: {source}")]
    InitFailed {
        service: String,
        #[source]
        source: BoxError,
    },
    #[error("unhandled failure: {reason}")]
    UnhandledFailure { reason: String, trace: String },
    #[error("failed to install OS signal handlers: {0}")]
    SignalHandler(#[from] std::io::Error),
    #[error("event channel closed, no supervisor is running")]
    EventChannelClosed,
}

impl ContextError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ContextError::WrongState { .. } => "ctx_wrong_state",
            ContextError::DuplicateName(_) => "ctx_duplicate_name",
            ContextError::ReservedName(_) => "ctx_reserved_name",
            ContextError::ServiceNotFound { .. } => "ctx_service_not_found",
            ContextError::CyclicDependency { .. } => "ctx_cyclic_dependency",
            ContextError::TypeMismatch { .. } => "ctx_type_mismatch",
            ContextError::InitFailed { .. } => "ctx_init_failed",
            ContextError::UnhandledFailure { .. } => "ctx_unhandled_failure",
            ContextError::SignalHandler(_) => "ctx_signal_handler",
            ContextError::EventChannelClosed => "ctx_event_channel_closed",
        }
    }

    /// Walks `InitFailed` wrappers down to the resolver error that caused them, if any.
    ///
    /// A cycle or a missing dependency detected deep inside a recursive initialization
    /// reaches `start()` wrapped once per component on the path.
    pub fn root_cause(&self) -> &ContextError {
        let mut current = self;
        while let ContextError::InitFailed { source, .. } = current {
            match source.downcast_ref::<ContextError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Rebuilds the error so it can be latched and reported twice. A foreign source of
    /// `InitFailed` is kept as its message; nested context errors keep their variant.
    pub(crate) fn duplicate(&self) -> ContextError {
        match self {
            ContextError::WrongState { expected, actual } => ContextError::WrongState {
                expected: *expected,
                actual: *actual,
            },
            ContextError::DuplicateName(name) => ContextError::DuplicateName(name.clone()),
            ContextError::ReservedName(name) => ContextError::ReservedName(name.clone()),
            ContextError::ServiceNotFound { requested_by, name } => ContextError::ServiceNotFound {
                requested_by: requested_by.clone(),
                name: name.clone(),
            },
            ContextError::CyclicDependency { from, to } => ContextError::CyclicDependency {
                from: from.clone(),
                to: to.clone(),
            },
            ContextError::TypeMismatch {
                name,
                expected,
                actual,
            } => ContextError::TypeMismatch {
                name: name.clone(),
                expected: *expected,
                actual: *actual,
            },
            ContextError::InitFailed { service, source } => ContextError::InitFailed {
                service: service.clone(),
                source: match source.downcast_ref::<ContextError>() {
                    Some(inner) => Box::new(inner.duplicate()) as BoxError,
                    None => source.to_string().into(),
                },
            },
            ContextError::UnhandledFailure { reason, trace } => ContextError::UnhandledFailure {
                reason: reason.clone(),
                trace: trace.clone(),
            },
            ContextError::SignalHandler(e) => {
                ContextError::SignalHandler(std::io::Error::new(e.kind(), e.to_string()))
            }
            ContextError::EventChannelClosed => ContextError::EventChannelClosed,
        }
    }

    pub(crate) fn wrong_state(expected: ContextState, actual: ContextState) -> Self {
        ContextError::WrongState { expected, actual }
    }
}
