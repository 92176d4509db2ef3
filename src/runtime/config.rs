//! Runtime configuration of a context.

use std::str::FromStr;
use tracing::warn;

const DEFAULT_EVENT_CAPACITY: usize = 16;

pub const ENV_EVENT_CAPACITY: &str = "APP_CTX_EVENT_CAPACITY";
pub const ENV_HANDLE_SIGNALS: &str = "APP_CTX_HANDLE_SIGNALS";
pub const ENV_LOG_FILTER: &str = "APP_CTX_LOG_FILTER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    event_capacity: usize,
    handle_os_signals: bool,
    log_filter: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            handle_os_signals: true,
            log_filter: None,
        }
    }
}

impl ContextConfig {
    /// Reads overrides from the process environment. Absent or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(capacity) = parse_var::<usize>(&lookup, ENV_EVENT_CAPACITY) {
            config = config.with_event_capacity(capacity);
        }
        if let Some(handle) = parse_var::<bool>(&lookup, ENV_HANDLE_SIGNALS) {
            config = config.with_os_signals(handle);
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER).filter(|f| !f.trim().is_empty()) {
            config = config.with_log_filter(filter);
        }
        config
    }

    /// Buffer size of the control channel, at least 1.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_os_signals(mut self, handle: bool) -> Self {
        self.handle_os_signals = handle;
        self
    }

    /// Default directive used when `RUST_LOG` is not set, e.g. `"info,app_context=debug"`.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    pub fn handle_os_signals(&self) -> bool {
        self.handle_os_signals
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.log_filter.as_deref()
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
