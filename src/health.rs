//! # Health Aggregation
//!
//! Each service that declares the [`HealthReporter`] role is registered with the context's
//! [`ContextHealth`] when it finishes initializing. [`ContextHealth::aggregate`] polls every
//! reporter at call time and rolls the results up into one report:
//!
//! | children                     | parent      |
//! |------------------------------|-------------|
//! | all `Up` (or none)           | `Up`        |
//! | any `Partially` or `Down`    | `Partially` |
//! | any `DownCritical`           | `Down`      |
//!
//! There is no caching: every call is a fresh snapshot.

use crate::service::HealthReporter;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Up,
    Partially,
    DownCritical,
    Down,
}

impl HealthStatus {
    /// Severity of the status as it affects a parent report.
    fn rollup_rank(self) -> u8 {
        match self {
            HealthStatus::Up => 0,
            HealthStatus::Partially | HealthStatus::Down => 1,
            HealthStatus::DownCritical => 2,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Up => "UP",
            HealthStatus::Partially => "PARTIALLY",
            HealthStatus::DownCritical => "DOWN_CRITICAL",
            HealthStatus::Down => "DOWN",
        })
    }
}

/// Self-reported health of a service, or the rollup of several.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, HealthReport>,
}

impl HealthReport {
    pub fn status(status: HealthStatus) -> Self {
        Self {
            status,
            details: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }

    pub fn up() -> Self {
        Self::status(HealthStatus::Up)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Adds a named sub-component report, for services that wrap others.
    pub fn with_component(mut self, name: impl Into<String>, report: HealthReport) -> Self {
        self.components.insert(name.into(), report);
        self
    }

    /// Builds a parent report whose status is the worst-case rollup of `components`.
    pub fn rollup(components: BTreeMap<String, HealthReport>) -> Self {
        let status = rollup_status(components.values().map(|report| report.status));
        Self {
            status,
            details: BTreeMap::new(),
            components,
        }
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "health: {} details: {:?} components: {:?}",
            self.status,
            self.details,
            self.components.keys().collect::<Vec<_>>()
        )
    }
}

/// Parent status for a set of child statuses.
pub fn rollup_status(children: impl IntoIterator<Item = HealthStatus>) -> HealthStatus {
    match children.into_iter().map(HealthStatus::rollup_rank).max() {
        None | Some(0) => HealthStatus::Up,
        Some(1) => HealthStatus::Partially,
        Some(_) => HealthStatus::Down,
    }
}

/// Read-only view over the health reporters of one context.
#[derive(Clone, Default)]
pub struct ContextHealth {
    reporters: BTreeMap<String, Arc<dyn HealthReporter>>,
}

impl ContextHealth {
    pub(crate) fn register(&mut self, name: &str, reporter: Arc<dyn HealthReporter>) {
        self.reporters.insert(name.to_string(), reporter);
    }

    pub(crate) fn clear(&mut self) {
        self.reporters.clear();
    }

    /// Names of the services reporting health.
    pub fn reporters(&self) -> impl Iterator<Item = &str> {
        self.reporters.keys().map(String::as_str)
    }

    /// Polls every reporter and computes the worst-case rollup.
    ///
    /// With no reporters the result is `Up` with no components listed.
    pub async fn aggregate(&self) -> HealthReport {
        let mut components = BTreeMap::new();
        for (name, reporter) in &self.reporters {
            components.insert(name.clone(), reporter.health().await);
        }
        HealthReport::rollup(components)
    }
}

impl fmt::Debug for ContextHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.reporters.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(HealthStatus);

    #[async_trait]
    impl HealthReporter for Fixed {
        async fn health(&self) -> HealthReport {
            HealthReport::status(self.0)
        }
    }

    fn health_of(statuses: &[HealthStatus]) -> ContextHealth {
        let mut health = ContextHealth::default();
        for (i, status) in statuses.iter().enumerate() {
            health.register(&format!("svc_{i}"), Arc::new(Fixed(*status)));
        }
        health
    }

    #[tokio::test]
    async fn critical_child_takes_the_aggregate_down() {
        let health = health_of(&[
            HealthStatus::Up,
            HealthStatus::Partially,
            HealthStatus::DownCritical,
        ]);
        let report = health.aggregate().await;
        assert_eq!(report.status, HealthStatus::Down);
        assert_eq!(report.components.len(), 3);
    }

    #[tokio::test]
    async fn all_up_is_up() {
        let report = health_of(&[HealthStatus::Up, HealthStatus::Up]).aggregate().await;
        assert_eq!(report.status, HealthStatus::Up);
    }

    #[tokio::test]
    async fn no_reporters_is_up_without_components() {
        let report = ContextHealth::default().aggregate().await;
        assert_eq!(report.status, HealthStatus::Up);
        assert!(report.components.is_empty());
    }

    #[test]
    fn down_child_only_degrades_to_partially() {
        assert_eq!(rollup_status([HealthStatus::Up, HealthStatus::Down]), HealthStatus::Partially);
        assert_eq!(rollup_status([HealthStatus::Partially]), HealthStatus::Partially);
    }

    #[test]
    fn critical_wins_regardless_of_order() {
        assert_eq!(
            rollup_status([HealthStatus::DownCritical, HealthStatus::Partially, HealthStatus::Up]),
            HealthStatus::Down
        );
    }

    #[test]
    fn report_serializes_with_operational_status_names() {
        let report = HealthReport::rollup(BTreeMap::from([(
            "db".to_string(),
            HealthReport::status(HealthStatus::DownCritical).with_detail("pool", 0),
        )]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "DOWN");
        assert_eq!(json["components"]["db"]["status"], "DOWN_CRITICAL");
        assert_eq!(json["components"]["db"]["details"]["pool"], 0);
        assert!(json["components"]["db"].get("components").is_none());
    }
}
