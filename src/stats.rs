//! Structural metadata collected while services initialize.

use serde::Serialize;
use std::collections::BTreeMap;

/// Read-only description of one initialized service.
///
/// `dependencies` lists every distinct name the service requested from its provider during
/// `init`, in order of first request. Edges are discovered, not declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub is_lifecycle_aware: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ServiceDescriptor {
    pub(crate) fn new(name: &str, type_name: &'static str, is_lifecycle_aware: bool) -> Self {
        Self {
            name: name.to_string(),
            type_name,
            is_lifecycle_aware,
            dependencies: Vec::new(),
        }
    }

    /// Records a requested name once, keeping the order of first request.
    pub(crate) fn add_dependency(&mut self, name: &str) {
        if !self.dependencies.iter().any(|known| known == name) {
            self.dependencies.push(name.to_string());
        }
    }
}

/// Snapshot of every initialized service's descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    services: BTreeMap<String, ServiceDescriptor>,
}

impl ContextStats {
    pub(crate) fn record(&mut self, descriptor: ServiceDescriptor) {
        self.services.insert(descriptor.name.clone(), descriptor);
    }

    pub fn services(&self) -> &BTreeMap<String, ServiceDescriptor> {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_serializes_like_the_services_endpoint() {
        let mut descriptor = ServiceDescriptor::new("b_service", "demo::BService", false);
        descriptor.add_dependency("a_service");

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], "b_service");
        assert_eq!(json["type"], "demo::BService");
        assert_eq!(json["isLifecycleAware"], false);
        assert_eq!(json["dependencies"][0], "a_service");

        let leaf = ServiceDescriptor::new("a_service", "demo::AService", true);
        assert!(serde_json::to_value(&leaf).unwrap().get("dependencies").is_none());
    }

    #[test]
    fn repeated_requests_record_one_edge() {
        let mut descriptor = ServiceDescriptor::new("api", "demo::Api", false);
        descriptor.add_dependency("db");
        descriptor.add_dependency("cache");
        descriptor.add_dependency("db");

        assert_eq!(descriptor.dependencies, vec!["db", "cache"]);
    }
}
