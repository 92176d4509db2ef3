use crate::service::{Service, ServiceHandle};

/// A bundle of services registered together.
///
/// ```
/// # use app_context::{BoxError, Provider, Service, ServicePackage};
/// # struct Cache;
/// # #[async_trait::async_trait]
/// # impl Service for Cache {
/// #     fn name(&self) -> &str { "cache" }
/// #     async fn init(&self, _: &mut Provider<'_>) -> Result<(), BoxError> { Ok(()) }
/// # }
/// let storage = ServicePackage::new().with(Cache);
/// let testing = ServicePackage::new().with_named("cache_stub", Cache);
/// assert_eq!(storage.merge(testing).len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ServicePackage {
    named: Vec<ServiceHandle>,
    services: Vec<ServiceHandle>,
}

impl ServicePackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Service>(mut self, service: S) -> Self {
        self.services.push(ServiceHandle::new(service));
        self
    }

    /// Registers `service` under `name` instead of its own.
    pub fn with_named<S: Service>(mut self, name: impl Into<String>, service: S) -> Self {
        self.named.push(ServiceHandle::new(service).with_name(name));
        self
    }

    pub fn with_handle(mut self, handle: ServiceHandle) -> Self {
        self.services.push(handle);
        self
    }

    pub fn merge(mut self, other: ServicePackage) -> Self {
        self.named.extend(other.named);
        self.services.extend(other.services);
        self
    }

    pub fn len(&self) -> usize {
        self.named.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Named entries first, then the rest, each in insertion order.
    pub(crate) fn into_handles(self) -> impl Iterator<Item = ServiceHandle> {
        self.named.into_iter().chain(self.services)
    }
}
