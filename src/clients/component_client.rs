//! # Component Client
//!
//! Reconciles versionless components, the catalog entries releases hang off.
use crate::adapter::ReconciliationAdapter;
use crate::clients::catalog_client::CatalogClient;
use crate::error::ReconcileError;
use crate::lifecycle::config::ReconcileConfig;
use crate::model::{Attributes, ResourceKey, ResourceRef, ResourceType};
use crate::transport::ResourceTransport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Client for component resources.
#[derive(Clone)]
pub struct ComponentClient {
    inner: ReconciliationAdapter,
}

impl ComponentClient {
    pub fn new(inner: ReconciliationAdapter) -> Self {
        debug_assert_eq!(inner.kind(), ResourceType::Component);
        Self { inner }
    }

    pub fn from_config(transport: Arc<dyn ResourceTransport>, config: &ReconcileConfig) -> Self {
        Self::new(ReconciliationAdapter::from_config(
            ResourceType::Component,
            transport,
            config,
        ))
    }

    /// Finds the component called `name`, creating it with `attributes` if
    /// the catalog does not have it.
    #[instrument(skip(self, attributes))]
    pub async fn get_or_create_component(
        &self,
        name: &str,
        attributes: Attributes,
    ) -> Result<ResourceRef, ReconcileError> {
        debug!(?attributes, "get_or_create_component called");
        let desired = ResourceRef::new(ResourceKey::component(name), attributes);
        self.inner.get_or_create(desired).await
    }

    /// Every component in the catalog, sparse.
    #[instrument(skip(self))]
    pub async fn components(&self) -> Result<Vec<ResourceRef>, ReconcileError> {
        let components = self.inner.list_all().await?;
        debug!(count = components.len(), "Listed components");
        Ok(components)
    }
}

#[async_trait]
impl CatalogClient for ComponentClient {
    fn adapter(&self) -> &ReconciliationAdapter {
        &self.inner
    }
}
