use crate::adapter::ReconciliationAdapter;
use crate::error::ReconcileError;
use crate::model::{PersistedId, ResourceRef};
use async_trait::async_trait;

/// Trait for resource-specific clients to inherit the standard adapter calls.
///
/// Implementors only expose their adapter; `get`, `search` and
/// `get_or_create` come for free.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Access the adapter serving this client's resource type.
    fn adapter(&self) -> &ReconciliationAdapter;

    /// Fetch a resource by id.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &PersistedId) -> Result<Option<ResourceRef>, ReconcileError> {
        tracing::debug!("Sending request");
        self.adapter().get_by_id(id).await
    }

    /// Sparse search by name.
    #[tracing::instrument(skip(self))]
    async fn search(&self, name: &str) -> Result<Vec<ResourceRef>, ReconcileError> {
        tracing::debug!("Sending request");
        self.adapter().search_by_name(name).await
    }

    /// Coalesced get-or-create.
    #[tracing::instrument(skip(self, desired), fields(key = %desired.key()))]
    async fn get_or_create(&self, desired: ResourceRef) -> Result<ResourceRef, ReconcileError> {
        tracing::debug!("Sending request");
        self.adapter().get_or_create(desired).await
    }
}
