//! # Project Client
//!
//! Reconciles projects and links the releases they use.
use crate::adapter::ReconciliationAdapter;
use crate::clients::catalog_client::CatalogClient;
use crate::error::ReconcileError;
use crate::lifecycle::config::ReconcileConfig;
use crate::linker::{BatchLinker, LinkReport};
use crate::model::{Attributes, PersistedId, ResourceKey, ResourceRef, ResourceType};
use crate::transport::ResourceTransport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Client for project resources and their release links.
#[derive(Clone)]
pub struct ProjectClient {
    inner: ReconciliationAdapter,
    linker: BatchLinker,
}

impl ProjectClient {
    pub fn new(inner: ReconciliationAdapter, linker: BatchLinker) -> Self {
        debug_assert_eq!(inner.kind(), ResourceType::Project);
        Self { inner, linker }
    }

    pub fn from_config(transport: Arc<dyn ResourceTransport>, config: &ReconcileConfig) -> Self {
        Self::new(
            ReconciliationAdapter::from_config(ResourceType::Project, transport.clone(), config),
            BatchLinker::releases_to_projects(transport, config),
        )
    }

    #[instrument(skip(self))]
    pub async fn get_or_create_project(
        &self,
        name: &str,
        version: &str,
    ) -> Result<ResourceRef, ReconcileError> {
        let desired = ResourceRef::new(ResourceKey::project(name, version), Attributes::new());
        self.inner.get_or_create(desired).await
    }

    /// Id of the project with exactly these coordinates, without creating it.
    #[instrument(skip(self))]
    pub async fn project_id_by_name_and_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<PersistedId>, ReconcileError> {
        let projects = self.inner.search_by_name(name).await?;
        let id = projects
            .into_iter()
            .find(|project| project.key().has_coordinates(name, version))
            .and_then(|project| project.persisted_id().cloned());
        debug!(found = id.is_some(), "Project lookup");
        Ok(id)
    }

    /// Links `releases` to `project` in one call. Unpersisted releases are skipped.
    #[instrument(skip(self, project, releases), fields(project = %project.key()))]
    pub async fn link_releases(
        &self,
        project: &ResourceRef,
        releases: &[ResourceRef],
    ) -> Result<LinkReport, ReconcileError> {
        let project_id = project.persisted_id().ok_or_else(|| {
            ReconcileError::InvalidResource(format!(
                "project {} must be persisted before linking",
                project.key()
            ))
        })?;
        self.linker.link_children(project_id, releases).await
    }

    /// Releases currently linked to the project.
    pub async fn linked_releases(
        &self,
        project_id: &PersistedId,
    ) -> Result<Vec<ResourceRef>, ReconcileError> {
        self.linker.linked_children(project_id).await
    }
}

#[async_trait]
impl CatalogClient for ProjectClient {
    fn adapter(&self) -> &ReconciliationAdapter {
        &self.inner
    }
}
