use crate::clients::{ComponentClient, ProjectClient, ReleaseClient};
use crate::lifecycle::config::ReconcileConfig;
use crate::transport::memory::{CatalogStore, CatalogStoreClient};
use crate::transport::ResourceTransport;
use std::sync::Arc;
use tracing::{error, info};

/// Runtime orchestrator wiring the typed clients to an in-memory catalog.
///
/// `CatalogSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping the store actor
/// - **Dependency Wiring**: one transport shared by every adapter and the linker
/// - **Configuration**: applying one [`ReconcileConfig`] everywhere
///
/// # Example
///
/// ```ignore
/// let system = CatalogSystem::new(ReconcileConfig::default());
///
/// let component = system.component_client.get_or_create_component("guava", Attributes::new()).await?;
/// let release = system.release_client.get_or_create_release(&component, "27.0", Attributes::new()).await?;
/// let project = system.project_client.get_or_create_project("antenna", "1.0").await?;
/// system.project_client.link_releases(&project, &[release]).await?;
///
/// system.shutdown().await?;
/// ```
pub struct CatalogSystem {
    pub component_client: ComponentClient,
    pub release_client: ReleaseClient,
    pub project_client: ProjectClient,

    /// Direct handle to the store, for stats and fault injection.
    pub store: CatalogStoreClient,

    config: ReconcileConfig,
    handle: tokio::task::JoinHandle<()>,
}

impl CatalogSystem {
    /// Starts the store actor and builds the clients on top of it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ReconcileConfig) -> Self {
        let (store_actor, store) = CatalogStore::new(
            config.base_url.clone(),
            config.store_buffer.max(1),
            config.store_latency(),
        );
        let handle = tokio::spawn(store_actor.run());

        let transport: Arc<dyn ResourceTransport> = Arc::new(store.clone());
        info!(base_url = %config.base_url, "Catalog system started");

        Self {
            component_client: ComponentClient::from_config(transport.clone(), &config),
            release_client: ReleaseClient::from_config(transport.clone(), &config),
            project_client: ProjectClient::from_config(transport, &config),
            store,
            config,
            handle,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Drops every client and waits for the store actor to drain and exit.
    ///
    /// Resolutions still in flight hold their own transport handle, so the
    /// store only stops once they have finished.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down catalog system...");

        drop(self.component_client);
        drop(self.release_client);
        drop(self.project_client);
        drop(self.store);

        if let Err(e) = self.handle.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("Catalog system shutdown complete.");
        Ok(())
    }
}
