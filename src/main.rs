//! # Catalog Reconcile Demo
//!
//! Reconciles a small dependency set against the in-memory catalog:
//!
//! 1. Several tasks discover the same components concurrently; each component
//!    is created once.
//! 2. Releases are reconciled under their components.
//! 3. The releases are linked to a project, including one that was never
//!    persisted and gets skipped.

use catalog_reconcile::lifecycle::{setup_tracing, CatalogSystem, ReconcileConfig};
use catalog_reconcile::model::{Attributes, ResourceKey, ResourceRef};
use serde_json::json;
use tracing::{error, info, Instrument};

const DEPENDENCIES: &[(&str, &str)] = &[
    ("guava", "27.0-jre"),
    ("commons-io", "2.6"),
    ("guava", "27.0-jre"),
    ("jackson-databind", "2.9.8"),
    ("commons-io", "2.6"),
];

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = ReconcileConfig::from_env().map_err(|e| e.to_string())?;
    info!(?config, "Starting catalog reconciliation demo");
    let system = CatalogSystem::new(config);

    let span = tracing::info_span!("discovery");
    let mut tasks = Vec::new();
    for (name, version) in DEPENDENCIES {
        let components = system.component_client.clone();
        let releases = system.release_client.clone();
        tasks.push(tokio::spawn(
            async move {
                let mut attributes = Attributes::new();
                attributes.insert("componentType".into(), json!("OSS"));
                let component = components
                    .get_or_create_component(name, attributes)
                    .await?;
                releases
                    .get_or_create_release(&component, version, Attributes::new())
                    .await
            }
            .instrument(span.clone()),
        ));
    }

    let mut resolved = Vec::new();
    for task in tasks {
        match task.await {
            Ok(Ok(release)) => resolved.push(release),
            Ok(Err(e)) => error!(error = %e, "Reconciliation failed"),
            Err(e) => error!(error = %e, "Discovery task failed"),
        }
    }
    info!(releases = resolved.len(), "Discovery complete");

    // Stands in for a dependency the pipeline has not resolved yet.
    resolved.push(ResourceRef::new(
        ResourceKey::release("unresolved-lib", "0.1"),
        Attributes::new(),
    ));

    let span = tracing::info_span!("linking");
    let report = async {
        let project = system
            .project_client
            .get_or_create_project("antenna-demo", "1.0")
            .await?;
        let report = system
            .project_client
            .link_releases(&project, &resolved)
            .await?;
        Ok::<_, catalog_reconcile::ReconcileError>(report)
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;
    info!(
        linked = report.linked.len(),
        skipped = report.skipped.len(),
        "Project linked"
    );

    let stats = system.store.stats().await.map_err(|e| e.to_string())?;
    info!(?stats, "Store calls");

    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
