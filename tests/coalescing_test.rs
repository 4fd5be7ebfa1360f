use catalog_reconcile::adapter::{ReconciliationAdapter, COMPONENT_ID_ATTRIBUTE};
use catalog_reconcile::model::{Attributes, PersistedId, ResourceKey, ResourceRef, ResourceType};
use catalog_reconcile::transport::memory::{CatalogStore, CatalogStoreClient, StoreOp};
use catalog_reconcile::transport::ResourceTransport;
use catalog_reconcile::{ReconcileError, TransportError};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const BASE: &str = "http://catalog/api";

/// Starts a store whose every call takes `latency`, so concurrent callers overlap.
fn start_store(latency: Duration) -> CatalogStoreClient {
    let (store, client) = CatalogStore::new(BASE, 64, latency);
    tokio::spawn(store.run());
    client
}

fn adapter(kind: ResourceType, store: &CatalogStoreClient) -> ReconciliationAdapter {
    ReconciliationAdapter::new(kind, Arc::new(store.clone()))
}

fn component(name: &str) -> ResourceRef {
    ResourceRef::new(ResourceKey::component(name), Attributes::new())
}

fn release(name: &str, version: &str) -> ResourceRef {
    ResourceRef::new(ResourceKey::release(name, version), Attributes::new())
        .with_attribute(COMPONENT_ID_ATTRIBUTE, "component-1")
}

/// N concurrent calls for one key: one search, one create, one id for everyone.
#[tokio::test]
async fn test_concurrent_get_or_create_creates_once() {
    let store = start_store(Duration::from_millis(20));
    let adapter = adapter(ResourceType::Component, &store);

    let calls = (0..16).map(|_| adapter.get_or_create(component("guava")));
    let results = join_all(calls).await;

    let ids: Vec<PersistedId> = results
        .into_iter()
        .map(|result| result.unwrap().persisted_id().cloned().unwrap())
        .collect();
    assert!(ids.iter().all(|id| *id == ids[0]));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.creates, 1);
    assert_eq!(stats.searches, 1);
    assert!(adapter.pending().is_empty());
}

/// Coalescing holds across tasks and across clones of the adapter.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_coalescing_across_spawned_tasks() {
    let store = start_store(Duration::from_millis(20));
    let adapter = adapter(ResourceType::Release, &store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.get_or_create(release("guava", "27")).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let resolved = handle.await.unwrap().unwrap();
        ids.push(resolved.persisted_id().cloned().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(store.stats().await.unwrap().creates, 1);
}

#[tokio::test]
async fn test_distinct_keys_resolve_independently() {
    let store = start_store(Duration::from_millis(5));
    let adapter = adapter(ResourceType::Release, &store);

    let (a, b) = tokio::join!(
        adapter.get_or_create(release("guava", "27")),
        adapter.get_or_create(release("guava", "28")),
    );
    assert_ne!(a.unwrap().persisted_id(), b.unwrap().persisted_id());
    assert_eq!(store.stats().await.unwrap().creates, 2);
}

/// Every waiter sees the same failure, and the key is free to retry right away.
#[tokio::test]
async fn test_failure_is_shared_then_retry_succeeds() {
    let store = start_store(Duration::from_millis(10));
    store
        .inject_fault(
            StoreOp::Create,
            TransportError::Status {
                code: 502,
                message: "bad gateway".into(),
            },
        )
        .await
        .unwrap();
    let adapter = adapter(ResourceType::Component, &store);

    let results = join_all((0..4).map(|_| adapter.get_or_create(component("guava")))).await;
    let first = results[0].clone();
    assert!(matches!(first, Err(ReconcileError::RemoteFailure(_))));
    assert!(results.iter().all(|result| *result == first));
    assert!(adapter.pending().is_empty());

    let retried = adapter.get_or_create(component("guava")).await.unwrap();
    assert!(retried.is_persisted());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.creates, 2);
    assert_eq!(stats.searches, 2);
}

/// A caller that gives up does not cancel the remote create.
#[tokio::test]
async fn test_abandoned_caller_does_not_cancel_resolution() {
    let store = start_store(Duration::from_millis(30));
    let adapter = adapter(ResourceType::Component, &store);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        adapter.get_or_create(component("guava")),
    )
    .await;
    assert!(abandoned.is_err());

    // search + create finish in the background
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(adapter.pending().is_empty());
    assert_eq!(store.stats().await.unwrap().creates, 1);

    let resolved = adapter.get_or_create(component("guava")).await.unwrap();
    assert!(resolved.is_persisted());
    assert_eq!(store.stats().await.unwrap().creates, 1);
}

#[tokio::test]
async fn test_existing_match_prevents_create() {
    let store = start_store(Duration::ZERO);
    let mut attributes = Attributes::new();
    attributes.insert("name".into(), json!("guava"));
    attributes.insert("description".into(), json!("Google core libraries"));
    store
        .create(ResourceType::Component, &attributes)
        .await
        .unwrap();
    let adapter = adapter(ResourceType::Component, &store);

    let resolved = adapter.get_or_create(component("guava")).await.unwrap();

    // re-fetched as a full envelope
    assert_eq!(
        resolved.attribute_str("description"),
        Some("Google core libraries")
    );
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.creates, 1);
    assert_eq!(stats.gets, 1);
}

#[tokio::test]
async fn test_invalid_resource_never_reaches_store() {
    let store = start_store(Duration::ZERO);
    let adapter = adapter(ResourceType::Component, &store);

    let result = adapter.create(component("")).await;
    assert!(matches!(result, Err(ReconcileError::InvalidResource(_))));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.creates, 0);
    assert_eq!(stats.searches, 0);
}

#[tokio::test]
async fn test_unknown_known_id_is_not_found() {
    let store = start_store(Duration::ZERO);
    let adapter = adapter(ResourceType::Component, &store);

    let known = ResourceRef::persisted("component-99", ResourceKey::component("guava"), Attributes::new());
    let result = adapter.get_or_create(known).await;
    assert!(matches!(result, Err(ReconcileError::NotFound(_))));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.searches, 0);
    assert_eq!(stats.creates, 0);
}
