//! # In-Memory Catalog Store
//!
//! An actor that plays the remote store. [`CatalogStore`] owns every resource
//! and processes [`StoreRequest`]s one at a time; [`CatalogStoreClient`] is the
//! cloneable handle that sends them and implements [`ResourceTransport`].
//!
//! The store behaves like the real catalog where reconciliation can tell the
//! difference:
//!
//! - ids are assigned on create and exposed only through self links;
//! - search is a loose, case-insensitive name match returning sparse envelopes,
//!   so callers still have to filter for exact coordinates;
//! - re-linking an already linked child is a no-op.
//!
//! It also counts calls per operation and can fail the next call of a given
//! operation, which the tests use to observe coalescing and retry behavior.
//!
//! ```rust
//! use catalog_reconcile::transport::memory::CatalogStore;
//! use catalog_reconcile::transport::ResourceTransport;
//! use catalog_reconcile::model::{Attributes, ResourceType};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (store, client) = CatalogStore::new("http://catalog/api", 16, Duration::ZERO);
//!     tokio::spawn(store.run());
//!
//!     let mut attributes = Attributes::new();
//!     attributes.insert("name".into(), "guava".into());
//!     let envelope = client.create(ResourceType::Component, &attributes).await.unwrap();
//!     assert!(envelope.self_link().is_some());
//! }
//! ```

use crate::error::TransportError;
use crate::identity::href_for;
use crate::model::{
    Attributes, Envelope, LinkSet, PersistedId, ResourceType, NAME_ATTRIBUTE, SELF_REL,
    VERSION_ATTRIBUTE,
};
use crate::transport::ResourceTransport;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Relation name under which linked children appear in a full envelope.
pub const CHILD_REL: &str = "sw360:releases";

/// Type alias for the one-shot response channel used by the store.
pub type Response<T> = oneshot::Sender<Result<T, TransportError>>;

/// Operations the store counts and can inject faults into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Search,
    List,
    Get,
    Create,
    AppendLinks,
    Linked,
}

/// Number of calls the store has answered, per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub searches: usize,
    pub lists: usize,
    pub gets: usize,
    pub creates: usize,
    pub link_calls: usize,
    pub linked_queries: usize,
}

impl StoreStats {
    fn record(&mut self, op: StoreOp) {
        match op {
            StoreOp::Search => self.searches += 1,
            StoreOp::List => self.lists += 1,
            StoreOp::Get => self.gets += 1,
            StoreOp::Create => self.creates += 1,
            StoreOp::AppendLinks => self.link_calls += 1,
            StoreOp::Linked => self.linked_queries += 1,
        }
    }
}

/// Messages understood by the [`CatalogStore`] actor.
#[derive(Debug)]
pub enum StoreRequest {
    Search {
        kind: ResourceType,
        name: String,
        respond_to: Response<Vec<Envelope>>,
    },
    List {
        kind: ResourceType,
        respond_to: Response<Vec<Envelope>>,
    },
    Get {
        kind: ResourceType,
        id: PersistedId,
        respond_to: Response<Option<Envelope>>,
    },
    Create {
        kind: ResourceType,
        attributes: Attributes,
        respond_to: Response<Envelope>,
    },
    AppendLinks {
        kind: ResourceType,
        parent: PersistedId,
        hrefs: BTreeSet<String>,
        respond_to: Response<()>,
    },
    Linked {
        kind: ResourceType,
        parent: PersistedId,
        respond_to: Response<Vec<Envelope>>,
    },
    InjectFault {
        op: StoreOp,
        error: TransportError,
        respond_to: Response<()>,
    },
    Stats {
        respond_to: Response<StoreStats>,
    },
}

impl StoreRequest {
    fn op(&self) -> Option<StoreOp> {
        match self {
            StoreRequest::Search { .. } => Some(StoreOp::Search),
            StoreRequest::List { .. } => Some(StoreOp::List),
            StoreRequest::Get { .. } => Some(StoreOp::Get),
            StoreRequest::Create { .. } => Some(StoreOp::Create),
            StoreRequest::AppendLinks { .. } => Some(StoreOp::AppendLinks),
            StoreRequest::Linked { .. } => Some(StoreOp::Linked),
            StoreRequest::InjectFault { .. } | StoreRequest::Stats { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredResource {
    attributes: Attributes,
    children: BTreeSet<String>,
}

/// The store actor. Owns all state; run it with [`CatalogStore::run`].
///
/// Requests are handled sequentially, so the store needs no locks. An optional
/// latency is slept before each store operation is answered, standing in for the
/// network round trip.
pub struct CatalogStore {
    receiver: mpsc::Receiver<StoreRequest>,
    resources: HashMap<(ResourceType, PersistedId), StoredResource>,
    faults: HashMap<StoreOp, Vec<TransportError>>,
    stats: StoreStats,
    next_id: u32,
    base_url: String,
    latency: Duration,
}

impl CatalogStore {
    /// Creates the store actor and its client.
    ///
    /// * `base_url` - prefix of every self link the store hands out
    /// * `buffer_size` - capacity of the request channel
    /// * `latency` - simulated round-trip time per store operation
    pub fn new(
        base_url: impl Into<String>,
        buffer_size: usize,
        latency: Duration,
    ) -> (Self, CatalogStoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            resources: HashMap::new(),
            faults: HashMap::new(),
            stats: StoreStats::default(),
            next_id: 1,
            base_url: base_url.into(),
            latency,
        };
        (store, CatalogStoreClient::new(sender))
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!(base_url = %self.base_url, "Catalog store started");

        while let Some(msg) = self.receiver.recv().await {
            if let Some(op) = msg.op() {
                self.stats.record(op);
                if !self.latency.is_zero() {
                    tokio::time::sleep(self.latency).await;
                }
                if let Some(error) = self.take_fault(op) {
                    warn!(?op, error = %error, "Injected fault");
                    fail(msg, error);
                    continue;
                }
            }

            match msg {
                StoreRequest::Search {
                    kind,
                    name,
                    respond_to,
                } => {
                    let needle = name.to_lowercase();
                    let hits: Vec<Envelope> = self
                        .resources
                        .iter()
                        .filter(|((k, _), stored)| {
                            *k == kind
                                && name_of(&stored.attributes)
                                    .is_some_and(|n| n.to_lowercase().contains(&needle))
                        })
                        .map(|((k, id), stored)| self.sparse(*k, id, stored))
                        .collect();
                    debug!(%kind, %name, hits = hits.len(), "Search");
                    let _ = respond_to.send(Ok(hits));
                }
                StoreRequest::List { kind, respond_to } => {
                    let all: Vec<Envelope> = self
                        .resources
                        .iter()
                        .filter(|((k, _), _)| *k == kind)
                        .map(|((k, id), stored)| self.sparse(*k, id, stored))
                        .collect();
                    debug!(%kind, size = all.len(), "List");
                    let _ = respond_to.send(Ok(all));
                }
                StoreRequest::Get {
                    kind,
                    id,
                    respond_to,
                } => {
                    let found = self
                        .resources
                        .get(&(kind, id.clone()))
                        .map(|stored| self.full(kind, &id, stored));
                    debug!(%kind, %id, found = found.is_some(), "Get");
                    let _ = respond_to.send(Ok(found));
                }
                StoreRequest::Create {
                    kind,
                    attributes,
                    respond_to,
                } => {
                    let id = PersistedId(format!("{}-{}", kind, self.next_id));
                    self.next_id += 1;
                    let stored = StoredResource {
                        attributes,
                        children: BTreeSet::new(),
                    };
                    let envelope = self.full(kind, &id, &stored);
                    self.resources.insert((kind, id.clone()), stored);
                    info!(%kind, %id, size = self.resources.len(), "Created");
                    let _ = respond_to.send(Ok(envelope));
                }
                StoreRequest::AppendLinks {
                    kind,
                    parent,
                    hrefs,
                    respond_to,
                } => match self.resources.get_mut(&(kind, parent.clone())) {
                    Some(stored) => {
                        let before = stored.children.len();
                        stored.children.extend(hrefs);
                        let added = stored.children.len() - before;
                        info!(%kind, %parent, added, total = stored.children.len(), "Linked");
                        let _ = respond_to.send(Ok(()));
                    }
                    None => {
                        warn!(%kind, %parent, "Link target not found");
                        let _ = respond_to.send(Err(not_found(kind, &parent)));
                    }
                },
                StoreRequest::Linked {
                    kind,
                    parent,
                    respond_to,
                } => {
                    let result = match self.resources.get(&(kind, parent.clone())) {
                        Some(stored) => Ok(self.resolve_children(&stored.children)),
                        None => Err(not_found(kind, &parent)),
                    };
                    debug!(%kind, %parent, ok = result.is_ok(), "Linked");
                    let _ = respond_to.send(result);
                }
                StoreRequest::InjectFault {
                    op,
                    error,
                    respond_to,
                } => {
                    debug!(?op, error = %error, "Fault armed");
                    self.faults.entry(op).or_default().push(error);
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Stats { respond_to } => {
                    let _ = respond_to.send(Ok(self.stats.clone()));
                }
            }
        }

        info!(size = self.resources.len(), "Catalog store shutdown");
    }

    fn take_fault(&mut self, op: StoreOp) -> Option<TransportError> {
        let queue = self.faults.get_mut(&op)?;
        if queue.is_empty() {
            return None;
        }
        Some(queue.remove(0))
    }

    fn self_href(&self, kind: ResourceType, id: &PersistedId) -> String {
        href_for(&self.base_url, kind, id)
    }

    fn sparse(&self, kind: ResourceType, id: &PersistedId, stored: &StoredResource) -> Envelope {
        let attributes: Attributes = stored
            .attributes
            .iter()
            .filter(|(name, _)| *name == NAME_ATTRIBUTE || *name == VERSION_ATTRIBUTE)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Envelope::new(attributes, LinkSet::with_self(self.self_href(kind, id)))
    }

    fn full(&self, kind: ResourceType, id: &PersistedId, stored: &StoredResource) -> Envelope {
        let mut links = LinkSet::with_self(self.self_href(kind, id));
        for child in &stored.children {
            links.push(CHILD_REL, child.clone());
        }
        Envelope::new(stored.attributes.clone(), links)
    }

    /// Maps child hrefs back to sparse envelopes. Hrefs that point nowhere are skipped.
    fn resolve_children(&self, hrefs: &BTreeSet<String>) -> Vec<Envelope> {
        hrefs
            .iter()
            .filter_map(|href| {
                let (kind, id) = self.parse_href(href)?;
                let stored = self.resources.get(&(kind, id.clone()))?;
                Some(self.sparse(kind, &id, stored))
            })
            .collect()
    }

    fn parse_href(&self, href: &str) -> Option<(ResourceType, PersistedId)> {
        let rest = href.strip_prefix(self.base_url.trim_end_matches('/'))?;
        let mut parts = rest.trim_start_matches('/').splitn(2, '/');
        let kind = match parts.next()? {
            "components" => ResourceType::Component,
            "releases" => ResourceType::Release,
            "projects" => ResourceType::Project,
            _ => return None,
        };
        let id = parts.next()?;
        Some((kind, PersistedId::from(id)))
    }
}

fn name_of(attributes: &Attributes) -> Option<&str> {
    attributes.get(NAME_ATTRIBUTE).and_then(|v| v.as_str())
}

fn not_found(kind: ResourceType, id: &PersistedId) -> TransportError {
    TransportError::Status {
        code: 404,
        message: format!("{} {} not found", kind, id),
    }
}

/// Answers a store operation with `error`.
fn fail(msg: StoreRequest, error: TransportError) {
    match msg {
        StoreRequest::Search { respond_to, .. } | StoreRequest::List { respond_to, .. } => {
            let _ = respond_to.send(Err(error));
        }
        StoreRequest::Get { respond_to, .. } => {
            let _ = respond_to.send(Err(error));
        }
        StoreRequest::Create { respond_to, .. } => {
            let _ = respond_to.send(Err(error));
        }
        StoreRequest::AppendLinks { respond_to, .. } => {
            let _ = respond_to.send(Err(error));
        }
        StoreRequest::Linked { respond_to, .. } => {
            let _ = respond_to.send(Err(error));
        }
        // Control messages have no StoreOp and are never faulted.
        StoreRequest::InjectFault { .. } | StoreRequest::Stats { .. } => {}
    }
}

/// Cloneable handle to a running [`CatalogStore`].
#[derive(Clone)]
pub struct CatalogStoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl CatalogStoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> StoreRequest,
    ) -> Result<T, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| TransportError::Closed)?;
        response.await.map_err(|_| TransportError::Closed)?
    }

    /// Makes the next call of `op` fail with `error`. Faults queue up per operation.
    pub async fn inject_fault(&self, op: StoreOp, error: TransportError) -> Result<(), TransportError> {
        self.request(|respond_to| StoreRequest::InjectFault {
            op,
            error,
            respond_to,
        })
        .await
    }

    /// Call counts so far.
    pub async fn stats(&self) -> Result<StoreStats, TransportError> {
        self.request(|respond_to| StoreRequest::Stats { respond_to })
            .await
    }
}

#[async_trait]
impl ResourceTransport for CatalogStoreClient {
    async fn search(
        &self,
        kind: ResourceType,
        name: &str,
    ) -> Result<Vec<Envelope>, TransportError> {
        let name = name.to_string();
        self.request(|respond_to| StoreRequest::Search {
            kind,
            name,
            respond_to,
        })
        .await
    }

    async fn list(&self, kind: ResourceType) -> Result<Vec<Envelope>, TransportError> {
        self.request(|respond_to| StoreRequest::List { kind, respond_to })
            .await
    }

    async fn get(
        &self,
        kind: ResourceType,
        id: &PersistedId,
    ) -> Result<Option<Envelope>, TransportError> {
        let id = id.clone();
        self.request(|respond_to| StoreRequest::Get {
            kind,
            id,
            respond_to,
        })
        .await
    }

    async fn create(
        &self,
        kind: ResourceType,
        attributes: &Attributes,
    ) -> Result<Envelope, TransportError> {
        let attributes = attributes.clone();
        self.request(|respond_to| StoreRequest::Create {
            kind,
            attributes,
            respond_to,
        })
        .await
    }

    async fn append_links(
        &self,
        kind: ResourceType,
        parent: &PersistedId,
        hrefs: &BTreeSet<String>,
    ) -> Result<(), TransportError> {
        let parent = parent.clone();
        let hrefs = hrefs.clone();
        self.request(|respond_to| StoreRequest::AppendLinks {
            kind,
            parent,
            hrefs,
            respond_to,
        })
        .await
    }

    async fn linked(
        &self,
        kind: ResourceType,
        parent: &PersistedId,
    ) -> Result<Vec<Envelope>, TransportError> {
        let parent = parent.clone();
        self.request(|respond_to| StoreRequest::Linked {
            kind,
            parent,
            respond_to,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::resolve;
    use serde_json::json;

    const BASE: &str = "http://catalog/api";

    fn start() -> CatalogStoreClient {
        let (store, client) = CatalogStore::new(BASE, 16, Duration::ZERO);
        tokio::spawn(store.run());
        client
    }

    fn named(name: &str, version: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!(name));
        if !version.is_empty() {
            attributes.insert("version".into(), json!(version));
        }
        attributes.insert("description".into(), json!("from test"));
        attributes
    }

    #[tokio::test]
    async fn test_create_then_get_full_envelope() {
        let client = start();
        let created = client
            .create(ResourceType::Release, &named("jackson", "2.9"))
            .await
            .unwrap();
        let id = resolve(&created).unwrap();
        assert_eq!(
            created.self_link().unwrap().href,
            format!("{}/releases/{}", BASE, id)
        );

        let fetched = client.get(ResourceType::Release, &id).await.unwrap().unwrap();
        assert_eq!(fetched.attribute_str("description"), Some("from test"));
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let client = start();
        let missing = client
            .get(ResourceType::Component, &PersistedId::from("nope"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_search_is_loose_and_sparse() {
        let client = start();
        client
            .create(ResourceType::Component, &named("log4j", ""))
            .await
            .unwrap();
        client
            .create(ResourceType::Component, &named("Log4j-Core", ""))
            .await
            .unwrap();
        client
            .create(ResourceType::Release, &named("log4j", "1.2"))
            .await
            .unwrap();

        let hits = client.search(ResourceType::Component, "log4j").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|e| e.attribute_str("description").is_none()));
        assert!(hits.iter().all(|e| e.self_link().is_some()));
    }

    #[tokio::test]
    async fn test_list_returns_whole_collection_sparse() {
        let client = start();
        client
            .create(ResourceType::Component, &named("guava", ""))
            .await
            .unwrap();
        client
            .create(ResourceType::Component, &named("commons-io", ""))
            .await
            .unwrap();
        client
            .create(ResourceType::Release, &named("guava", "27"))
            .await
            .unwrap();

        let components = client.list(ResourceType::Component).await.unwrap();
        assert_eq!(components.len(), 2);
        assert!(components.iter().all(|e| e.attribute_str("description").is_none()));
        assert!(components.iter().all(|e| resolve(e).is_ok()));

        let projects = client.list(ResourceType::Project).await.unwrap();
        assert!(projects.is_empty());

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.lists, 2);
    }

    #[tokio::test]
    async fn test_injected_list_fault() {
        let client = start();
        client
            .inject_fault(StoreOp::List, TransportError::Closed)
            .await
            .unwrap();

        let result = client.list(ResourceType::Component).await;
        assert_eq!(result, Err(TransportError::Closed));
        assert!(client.list(ResourceType::Component).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_links_is_idempotent() {
        let client = start();
        let project = client
            .create(ResourceType::Project, &named("antenna", "1.0"))
            .await
            .unwrap();
        let release = client
            .create(ResourceType::Release, &named("guava", "27"))
            .await
            .unwrap();
        let project_id = resolve(&project).unwrap();
        let href = release.self_link().unwrap().href.clone();
        let hrefs: BTreeSet<String> = [href].into_iter().collect();

        client
            .append_links(ResourceType::Project, &project_id, &hrefs)
            .await
            .unwrap();
        client
            .append_links(ResourceType::Project, &project_id, &hrefs)
            .await
            .unwrap();

        let linked = client.linked(ResourceType::Project, &project_id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].attribute_str("name"), Some("guava"));
    }

    #[tokio::test]
    async fn test_append_links_to_unknown_parent() {
        let client = start();
        let result = client
            .append_links(
                ResourceType::Project,
                &PersistedId::from("ghost"),
                &BTreeSet::new(),
            )
            .await;
        assert!(matches!(result, Err(TransportError::Status { code: 404, .. })));
    }

    #[tokio::test]
    async fn test_injected_fault_hits_next_call_only() {
        let client = start();
        client
            .inject_fault(StoreOp::Create, TransportError::Unavailable("down".into()))
            .await
            .unwrap();

        let first = client.create(ResourceType::Component, &named("a", "")).await;
        assert_eq!(first, Err(TransportError::Unavailable("down".into())));
        let second = client.create(ResourceType::Component, &named("a", "")).await;
        assert!(second.is_ok());

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.creates, 2);
    }

    #[tokio::test]
    async fn test_closed_store() {
        let (store, client) = CatalogStore::new(BASE, 1, Duration::ZERO);
        drop(store);
        let result = client.search(ResourceType::Component, "x").await;
        assert_eq!(result, Err(TransportError::Closed));
    }
}
