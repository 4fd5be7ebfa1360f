//! # Reconciliation Adapter
//!
//! [`ReconciliationAdapter`] keeps one resource type of the local run in step
//! with the remote store. Its composite operation,
//! [`get_or_create`](ReconciliationAdapter::get_or_create), finds a remote
//! resource with the same coordinates or creates one, and guarantees that
//! concurrent calls for the same [`ResourceKey`] share a single resolution:
//!
//! ```text
//! caller A ──┐                      ┌── search ── match? ── get_by_id
//! caller B ──┼── PendingTable[key] ─┤
//! caller C ──┘   (one entry/key)    └────────────── none ── create
//! ```
//!
//! A naive search-then-create lets two callers both miss the search and both
//! create. Here the first caller installs an entry in the [`PendingTable`]
//! and spawns the resolution; later callers await the same shared result.
//!
//! ## Cancellation
//!
//! The resolution runs in its own Tokio task. A caller that stops waiting does
//! not cancel the remote search or create; the task completes, clears its
//! entry, and its result is dropped if nobody is left to read it. No timeout
//! is applied here; callers wrap the returned future in their own.

pub mod coalesce;
pub mod validate;

pub use coalesce::{PendingGuard, PendingTable, Resolution};
pub use validate::{create_payload, validate, COMPONENT_ID_ATTRIBUTE};

use crate::error::ReconcileError;
use crate::lifecycle::config::ReconcileConfig;
use crate::model::{PersistedId, ResourceKey, ResourceRef, ResourceType};
use crate::transport::ResourceTransport;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Instrument};

/// Get / search / create / get-or-create for one resource type.
///
/// Cheap to clone: clones share the transport and the pending table, so
/// coalescing holds across every clone of one adapter.
#[derive(Clone)]
pub struct ReconciliationAdapter {
    kind: ResourceType,
    transport: Arc<dyn ResourceTransport>,
    pending: PendingTable,
    refetch_matches: bool,
}

impl ReconciliationAdapter {
    /// Creates an adapter for `kind` resources that re-fetches search matches.
    pub fn new(kind: ResourceType, transport: Arc<dyn ResourceTransport>) -> Self {
        Self {
            kind,
            transport,
            pending: PendingTable::new(),
            refetch_matches: true,
        }
    }

    pub fn from_config(
        kind: ResourceType,
        transport: Arc<dyn ResourceTransport>,
        config: &ReconcileConfig,
    ) -> Self {
        Self::new(kind, transport).refetch_matches(config.refetch_matches)
    }

    /// Whether a search match is re-fetched as a full envelope before it is
    /// returned. Without it, callers get the sparse search result.
    pub fn refetch_matches(mut self, refetch: bool) -> Self {
        self.refetch_matches = refetch;
        self
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    /// Keys currently being resolved.
    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Fetches one resource. A store not-found is `Ok(None)`.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn get_by_id(&self, id: &PersistedId) -> Result<Option<ResourceRef>, ReconcileError> {
        debug!("Sending request");
        match self.transport.get(self.kind, id).await? {
            Some(envelope) => ResourceRef::from_envelope(self.kind, envelope).map(Some),
            None => {
                debug!(%id, "Not found");
                Ok(None)
            }
        }
    }

    /// All resources the store returns for `name`, as sparse refs.
    ///
    /// The store's name search may be loose; callers filter for exact
    /// coordinates themselves.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<ResourceRef>, ReconcileError> {
        debug!("Sending request");
        let envelopes = self.transport.search(self.kind, name).await?;
        envelopes
            .into_iter()
            .map(|envelope| ResourceRef::from_envelope(self.kind, envelope))
            .collect()
    }

    /// Every resource of this adapter's type, as sparse refs in store order.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn list_all(&self) -> Result<Vec<ResourceRef>, ReconcileError> {
        debug!("Sending request");
        let envelopes = self.transport.list(self.kind).await?;
        envelopes
            .into_iter()
            .map(|envelope| ResourceRef::from_envelope(self.kind, envelope))
            .collect()
    }

    /// Validates `desired` and creates it on the store.
    ///
    /// Validation failures return [`ReconcileError::InvalidResource`] without
    /// any network call. The returned ref keeps the desired key and carries the
    /// attributes the store echoed back.
    #[instrument(skip(self, desired), fields(key = %desired.key()))]
    pub async fn create(&self, desired: ResourceRef) -> Result<ResourceRef, ReconcileError> {
        self.check_kind(desired.key())?;
        if let Err(e) = validate(&desired) {
            warn!(error = %e, "Refusing to create invalid resource");
            return Err(e);
        }

        let payload = create_payload(&desired);
        debug!(?payload, "Creating");
        let envelope = self.transport.create(self.kind, &payload).await?;
        let id = crate::identity::resolve(&envelope)?;
        info!(%id, "Created");
        Ok(ResourceRef::persisted(
            id,
            desired.key().clone(),
            envelope.attributes,
        ))
    }

    /// Returns the remote resource matching `desired`, creating it if needed.
    ///
    /// 1. A ref that already has an id is fetched; if the store does not know
    ///    it, the call fails with [`ReconcileError::NotFound`]. It is never
    ///    re-created.
    /// 2. Otherwise the call joins the in-flight resolution for the key, or
    ///    starts one: search by name, keep exact `(name, version)` matches,
    ///    use the first (store order), else create.
    ///
    /// Every caller coalesced onto one resolution receives the same outcome,
    /// success or failure. A failure does not stick: the next call starts a
    /// fresh resolution.
    #[instrument(skip(self, desired), fields(key = %desired.key()))]
    pub async fn get_or_create(&self, desired: ResourceRef) -> Result<ResourceRef, ReconcileError> {
        if let Some(id) = desired.persisted_id() {
            debug!(%id, "Resolving known id");
            return self
                .get_by_id(id)
                .await?
                .ok_or_else(|| ReconcileError::NotFound(format!("{} {}", self.kind, id)));
        }
        self.check_kind(desired.key())?;

        let key = desired.key().clone();
        let (resolution, started) = self.pending.join_or_start(&key, |guard| {
            let adapter = self.clone();
            let task = async move {
                let result = adapter.resolve(desired).await;
                guard.settle(result);
            };
            tokio::spawn(task.in_current_span());
        });

        if !started {
            debug!("Awaiting in-flight resolution");
        }
        resolution.await
    }

    /// One search-then-maybe-create pass. Runs once per pending entry.
    async fn resolve(&self, desired: ResourceRef) -> Result<ResourceRef, ReconcileError> {
        let key = desired.key().clone();
        let candidates = self.search_by_name(&key.name).await?;
        let total = candidates.len();
        let mut matches = candidates
            .into_iter()
            .filter(|candidate| candidate.key().has_coordinates(&key.name, &key.version));

        let Some(found) = matches.next() else {
            debug!(candidates = total, "No exact match");
            return self.create(desired).await;
        };

        let duplicates = matches.count();
        if duplicates > 0 {
            // Store order decides; duplicate remote data makes this arbitrary.
            debug!(duplicates, "Several exact matches, using the first");
        }

        let id = found
            .persisted_id()
            .cloned()
            .ok_or_else(|| ReconcileError::IdentityMissing(key.to_string()))?;
        info!(%id, "Matched existing resource");

        if !self.refetch_matches {
            return Ok(found);
        }
        self.get_by_id(&id).await?.ok_or_else(|| {
            ReconcileError::NotFound(format!("{} {} vanished after search", self.kind, id))
        })
    }

    fn check_kind(&self, key: &ResourceKey) -> Result<(), ReconcileError> {
        if key.kind != self.kind {
            return Err(ReconcileError::InvalidResource(format!(
                "{} adapter cannot handle {}",
                self.kind, key
            )));
        }
        Ok(())
    }
}
