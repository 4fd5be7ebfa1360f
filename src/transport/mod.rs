//! # Resource Transport Boundary
//!
//! [`ResourceTransport`] is the seam between reconciliation and the remote
//! store. Implementations perform one request/response round trip per call and
//! hand back [`Envelope`]s; everything about identity and matching happens on
//! this side of the seam.
//!
//! Two implementations ship with the crate:
//!
//! - [`memory`]: an actor-backed in-memory catalog that behaves like the remote
//!   store (ids, self links, sparse search results). Used by the demo and the
//!   integration tests.
//! - [`mock`]: an expectation queue for deterministic unit tests.

pub mod memory;
pub mod mock;

use crate::error::TransportError;
use crate::model::{Attributes, Envelope, PersistedId, ResourceType};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Raw calls against the remote store.
///
/// Each call addresses one collection (`kind`). Implementations must produce
/// envelopes whose self link follows the `<collection>/<id>` convention that
/// [`identity::resolve`](crate::identity::resolve) relies on.
#[async_trait]
pub trait ResourceTransport: Send + Sync {
    /// All resources whose name matches, as sparse envelopes.
    async fn search(
        &self,
        kind: ResourceType,
        name: &str,
    ) -> Result<Vec<Envelope>, TransportError>;

    /// Every resource in the collection, as sparse envelopes.
    async fn list(&self, kind: ResourceType) -> Result<Vec<Envelope>, TransportError>;

    /// One resource as a full envelope, or `None` when the store reports not-found.
    async fn get(
        &self,
        kind: ResourceType,
        id: &PersistedId,
    ) -> Result<Option<Envelope>, TransportError>;

    /// Creates a resource and returns its full envelope.
    async fn create(
        &self,
        kind: ResourceType,
        attributes: &Attributes,
    ) -> Result<Envelope, TransportError>;

    /// Appends `hrefs` to the parent's link collection.
    ///
    /// The store treats re-adding an already linked href as a no-op.
    async fn append_links(
        &self,
        kind: ResourceType,
        parent: &PersistedId,
        hrefs: &BTreeSet<String>,
    ) -> Result<(), TransportError>;

    /// Children currently linked to the parent, as sparse envelopes.
    async fn linked(
        &self,
        kind: ResourceType,
        parent: &PersistedId,
    ) -> Result<Vec<Envelope>, TransportError>;
}
