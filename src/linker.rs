//! # Batch Linker
//!
//! Attaches already-persisted children (releases) to a parent (project) with a
//! single `append_links` call. Hrefs are rebuilt from the children's ids with
//! [`href_for`], never re-fetched.
//!
//! Children that are not persisted yet, or are not of the linker's child type,
//! are skipped, logged, and listed in the returned [`LinkReport`]; they do not
//! fail the batch. The store is assumed to
//! treat re-linking an already linked child as a no-op; callers linking against
//! a store without that guarantee must de-duplicate first.

use crate::error::ReconcileError;
use crate::identity::href_for;
use crate::lifecycle::config::ReconcileConfig;
use crate::model::{PersistedId, ResourceKey, ResourceRef, ResourceType};
use crate::transport::ResourceTransport;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a [`BatchLinker::link_children`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkReport {
    /// Children whose hrefs were sent, de-duplicated.
    pub linked: Vec<PersistedId>,
    /// Children left out: not persisted, or of the wrong type.
    pub skipped: Vec<ResourceKey>,
}

impl LinkReport {
    /// True when no child had to be skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Links children of `child_kind` to parents of `parent_kind`.
#[derive(Clone)]
pub struct BatchLinker {
    parent_kind: ResourceType,
    child_kind: ResourceType,
    transport: Arc<dyn ResourceTransport>,
    base_url: String,
}

impl BatchLinker {
    pub fn new(
        parent_kind: ResourceType,
        child_kind: ResourceType,
        transport: Arc<dyn ResourceTransport>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            parent_kind,
            child_kind,
            transport,
            base_url: base_url.into(),
        }
    }

    /// Linker attaching releases to projects.
    pub fn releases_to_projects(
        transport: Arc<dyn ResourceTransport>,
        config: &ReconcileConfig,
    ) -> Self {
        Self::new(
            ResourceType::Project,
            ResourceType::Release,
            transport,
            config.base_url.clone(),
        )
    }

    /// Appends every persisted child to `parent` in one remote call.
    ///
    /// No call is made when there is nothing to link.
    #[instrument(skip(self, children), fields(parent_kind = %self.parent_kind, children = children.len()))]
    pub async fn link_children(
        &self,
        parent: &PersistedId,
        children: &[ResourceRef],
    ) -> Result<LinkReport, ReconcileError> {
        let mut report = LinkReport::default();
        let mut hrefs = BTreeSet::new();

        for child in children {
            if child.key().kind != self.child_kind {
                warn!(child = %child.key(), expected = %self.child_kind, "Skipping child of wrong type");
                report.skipped.push(child.key().clone());
                continue;
            }
            match child.persisted_id() {
                Some(id) => {
                    if hrefs.insert(href_for(&self.base_url, self.child_kind, id)) {
                        report.linked.push(id.clone());
                    }
                }
                None => {
                    warn!(child = %child.key(), "Skipping unpersisted child");
                    report.skipped.push(child.key().clone());
                }
            }
        }

        if hrefs.is_empty() {
            debug!(skipped = report.skipped.len(), "Nothing to link");
            return Ok(report);
        }

        debug!(?hrefs, "Sending request");
        self.transport
            .append_links(self.parent_kind, parent, &hrefs)
            .await?;
        info!(
            linked = report.linked.len(),
            skipped = report.skipped.len(),
            "Linked children"
        );
        Ok(report)
    }

    /// Children currently linked to `parent`, as sparse refs.
    #[instrument(skip(self), fields(parent_kind = %self.parent_kind))]
    pub async fn linked_children(&self, parent: &PersistedId) -> Result<Vec<ResourceRef>, ReconcileError> {
        debug!("Sending request");
        let envelopes = self.transport.linked(self.parent_kind, parent).await?;
        envelopes
            .into_iter()
            .map(|envelope| ResourceRef::from_envelope(self.child_kind, envelope))
            .collect()
    }
}
