//! # Catalog Reconcile
//!
//! > **Get-or-create reconciliation of components, releases and projects against a remote catalog.**
//!
//! This crate keeps a local run's view of software components in step with a
//! remote resource store that names its resources with hypermedia self links.
//! Callers describe what they found (a [`ResourceKey`](model::ResourceKey) plus
//! attributes); the crate finds the matching remote resource or creates it, and
//! later links releases to the projects that use them.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why single-flight get-or-create?
//!
//! The straightforward pattern is *search, and create on a miss*. Under
//! concurrency two callers can both miss and both create, leaving duplicates in
//! the catalog. Here every `get_or_create` for a key goes through a
//! [`PendingTable`](adapter::PendingTable): the first caller starts one
//! resolution, everyone else awaits the same shared result.
//!
//! ### Identity from links
//!
//! The store never returns an id field. A resource's id is the last path
//! segment of its `self` link, extracted by [`identity::resolve`]. Keeping that
//! a pure function over [`Envelope`](model::Envelope) values decouples identity
//! from whichever transport produced the envelope.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Data ([`model`])
//! Keys, refs, envelopes and link sets. A [`ResourceRef`](model::ResourceRef)
//! has no setter for its persisted id: once assigned, it never changes.
//!
//! ### 2. The Core ([`identity`], [`adapter`], [`linker`])
//! - **Identity Resolver**: self link → [`PersistedId`](model::PersistedId).
//! - **Reconciliation Adapter**: get, search, validated create, coalesced get-or-create.
//! - **Batch Linker**: attaches persisted releases to a project in one call.
//!
//! ### 3. The Boundary ([`transport`])
//! [`ResourceTransport`](transport::ResourceTransport) is the only way the core
//! talks to the store. An actor-backed in-memory store and an expectation-driven
//! mock ship with the crate.
//!
//! ### 4. The Interface ([`clients`])
//! [`ComponentClient`](clients::ComponentClient), [`ReleaseClient`](clients::ReleaseClient)
//! and [`ProjectClient`](clients::ProjectClient) wrap an adapter per resource type.
//!
//! ### 5. The Orchestrator ([`lifecycle`])
//! Configuration, tracing setup and [`CatalogSystem`](lifecycle::CatalogSystem),
//! which wires everything to an in-memory store.
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use catalog_reconcile::lifecycle::{CatalogSystem, ReconcileConfig};
//! use catalog_reconcile::model::Attributes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let system = CatalogSystem::new(ReconcileConfig::default());
//!
//!     let first = system
//!         .component_client
//!         .get_or_create_component("guava", Attributes::new())
//!         .await
//!         .unwrap();
//!     let again = system
//!         .component_client
//!         .get_or_create_component("guava", Attributes::new())
//!         .await
//!         .unwrap();
//!     assert_eq!(first.persisted_id(), again.persisted_id());
//!
//!     system.shutdown().await.unwrap();
//! }
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod adapter;
pub mod clients;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod linker;
pub mod model;
pub mod transport;

pub use adapter::ReconciliationAdapter;
pub use error::{ReconcileError, TransportError};
pub use linker::{BatchLinker, LinkReport};
