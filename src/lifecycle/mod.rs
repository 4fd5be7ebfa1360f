//! # System Lifecycle
//!
//! Everything around the reconciliation core that a running program needs:
//!
//! - [`config`]: the [`ReconcileConfig`] knobs and their environment overrides
//! - [`tracing`]: subscriber setup for structured logs
//! - [`CatalogSystem`]: starts the in-memory store, wires the typed clients,
//!   and shuts them down in order
//!
//! ## Graceful Shutdown
//!
//! The store actor exits when its last client handle is dropped.
//! [`CatalogSystem::shutdown`] drops the clients it owns and awaits the actor
//! task, so no request is lost.

pub mod catalog_system;
pub mod config;
pub mod tracing;

pub use catalog_system::*;
pub use config::{ConfigError, ReconcileConfig};
pub use self::tracing::{setup_tracing, try_setup_tracing};
