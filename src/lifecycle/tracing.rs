//! # Observability & Tracing
//!
//! Reconciliation logs through `tracing` with one span per adapter, linker
//! and client call, so a single get-or-create reads as a hierarchy:
//!
//! ```text
//! INFO get_or_create_release{key=release:guava@27}:get_or_create{key=release:guava@27}: Matched existing resource id=release-4
//! INFO link_releases{project=project-1}:link_children{parent_kind=project children=3}: Linked children linked=2 skipped=1
//! ```
//!
//! ## What Gets Traced
//!
//! - **Store lifecycle**: startup, shutdown and resource count of the in-memory store
//! - **Resolution**: search hits, exact matches, duplicates, creates
//! - **Coalescing**: callers joining an in-flight resolution (`debug`), entries settling (`trace`)
//! - **Linking**: children linked and skipped
//! - **Errors**: validation refusals and injected or remote failures (`warn`)
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run             # outcomes only
//! RUST_LOG=debug cargo run            # payloads and search results
//! RUST_LOG=catalog_reconcile::adapter=trace cargo run
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Call once, at the start of `main`. Tests that want logs can use
/// [`try_setup_tracing`] instead, which tolerates an already installed subscriber.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a
/// global subscriber is already set.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
