//! Typed clients over [`ReconciliationAdapter`](crate::adapter::ReconciliationAdapter),
//! one per resource type.

pub mod catalog_client;
pub mod component_client;
pub mod project_client;
pub mod release_client;

pub use catalog_client::*;
pub use component_client::*;
pub use project_client::*;
pub use release_client::*;
