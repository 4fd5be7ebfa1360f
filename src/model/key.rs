//! Logical identity of a catalog resource before it is persisted.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The kinds of resources the catalog stores.
///
/// Each kind lives in its own collection on the remote store, and the
/// collection name is the path segment that precedes the id in a self link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Component,
    Release,
    Project,
}

impl ResourceType {
    /// Collection path segment on the remote store.
    pub fn collection(self) -> &'static str {
        match self {
            ResourceType::Component => "components",
            ResourceType::Release => "releases",
            ResourceType::Project => "projects",
        }
    }

    /// Whether a key of this type must carry a non-empty version.
    ///
    /// Components are versionless in the catalog; their releases carry the version.
    pub fn requires_version(self) -> bool {
        !matches!(self, ResourceType::Component)
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceType::Component => "component",
            ResourceType::Release => "release",
            ResourceType::Project => "project",
        };
        f.write_str(name)
    }
}

/// `(type, name, version)` triple naming a resource independently of the store.
///
/// Equality is exact and case-sensitive on every field. The key is what
/// concurrent `get_or_create` calls are coalesced on, and what search results
/// are matched against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub name: String,
    pub version: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: version.into(),
        }
    }

    /// Key for a versionless component.
    pub fn component(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Component, name, "")
    }

    pub fn release(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(ResourceType::Release, name, version)
    }

    pub fn project(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(ResourceType::Project, name, version)
    }

    /// True when `name` and `version` both match exactly.
    pub fn has_coordinates(&self, name: &str, version: &str) -> bool {
        self.name == name && self.version == version
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}:{}", self.kind, self.name)
        } else {
            write!(f, "{}:{}@{}", self.kind, self.name, self.version)
        }
    }
}
