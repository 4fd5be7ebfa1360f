//! Local references to catalog resources, persisted or not.

use crate::error::ReconcileError;
use crate::identity;
use crate::model::{Envelope, ResourceKey, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Loosely typed attribute bag carried by every resource.
pub type Attributes = BTreeMap<String, Value>;

/// Attribute holding the resource name on the wire.
pub const NAME_ATTRIBUTE: &str = "name";
/// Attribute holding the resource version on the wire.
pub const VERSION_ATTRIBUTE: &str = "version";

/// Identifier the remote store assigned to a resource.
///
/// By convention it is the trailing path segment of the resource's self link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersistedId(pub String);

impl PersistedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PersistedId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PersistedId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for PersistedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resource as the local run sees it.
///
/// A ref is born unpersisted (key + desired attributes) and becomes persisted
/// when reconciliation resolves it. There is no setter for the persisted id:
/// a persisted ref is a new value, so an id once assigned never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    persisted_id: Option<PersistedId>,
    key: ResourceKey,
    attributes: Attributes,
}

impl ResourceRef {
    /// An unpersisted ref carrying the desired attributes.
    pub fn new(key: ResourceKey, attributes: Attributes) -> Self {
        Self {
            persisted_id: None,
            key,
            attributes,
        }
    }

    /// A ref for a resource the caller already knows the id of.
    pub fn persisted(id: impl Into<PersistedId>, key: ResourceKey, attributes: Attributes) -> Self {
        Self {
            persisted_id: Some(id.into()),
            key,
            attributes,
        }
    }

    /// Builds a persisted ref from an envelope received from the store.
    ///
    /// The key's name and version come from the envelope's attributes; a
    /// missing version reads as the empty string (versionless components).
    pub fn from_envelope(kind: ResourceType, envelope: Envelope) -> Result<Self, ReconcileError> {
        let id = identity::resolve(&envelope)?;
        let name = envelope.attribute_str(NAME_ATTRIBUTE).unwrap_or_default();
        let version = envelope.attribute_str(VERSION_ATTRIBUTE).unwrap_or_default();
        let key = ResourceKey::new(kind, name, version);
        Ok(Self::persisted(id, key, envelope.attributes))
    }

    pub fn persisted_id(&self) -> Option<&PersistedId> {
        self.persisted_id.as_ref()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted_id.is_some()
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// String value of an attribute, if present and a string.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Adds or replaces an attribute. The persisted id is untouched.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkSet;
    use serde_json::json;

    fn release_envelope(href: &str) -> Envelope {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!("commons-io"));
        attributes.insert("version".into(), json!("2.6"));
        attributes.insert("componentId".into(), json!("c1"));
        Envelope::new(attributes, LinkSet::with_self(href))
    }

    #[test]
    fn test_from_envelope_reads_key_and_id() {
        let envelope = release_envelope("http://host/api/releases/r42");
        let resource = ResourceRef::from_envelope(ResourceType::Release, envelope).unwrap();

        assert_eq!(resource.persisted_id(), Some(&PersistedId::from("r42")));
        assert_eq!(resource.key(), &ResourceKey::release("commons-io", "2.6"));
        assert_eq!(resource.attribute_str("componentId"), Some("c1"));
    }

    #[test]
    fn test_from_envelope_without_version_is_versionless() {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), json!("commons-io"));
        let envelope = Envelope::new(attributes, LinkSet::with_self("http://host/api/components/c1"));

        let resource = ResourceRef::from_envelope(ResourceType::Component, envelope).unwrap();
        assert_eq!(resource.key(), &ResourceKey::component("commons-io"));
    }

    #[test]
    fn test_from_envelope_without_self_link_fails() {
        let envelope = Envelope::new(Attributes::new(), LinkSet::default());
        let result = ResourceRef::from_envelope(ResourceType::Component, envelope);
        assert!(matches!(result, Err(ReconcileError::IdentityMissing(_))));
    }

    #[test]
    fn test_new_ref_is_unpersisted() {
        let resource = ResourceRef::new(ResourceKey::component("guava"), Attributes::new())
            .with_attribute("homepage", "https://github.com/google/guava");
        assert!(!resource.is_persisted());
        assert_eq!(
            resource.attribute_str("homepage"),
            Some("https://github.com/google/guava")
        );
    }
}
