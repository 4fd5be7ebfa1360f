//! Wire-level resource representation: attributes plus named hyperlinks.

use crate::model::Attributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relation name of the link a resource carries to itself.
pub const SELF_REL: &str = "self";

/// One `(relation, href)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Ordered collection of links attached to an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet(Vec<Link>);

impl LinkSet {
    /// A link set holding only a self link.
    pub fn with_self(href: impl Into<String>) -> Self {
        let mut links = Self::default();
        links.push(SELF_REL, href);
        links
    }

    pub fn push(&mut self, rel: impl Into<String>, href: impl Into<String>) {
        self.0.push(Link {
            rel: rel.into(),
            href: href.into(),
        });
    }

    /// First link with the given relation name.
    pub fn find(&self, rel: &str) -> Option<&Link> {
        self.0.iter().find(|link| link.rel == rel)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A resource as returned by the transport.
///
/// Search results are *sparse* (name, version and a self link); get and create
/// return *full* envelopes. Nothing beyond name and version should be read from
/// a sparse one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attributes: Attributes,
    #[serde(rename = "_links")]
    pub links: LinkSet,
}

impl Envelope {
    pub fn new(attributes: Attributes, links: LinkSet) -> Self {
        Self { attributes, links }
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// The self link, if the envelope carries one.
    pub fn self_link(&self) -> Option<&Link> {
        self.links.find(SELF_REL)
    }
}
