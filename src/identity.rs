//! # Identity Resolution
//!
//! The store never hands out ids directly. A persisted resource is named by its
//! `self` link, and its id is the trailing path segment of that href:
//!
//! ```text
//! http://host/api/components/abcd1234  ->  abcd1234
//! ```
//!
//! [`resolve`] performs that extraction and [`href_for`] is its inverse, used
//! when links have to be rebuilt from known ids.

use crate::error::ReconcileError;
use crate::model::{Envelope, PersistedId, ResourceType};

/// Extracts the persisted id from an envelope's self link.
///
/// The id is the text after the last `/` of the href's path, taken as is: no
/// case folding, no percent-decoding, no trimming of slashes or query strings.
///
/// # Errors
/// [`ReconcileError::IdentityMissing`] when there is no self link or the text
/// after its last `/` is empty. A persisted resource always has one, so this is a
/// contract violation by the store, not a missing value.
pub fn resolve(envelope: &Envelope) -> Result<PersistedId, ReconcileError> {
    let link = envelope
        .self_link()
        .ok_or_else(|| ReconcileError::IdentityMissing("envelope has no self link".into()))?;

    last_path_segment(&link.href)
        .map(PersistedId::from)
        .ok_or_else(|| {
            ReconcileError::IdentityMissing(format!("self link has no id segment: {}", link.href))
        })
}

/// Rebuilds the self href of a resource from its id.
pub fn href_for(base_url: &str, kind: ResourceType, id: &PersistedId) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        kind.collection(),
        id
    )
}

fn last_path_segment(href: &str) -> Option<&str> {
    // Skip scheme and authority so "http://host" does not yield "host".
    let path = match href.find("://") {
        Some(start) => {
            let rest = &href[start + 3..];
            &rest[rest.find('/')?..]
        }
        None => href,
    };
    path.rsplit('/').next().filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, LinkSet};

    fn envelope_with(links: LinkSet) -> Envelope {
        Envelope::new(Attributes::new(), links)
    }

    #[test]
    fn test_resolve_takes_last_segment() {
        let envelope = envelope_with(LinkSet::with_self("http://host/api/components/abcd1234"));
        assert_eq!(resolve(&envelope).unwrap(), PersistedId::from("abcd1234"));
    }

    #[test]
    fn test_resolve_without_self_link() {
        let mut links = LinkSet::default();
        links.push("sw360:releases", "http://host/api/releases/r1");
        let result = resolve(&envelope_with(links));
        assert!(matches!(result, Err(ReconcileError::IdentityMissing(_))));
    }

    #[test]
    fn test_resolve_uses_self_among_other_links() {
        let mut links = LinkSet::default();
        links.push("curies", "http://host/docs/{rel}");
        links.push("self", "http://host/api/projects/p-7");
        assert_eq!(
            resolve(&envelope_with(links)).unwrap(),
            PersistedId::from("p-7")
        );
    }

    #[test]
    fn test_resolve_applies_no_normalization() {
        let envelope = envelope_with(LinkSet::with_self("http://host/api/releases/AbC%20d"));
        assert_eq!(resolve(&envelope).unwrap(), PersistedId::from("AbC%20d"));
    }

    #[test]
    fn test_resolve_trailing_slash_has_no_id() {
        let envelope = envelope_with(LinkSet::with_self("http://host/api/releases/r9/"));
        assert!(matches!(
            resolve(&envelope),
            Err(ReconcileError::IdentityMissing(_))
        ));
    }

    #[test]
    fn test_resolve_keeps_segment_verbatim() {
        let envelope = envelope_with(LinkSet::with_self("http://host/api/releases/r9?embed=true"));
        assert_eq!(resolve(&envelope).unwrap(), PersistedId::from("r9?embed=true"));
    }

    #[test]
    fn test_resolve_rejects_authority_without_path() {
        let envelope = envelope_with(LinkSet::with_self("http://host"));
        assert!(matches!(
            resolve(&envelope),
            Err(ReconcileError::IdentityMissing(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_bare_authority() {
        let envelope = envelope_with(LinkSet::with_self("http://host/"));
        assert!(matches!(
            resolve(&envelope),
            Err(ReconcileError::IdentityMissing(_))
        ));
    }

    #[test]
    fn test_href_for_round_trips_through_resolve() {
        let id = PersistedId::from("r1");
        let href = href_for("http://host/api/", ResourceType::Release, &id);
        assert_eq!(href, "http://host/api/releases/r1");
        assert_eq!(resolve(&envelope_with(LinkSet::with_self(href))).unwrap(), id);
    }
}
