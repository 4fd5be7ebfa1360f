//! Minimum-field checks run before anything is sent to the store.
//!
//! | Type | Name | Version | Other |
//! |------|------|---------|-------|
//! | Component | required | optional | |
//! | Release | required | required | `componentId` |
//! | Project | required | required | |
//!
//! A version, when present, must be well formed: no whitespace, no `/`, no
//! control characters. `name`/`version` attributes, if the caller set them,
//! must agree with the key.

use crate::error::ReconcileError;
use crate::model::{
    Attributes, ResourceRef, ResourceType, NAME_ATTRIBUTE, VERSION_ATTRIBUTE,
};
use serde_json::Value;

/// Attribute linking a release to its owning component.
pub const COMPONENT_ID_ATTRIBUTE: &str = "componentId";

/// Checks that `resource` carries what the store needs to create it.
pub fn validate(resource: &ResourceRef) -> Result<(), ReconcileError> {
    let key = resource.key();

    if key.name.trim().is_empty() {
        return Err(invalid(format!("{} name must not be empty", key.kind)));
    }

    if key.version.is_empty() {
        if key.kind.requires_version() {
            return Err(invalid(format!("{} {} has no version", key.kind, key.name)));
        }
    } else if !is_well_formed_version(&key.version) {
        return Err(invalid(format!(
            "{} {} has malformed version {:?}",
            key.kind, key.name, key.version
        )));
    }

    agrees_with_key(resource.attributes(), NAME_ATTRIBUTE, &key.name)?;
    agrees_with_key(resource.attributes(), VERSION_ATTRIBUTE, &key.version)?;

    if key.kind == ResourceType::Release {
        let component_id = resource
            .attribute_str(COMPONENT_ID_ATTRIBUTE)
            .map(str::trim)
            .unwrap_or_default();
        if component_id.is_empty() {
            return Err(invalid(format!(
                "release {}@{} is not attached to a component",
                key.name, key.version
            )));
        }
    }

    Ok(())
}

/// The attributes sent on create: the desired attributes with `name` and
/// `version` taken from the key.
pub fn create_payload(resource: &ResourceRef) -> Attributes {
    let key = resource.key();
    let mut payload = resource.attributes().clone();
    payload.insert(NAME_ATTRIBUTE.into(), Value::from(key.name.clone()));
    if key.version.is_empty() {
        payload.remove(VERSION_ATTRIBUTE);
    } else {
        payload.insert(VERSION_ATTRIBUTE.into(), Value::from(key.version.clone()));
    }
    payload
}

fn is_well_formed_version(version: &str) -> bool {
    !version
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '/')
}

fn agrees_with_key(attributes: &Attributes, name: &str, expected: &str) -> Result<(), ReconcileError> {
    match attributes.get(name) {
        None => Ok(()),
        Some(Value::String(actual)) if actual == expected => Ok(()),
        Some(other) => Err(invalid(format!(
            "attribute {name} = {other} conflicts with key value {expected:?}"
        ))),
    }
}

fn invalid(reason: String) -> ReconcileError {
    ReconcileError::InvalidResource(reason)
}
