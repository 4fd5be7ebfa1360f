//! # Release Client
//!
//! Reconciles releases. A release is named after its component and must carry
//! the component's id, so the component has to be reconciled first.
use crate::adapter::{ReconciliationAdapter, COMPONENT_ID_ATTRIBUTE};
use crate::clients::catalog_client::CatalogClient;
use crate::error::ReconcileError;
use crate::lifecycle::config::ReconcileConfig;
use crate::model::{Attributes, ResourceKey, ResourceRef, ResourceType};
use crate::transport::ResourceTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Client for release resources.
#[derive(Clone)]
pub struct ReleaseClient {
    inner: ReconciliationAdapter,
}

impl ReleaseClient {
    pub fn new(inner: ReconciliationAdapter) -> Self {
        debug_assert_eq!(inner.kind(), ResourceType::Release);
        Self { inner }
    }

    pub fn from_config(transport: Arc<dyn ResourceTransport>, config: &ReconcileConfig) -> Self {
        Self::new(ReconciliationAdapter::from_config(
            ResourceType::Release,
            transport,
            config,
        ))
    }

    /// Finds or creates `version` of `component`.
    ///
    /// `component` must be a persisted component; its id is stamped on the
    /// release as `componentId`.
    #[instrument(skip(self, component, attributes), fields(component = %component.key()))]
    pub async fn get_or_create_release(
        &self,
        component: &ResourceRef,
        version: &str,
        attributes: Attributes,
    ) -> Result<ResourceRef, ReconcileError> {
        if component.key().kind != ResourceType::Component {
            return Err(ReconcileError::InvalidResource(format!(
                "{} is not a component",
                component.key()
            )));
        }
        let component_id = component.persisted_id().ok_or_else(|| {
            ReconcileError::InvalidResource(format!(
                "component {} must be persisted before its releases",
                component.key().name
            ))
        })?;

        debug!(?attributes, "get_or_create_release called");
        let desired = ResourceRef::new(
            ResourceKey::release(component.key().name.clone(), version),
            attributes,
        )
        .with_attribute(COMPONENT_ID_ATTRIBUTE, Value::from(component_id.as_str()));
        self.inner.get_or_create(desired).await
    }
}

#[async_trait]
impl CatalogClient for ReleaseClient {
    fn adapter(&self) -> &ReconciliationAdapter {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PersistedId;
    use crate::transport::mock::{full, MockTransport, RecordedCall};
    use serde_json::json;

    fn client(mock: &Arc<MockTransport>) -> ReleaseClient {
        ReleaseClient::from_config(mock.clone(), &ReconcileConfig::default())
    }

    #[tokio::test]
    async fn test_release_carries_component_id() {
        let mock = Arc::new(MockTransport::new());
        mock.expect_search("guava").return_ok(vec![]);
        mock.expect_create()
            .return_ok(full(ResourceType::Release, "r1", Attributes::new()));

        let component =
            ResourceRef::persisted("c1", ResourceKey::component("guava"), Attributes::new());
        let release = client(&mock)
            .get_or_create_release(&component, "27.0-jre", Attributes::new())
            .await
            .unwrap();

        assert_eq!(release.persisted_id(), Some(&PersistedId::from("r1")));
        assert_eq!(release.key(), &ResourceKey::release("guava", "27.0-jre"));
        match &mock.calls()[1] {
            RecordedCall::Create { attributes, .. } => {
                assert_eq!(attributes.get(COMPONENT_ID_ATTRIBUTE), Some(&json!("c1")));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unpersisted_component_is_rejected() {
        let mock = Arc::new(MockTransport::new());
        let component = ResourceRef::new(ResourceKey::component("guava"), Attributes::new());

        let result = client(&mock)
            .get_or_create_release(&component, "27", Attributes::new())
            .await;
        assert!(matches!(result, Err(ReconcileError::InvalidResource(_))));
        assert!(mock.calls().is_empty());
    }
}
