use super::ResourceClient;
use crate::error::{OperatorError, Result};
use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, PostParams};
use kube::{Client, ResourceExt};

/// [`ResourceClient`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    field_manager: String,
}

impl KubeResourceClient {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        }
    }
}

fn object_name(object: &DynamicObject) -> Result<String> {
    object
        .metadata
        .name
        .clone()
        .ok_or_else(|| OperatorError::InvalidState("object has no name".to_string()))
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        Ok(self.api(resource, namespace).get_opt(name).await?)
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        tracing::debug!(kind = %resource.kind, name = %object.name_any(), namespace, "Creating object");
        Ok(self
            .api(resource, namespace)
            .create(&self.post_params(), object)
            .await?)
    }

    async fn replace(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object_name(object)?;
        tracing::debug!(kind = %resource.kind, name = %name, namespace, "Replacing object");
        Ok(self
            .api(resource, namespace)
            .replace(&name, &self.post_params(), object)
            .await?)
    }

    async fn replace_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object_name(object)?;
        let body = serde_json::to_vec(object)?;
        Ok(self
            .api(resource, namespace)
            .replace_status(&name, &self.post_params(), body)
            .await?)
    }
}
