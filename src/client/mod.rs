//! Access to the Kubernetes API for managed resources
//!
//! The reconcile engine talks to the API server through [`ResourceClient`],
//! which works on [`DynamicObject`]s so that it can be shared as a trait
//! object. The typed helpers in this module convert to and from the concrete
//! `k8s-openapi` / CRD types.

mod kube_client;

pub use kube_client::KubeResourceClient;

use crate::error::{OperatorError, Result};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Create/read/update access to namespaced objects.
///
/// Implementations report optimistic-concurrency failures as
/// [`OperatorError::Conflict`] and a missing object on `get` as `Ok(None)`.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>>;

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Replace the object; `metadata.resourceVersion` must match the live object.
    async fn replace(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Replace the status subresource; `metadata.resourceVersion` must match.
    async fn replace_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;
}

/// The [`ApiResource`] for a statically typed resource.
pub fn api_resource<K>() -> ApiResource
where
    K: Resource<DynamicType = ()>,
{
    ApiResource::erase::<K>(&())
}

/// Convert a typed object into a [`DynamicObject`].
pub fn to_dynamic<K: Serialize>(object: &K) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

/// Convert a [`DynamicObject`] back into a typed object.
pub fn from_dynamic<K: DeserializeOwned>(object: DynamicObject) -> Result<K> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

fn namespace_of<K: Resource<DynamicType = ()>>(object: &K) -> Result<String> {
    object.meta().namespace.clone().ok_or_else(|| {
        OperatorError::InvalidState(format!(
            "{} {} has no namespace",
            K::kind(&()),
            object.meta().name.as_deref().unwrap_or("<unnamed>")
        ))
    })
}

pub async fn get<K>(client: &dyn ResourceClient, namespace: &str, name: &str) -> Result<Option<K>>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    match client.get(&api_resource::<K>(), namespace, name).await? {
        Some(object) => Ok(Some(from_dynamic(object)?)),
        None => Ok(None),
    }
}

pub async fn replace_status<K>(client: &dyn ResourceClient, object: &K) -> Result<K>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
{
    let namespace = namespace_of(object)?;
    let replaced = client
        .replace_status(&api_resource::<K>(), &namespace, &to_dynamic(object)?)
        .await?;
    from_dynamic(replaced)
}
