//! Hash-gated create/update of managed resources
//!
//! Every desired body is stamped with a content hash under
//! [`ANNOTATION_LAST_SPEC`]. A live object carrying the same hash is left
//! alone, so server-side defaulting never causes an update loop. Arrays are
//! hashed as sets: reordering env vars, ports or args does not change the
//! hash.

use crate::client::{self, ResourceClient};
use crate::crd::StreamlineCluster;
use crate::error::{OperatorError, Result};
use crate::resources::{owner_reference, ANNOTATION_LAST_SPEC};
use kube::api::DynamicObject;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Create `desired` if missing, update it if its content hash changed.
///
/// Returns `true` when the object was created.
pub async fn sync<K>(client: &dyn ResourceClient, owner: &StreamlineCluster, desired: &K) -> Result<bool>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let resource = client::api_resource::<K>();
    let (mut desired, hash) = stamped(desired)?;
    let (namespace, name) = address(&desired)?;

    match client.get(&resource, &namespace, &name).await? {
        None => {
            desired.metadata.owner_references = Some(vec![owner_reference(owner)]);
            client.create(&resource, &namespace, &desired).await?;
            info!(kind = %resource.kind, name = %name, namespace = %namespace, "Created resource");
            Ok(true)
        }
        Some(existing) if stored_hash(&existing) == Some(hash.as_str()) => {
            debug!(kind = %resource.kind, name = %name, "Resource up to date");
            Ok(false)
        }
        Some(existing) => {
            let merged = merge_onto(existing, desired);
            client.replace(&resource, &namespace, &merged).await?;
            info!(kind = %resource.kind, name = %name, namespace = %namespace, "Updated resource");
            Ok(false)
        }
    }
}

/// Create `desired` if missing; otherwise return the live object untouched so
/// the caller can compare before deciding to [`sync`].
pub async fn sync_with_diff<K>(
    client: &dyn ResourceClient,
    owner: &StreamlineCluster,
    desired: &K,
) -> Result<Option<K>>
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
{
    let resource = client::api_resource::<K>();
    let (mut object, _) = stamped(desired)?;
    let (namespace, name) = address(&object)?;

    match client.get(&resource, &namespace, &name).await? {
        Some(existing) => Ok(Some(client::from_dynamic(existing)?)),
        None => {
            object.metadata.owner_references = Some(vec![owner_reference(owner)]);
            client.create(&resource, &namespace, &object).await?;
            info!(kind = %resource.kind, name = %name, namespace = %namespace, "Created resource");
            Ok(None)
        }
    }
}

fn address(object: &DynamicObject) -> Result<(String, String)> {
    match (&object.metadata.namespace, &object.metadata.name) {
        (Some(namespace), Some(name)) => Ok((namespace.clone(), name.clone())),
        _ => Err(OperatorError::InvalidState(
            "managed resource needs a name and namespace".to_string(),
        )),
    }
}

fn stamped<K: Serialize>(desired: &K) -> Result<(DynamicObject, String)> {
    let mut object = client::to_dynamic(desired)?;
    let hash = spec_hash(&object)?;
    object
        .annotations_mut()
        .insert(ANNOTATION_LAST_SPEC.to_string(), hash.clone());
    Ok((object, hash))
}

fn stored_hash(object: &DynamicObject) -> Option<&str> {
    object
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_LAST_SPEC))
        .map(String::as_str)
}

/// Content hash of an object body, ignoring status, server-populated
/// metadata and the hash annotation itself.
pub fn spec_hash<K: Serialize>(object: &K) -> Result<String> {
    let value = strip_noisy(serde_json::to_value(object)?);
    Ok(sha256_hex(canonical(&value).as_bytes()))
}

fn strip_noisy(mut v: Value) -> Value {
    if let Some(meta) = v.get_mut("metadata").and_then(Value::as_object_mut) {
        for field in [
            "managedFields",
            "resourceVersion",
            "generation",
            "creationTimestamp",
            "uid",
            "ownerReferences",
        ] {
            meta.remove(field);
        }
        if let Some(annotations) = meta.get_mut("annotations").and_then(Value::as_object_mut) {
            annotations.remove(ANNOTATION_LAST_SPEC);
            if annotations.is_empty() {
                meta.remove("annotations");
            }
        }
    }
    if let Some(obj) = v.as_object_mut() {
        obj.remove("status");
    }
    v
}

// Keys sorted, array elements sorted by their own canonical form.
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", body)
        }
        Value::Array(items) => {
            let mut parts: Vec<String> = items.iter().map(canonical).collect();
            parts.sort();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// Server-assigned Service fields that a replace must carry over.
const SERVICE_PRESERVED: [&str; 2] = ["clusterIP", "clusterIPs"];

/// Merge desired labels, annotations and body fields onto the live object,
/// keeping its identity, resourceVersion and status.
fn merge_onto(mut existing: DynamicObject, desired: DynamicObject) -> DynamicObject {
    if let Some(labels) = desired.metadata.labels {
        existing.labels_mut().extend(labels);
    }
    if let Some(annotations) = desired.metadata.annotations {
        existing.annotations_mut().extend(annotations);
    }

    let is_service = desired.types.as_ref().is_some_and(|t| t.kind == "Service");
    let preserved: Vec<(&str, Value)> = if is_service {
        SERVICE_PRESERVED
            .iter()
            .filter_map(|field| {
                existing
                    .data
                    .get("spec")
                    .and_then(|spec| spec.get(*field))
                    .map(|v| (*field, v.clone()))
            })
            .collect()
    } else {
        Vec::new()
    };

    if let (Some(target), Value::Object(fields)) = (existing.data.as_object_mut(), desired.data) {
        for (key, value) in fields {
            if key != "status" {
                target.insert(key, value);
            }
        }
    }

    if let Some(spec) = existing.data.get_mut("spec").and_then(Value::as_object_mut) {
        for (field, value) in preserved {
            spec.entry(field.to_string()).or_insert(value);
        }
    }
    existing
}
