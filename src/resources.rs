//! Managed resource bodies for a StreamlineCluster
//!
//! Pure builders: every function maps the cluster spec plus operator defaults
//! to a desired object. Nothing in here talks to the API server.

use crate::config::{Component, ComponentDefaults, OperatorConfig};
use crate::crd::{ClusterStorage, ComponentSpec, StreamlineCluster};
use crate::error::{OperatorError, Result};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource,
    ObjectFieldSelector, PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec,
    PodTemplateSpec, Probe, ResourceRequirements, Service, ServicePort, ServiceSpec,
    TCPSocketAction, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// Annotations
pub const ANNOTATION_LAST_SPEC: &str = "streamline.io/last-spec-hash";
pub const ANNOTATION_OLD_REPLICAS: &str = "streamline.io/old-replicas";
pub const ANNOTATION_NEW_REPLICAS: &str = "streamline.io/new-replicas";
pub const ANNOTATION_CONFIG_HASH: &str = "streamline.io/config-hash";

pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";

/// Key of the generated configuration inside the cluster ConfigMap.
pub const CONFIG_FILE: &str = "config.json";
const CONFIG_MOUNT_PATH: &str = "/etc/streamline";
const CONTAINER_NAME: &str = "streamline";

/// Object name of a component's workload and client Service.
pub fn resource_name(cluster: &StreamlineCluster, component: Component) -> String {
    format!("{}-{}", cluster.name_any(), component.as_str())
}

pub fn service_name(cluster: &StreamlineCluster, component: Component) -> String {
    resource_name(cluster, component)
}

pub fn headless_service_name(cluster: &StreamlineCluster, component: Component) -> String {
    format!("{}-headless", resource_name(cluster, component))
}

pub fn config_map_name(cluster: &StreamlineCluster) -> String {
    format!("{}-config", cluster.name_any())
}

/// Namespace of the cluster, `default` when unset.
pub fn namespace_of(cluster: &StreamlineCluster) -> String {
    cluster.namespace().unwrap_or_else(|| "default".to_string())
}

/// Stable DNS name of one StatefulSet pod.
pub fn pod_dns(cluster: &StreamlineCluster, component: Component, ordinal: i32) -> String {
    format!(
        "{}-{}.{}.{}.svc",
        resource_name(cluster, component),
        ordinal,
        headless_service_name(cluster, component),
        namespace_of(cluster)
    )
}

/// Base URL of the metadata HTTP endpoint the cluster uses.
pub fn metadata_url(cluster: &StreamlineCluster, config: &OperatorConfig) -> String {
    match &cluster.spec.external_metadata {
        Some(external) => format!("http://{}:{}", external.host, external.port),
        None => format!(
            "http://{}.{}.svc:{}",
            service_name(cluster, Component::Metadata),
            namespace_of(cluster),
            config.components.metadata.primary_port()
        ),
    }
}

/// Spec for a component; `None` for optional components that are not requested.
pub fn component_spec(cluster: &StreamlineCluster, component: Component) -> Option<&ComponentSpec> {
    match component {
        Component::Metadata => Some(&cluster.spec.metadata),
        Component::AdminServer => Some(&cluster.spec.admin_server),
        Component::Storage => Some(&cluster.spec.storage),
        Component::Compute => Some(&cluster.spec.compute),
        Component::Gateway => cluster.spec.gateway.as_ref(),
        Component::Console => cluster.spec.console.as_ref(),
    }
}

/// Desired replica count for a component.
pub fn replicas(cluster: &StreamlineCluster, component: Component, config: &OperatorConfig) -> i32 {
    let default = config.components.get(component).replicas;
    component_spec(cluster, component)
        .map(|spec| StreamlineCluster::replicas_or(spec, default))
        .unwrap_or(default)
}

/// Optional components requested in the spec, in a fixed order.
pub fn optional_components(cluster: &StreamlineCluster) -> Vec<Component> {
    [Component::Gateway, Component::Console]
        .into_iter()
        .filter(|c| component_spec(cluster, *c).is_some())
        .collect()
}

pub fn common_labels(cluster: &StreamlineCluster, component: Component) -> BTreeMap<String, String> {
    let mut labels = pod_selector(cluster, component);
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "streamline-operator".to_string(),
    );
    labels
}

pub fn pod_selector(cluster: &StreamlineCluster, component: Component) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/name".to_string(),
        "streamline".to_string(),
    );
    labels.insert("app.kubernetes.io/instance".to_string(), cluster.name_any());
    labels.insert(LABEL_COMPONENT.to_string(), component.as_str().to_string());
    labels
}

/// The pod selector rendered as a label selector string.
pub fn selector_string(cluster: &StreamlineCluster, component: Component) -> String {
    pod_selector(cluster, component)
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn owner_reference(cluster: &StreamlineCluster) -> OwnerReference {
    OwnerReference {
        api_version: StreamlineCluster::api_version(&()).to_string(),
        kind: StreamlineCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid: cluster.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

fn object_meta(cluster: &StreamlineCluster, name: String, component: Component) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace_of(cluster)),
        labels: Some(common_labels(cluster, component)),
        ..Default::default()
    }
}

/// Generated cluster configuration with the user bootstrap config merged on top.
pub fn cluster_config(cluster: &StreamlineCluster, config: &OperatorConfig) -> Result<Value> {
    let mut generated = json!({
        "cluster": cluster.name_any(),
        "metadata": {
            "url": metadata_url(cluster, config),
        },
        "storage": {
            "shardCount": cluster.spec.config.shard_count,
            "dataPort": config.components.storage.primary_port(),
        },
        "compute": {
            "port": config.components.compute.primary_port(),
        },
    });

    if let Some(raw) = &cluster.spec.config.bootstrap_config {
        let overlay: Value = serde_json::from_str(raw).map_err(|e| {
            OperatorError::Configuration(format!("bootstrapConfig is not valid JSON: {}", e))
        })?;
        if !overlay.is_object() {
            return Err(OperatorError::Configuration(
                "bootstrapConfig must be a JSON object".to_string(),
            ));
        }
        merge_json(&mut generated, overlay);
    }
    Ok(generated)
}

// Objects merge key by key; anything else in the overlay replaces the base.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

pub fn build_config_map(cluster: &StreamlineCluster, config: &OperatorConfig) -> Result<ConfigMap> {
    let rendered = serde_json::to_string_pretty(&cluster_config(cluster, config)?)?;
    let mut meta = object_meta(cluster, config_map_name(cluster), Component::Metadata);
    if let Some(labels) = meta.labels.as_mut() {
        labels.remove(LABEL_COMPONENT);
    }
    Ok(ConfigMap {
        metadata: meta,
        data: Some(BTreeMap::from([(CONFIG_FILE.to_string(), rendered)])),
        ..Default::default()
    })
}

/// Short digest of the ConfigMap data, stamped on pod templates.
pub fn config_hash(config_map: &ConfigMap) -> String {
    let mut hasher = Sha256::new();
    if let Some(data) = &config_map.data {
        for (key, value) in data {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
    }
    hex::encode(hasher.finalize())[..16].to_string()
}

fn build_resource_requirements(spec: &crate::crd::ResourceRequirements) -> ResourceRequirements {
    let mut limits = BTreeMap::new();
    let mut requests = BTreeMap::new();

    if let Some(cpu) = &spec.limits.cpu {
        limits.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &spec.limits.memory {
        limits.insert("memory".to_string(), Quantity(memory.clone()));
    }
    if let Some(cpu) = &spec.requests.cpu {
        requests.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &spec.requests.memory {
        requests.insert("memory".to_string(), Quantity(memory.clone()));
    }

    ResourceRequirements {
        limits: if limits.is_empty() { None } else { Some(limits) },
        requests: if requests.is_empty() { None } else { Some(requests) },
        ..Default::default()
    }
}

fn build_volume_claim_templates(storage: &ClusterStorage) -> Vec<PersistentVolumeClaim> {
    vec![PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some("data".to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(storage.access_modes.clone()),
            storage_class_name: storage.storage_class_name.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(storage.size.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }]
}

fn field_env(name: &str, path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn tcp_probe(port: i32, initial_delay: i32, failure_threshold: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay),
        period_seconds: Some(5),
        timeout_seconds: Some(3),
        failure_threshold: Some(failure_threshold),
        ..Default::default()
    }
}

fn build_container(
    cluster: &StreamlineCluster,
    component: Component,
    spec: &ComponentSpec,
    defaults: &ComponentDefaults,
    config: &OperatorConfig,
) -> Container {
    let mut env = vec![
        field_env("POD_NAME", "metadata.name"),
        field_env("POD_NAMESPACE", "metadata.namespace"),
        EnvVar {
            name: "STREAMLINE_METADATA_URL".to_string(),
            value: Some(metadata_url(cluster, config)),
            ..Default::default()
        },
    ];
    if let Some(data_dir) = defaults.data_dir {
        env.push(EnvVar {
            name: "STREAMLINE_DATA_DIR".to_string(),
            value: Some(data_dir.to_string()),
            ..Default::default()
        });
    }
    env.extend(spec.env.iter().map(|e| EnvVar {
        name: e.name.clone(),
        value: e.value.clone(),
        ..Default::default()
    }));

    let mut mounts = vec![VolumeMount {
        name: "config".to_string(),
        mount_path: CONFIG_MOUNT_PATH.to_string(),
        ..Default::default()
    }];
    if let Some(data_dir) = defaults.data_dir {
        mounts.push(VolumeMount {
            name: "data".to_string(),
            mount_path: data_dir.to_string(),
            ..Default::default()
        });
    }

    let mut args = defaults.args.clone();
    args.extend(spec.args.iter().cloned());

    let port = defaults.primary_port();
    Container {
        name: format!("{}-{}", CONTAINER_NAME, component.as_str()),
        image: Some(cluster.image_for(spec).to_string()),
        image_pull_policy: Some(cluster.spec.image_pull_policy.clone()),
        args: Some(args),
        ports: Some(
            defaults
                .ports
                .iter()
                .map(|p| ContainerPort {
                    name: Some(p.name.to_string()),
                    container_port: p.port,
                    ..Default::default()
                })
                .collect(),
        ),
        env: Some(env),
        resources: Some(build_resource_requirements(&spec.resources)),
        volume_mounts: Some(mounts),
        readiness_probe: Some(tcp_probe(port, 5, 3)),
        liveness_probe: Some(tcp_probe(port, 30, 3)),
        ..Default::default()
    }
}

fn build_pod_template(
    cluster: &StreamlineCluster,
    component: Component,
    spec: &ComponentSpec,
    config: &OperatorConfig,
    config_hash: &str,
) -> PodTemplateSpec {
    let defaults = config.components.get(component);
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(pod_selector(cluster, component)),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_CONFIG_HASH.to_string(),
                config_hash.to_string(),
            )])),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![build_container(cluster, component, spec, defaults, config)],
            node_selector: if spec.node_selector.is_empty() {
                None
            } else {
                Some(spec.node_selector.clone())
            },
            volumes: Some(vec![Volume {
                name: "config".to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(config_map_name(cluster)),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
    }
}

/// StatefulSet for a stateful tier (metadata, storage, compute).
pub fn build_statefulset(
    cluster: &StreamlineCluster,
    component: Component,
    config: &OperatorConfig,
    config_hash: &str,
) -> Result<StatefulSet> {
    let spec = component_spec(cluster, component).ok_or_else(|| {
        OperatorError::InvalidState(format!("component {} is not requested", component))
    })?;
    let defaults = config.components.get(component);
    let volume_claim_templates = defaults
        .data_dir
        .map(|_| build_volume_claim_templates(&spec.storage.clone().unwrap_or_default()));

    Ok(StatefulSet {
        metadata: object_meta(cluster, resource_name(cluster, component), component),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas(cluster, component, config)),
            selector: LabelSelector {
                match_labels: Some(pod_selector(cluster, component)),
                ..Default::default()
            },
            service_name: headless_service_name(cluster, component),
            template: build_pod_template(cluster, component, spec, config, config_hash),
            volume_claim_templates,
            pod_management_policy: Some("Parallel".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Deployment for a stateless component (admin server, gateway, console).
pub fn build_deployment(
    cluster: &StreamlineCluster,
    component: Component,
    config: &OperatorConfig,
    config_hash: &str,
) -> Result<Deployment> {
    let spec = component_spec(cluster, component).ok_or_else(|| {
        OperatorError::InvalidState(format!("component {} is not requested", component))
    })?;
    Ok(Deployment {
        metadata: object_meta(cluster, resource_name(cluster, component), component),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas(cluster, component, config)),
            selector: LabelSelector {
                match_labels: Some(pod_selector(cluster, component)),
                ..Default::default()
            },
            template: build_pod_template(cluster, component, spec, config, config_hash),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn service_ports(defaults: &ComponentDefaults) -> Vec<ServicePort> {
    defaults
        .ports
        .iter()
        .map(|p| ServicePort {
            name: Some(p.name.to_string()),
            port: p.port,
            target_port: Some(IntOrString::Int(p.port)),
            ..Default::default()
        })
        .collect()
}

/// Headless Service giving StatefulSet pods stable DNS names.
pub fn build_headless_service(
    cluster: &StreamlineCluster,
    component: Component,
    config: &OperatorConfig,
) -> Service {
    Service {
        metadata: object_meta(cluster, headless_service_name(cluster, component), component),
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            selector: Some(pod_selector(cluster, component)),
            ports: Some(service_ports(config.components.get(component))),
            publish_not_ready_addresses: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn build_client_service(
    cluster: &StreamlineCluster,
    component: Component,
    config: &OperatorConfig,
) -> Service {
    Service {
        metadata: object_meta(cluster, service_name(cluster, component), component),
        spec: Some(ServiceSpec {
            selector: Some(pod_selector(cluster, component)),
            ports: Some(service_ports(config.components.get(component))),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Replica counters of a workload: `(desired, ready, current_or_updated)`.
pub fn statefulset_counts(sts: &StatefulSet) -> (i32, i32, i32) {
    let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let status = sts.status.as_ref();
    (
        desired,
        status.and_then(|s| s.ready_replicas).unwrap_or(0),
        status.and_then(|s| s.current_replicas).unwrap_or(0),
    )
}

pub fn deployment_counts(deploy: &Deployment) -> (i32, i32, i32) {
    let desired = deploy.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let status = deploy.status.as_ref();
    (
        desired,
        status.and_then(|s| s.ready_replicas).unwrap_or(0),
        status.and_then(|s| s.updated_replicas).unwrap_or(0),
    )
}

/// Fully rolled out: desired == ready == current.
pub fn statefulset_ready(sts: &StatefulSet) -> bool {
    let (desired, ready, current) = statefulset_counts(sts);
    desired == ready && ready == current
}

/// Fully rolled out: desired == ready == updated.
pub fn deployment_ready(deploy: &Deployment) -> bool {
    let (desired, ready, updated) = deployment_counts(deploy);
    desired == ready && ready == updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ClusterSpec, ExternalMetadata};
    use k8s_openapi::api::apps::v1::StatefulSetStatus;

    fn cluster(spec: ClusterSpec) -> StreamlineCluster {
        let mut cluster = StreamlineCluster::new("demo", spec);
        cluster.metadata.namespace = Some("streaming".to_string());
        cluster.metadata.uid = Some("uid-1".to_string());
        cluster
    }

    #[test]
    fn test_names_and_dns() {
        let c = cluster(ClusterSpec::default());
        assert_eq!(resource_name(&c, Component::Storage), "demo-storage");
        assert_eq!(headless_service_name(&c, Component::Compute), "demo-compute-headless");
        assert_eq!(
            pod_dns(&c, Component::Compute, 0),
            "demo-compute-0.demo-compute-headless.streaming.svc"
        );
    }

    #[test]
    fn test_labels_include_component() {
        let c = cluster(ClusterSpec::default());
        let labels = common_labels(&c, Component::Storage);
        assert_eq!(labels.get(LABEL_COMPONENT).map(String::as_str), Some("storage"));
        assert_eq!(labels.get("app.kubernetes.io/instance").map(String::as_str), Some("demo"));
        assert!(!pod_selector(&c, Component::Storage).contains_key("app.kubernetes.io/managed-by"));
    }

    #[test]
    fn test_owner_reference() {
        let owner = owner_reference(&cluster(ClusterSpec::default()));
        assert_eq!(owner.kind, "StreamlineCluster");
        assert_eq!(owner.api_version, "streamline.io/v1alpha1");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn test_bootstrap_config_is_merged() {
        let mut spec = ClusterSpec::default();
        spec.config.bootstrap_config =
            Some(r#"{"storage": {"shardCount": 8}, "retention": "7d"}"#.to_string());
        let value = cluster_config(&cluster(spec), &OperatorConfig::default()).unwrap();
        assert_eq!(value["storage"]["shardCount"], 8);
        assert_eq!(value["storage"]["dataPort"], 4440);
        assert_eq!(value["retention"], "7d");
    }

    #[test]
    fn test_bad_bootstrap_config_is_configuration_error() {
        let mut spec = ClusterSpec::default();
        spec.config.bootstrap_config = Some("{not json".to_string());
        let err = build_config_map(&cluster(spec), &OperatorConfig::default()).unwrap_err();
        assert!(matches!(err, OperatorError::Configuration(_)));

        let mut spec = ClusterSpec::default();
        spec.config.bootstrap_config = Some("[1, 2]".to_string());
        let err = build_config_map(&cluster(spec), &OperatorConfig::default()).unwrap_err();
        assert!(matches!(err, OperatorError::Configuration(_)));
    }

    #[test]
    fn test_external_metadata_url() {
        let spec = ClusterSpec {
            external_metadata: Some(ExternalMetadata {
                host: "meta.shared.svc".to_string(),
                port: 4101,
            }),
            ..Default::default()
        };
        let url = metadata_url(&cluster(spec), &OperatorConfig::default());
        assert_eq!(url, "http://meta.shared.svc:4101");
    }

    #[test]
    fn test_config_hash_changes_with_data() {
        let config = OperatorConfig::default();
        let a = build_config_map(&cluster(ClusterSpec::default()), &config).unwrap();
        let mut spec = ClusterSpec::default();
        spec.config.shard_count = 4;
        let b = build_config_map(&cluster(spec), &config).unwrap();
        assert_eq!(config_hash(&a), config_hash(&a.clone()));
        assert_ne!(config_hash(&a), config_hash(&b));
        assert_eq!(config_hash(&a).len(), 16);
    }

    #[test]
    fn test_storage_statefulset() {
        let mut spec = ClusterSpec::default();
        spec.storage.replicas = Some(5);
        spec.storage.args = vec!["--verbose".to_string()];
        let config = OperatorConfig::default();
        let sts = build_statefulset(&cluster(spec), Component::Storage, &config, "abc").unwrap();
        let sts_spec = sts.spec.unwrap();
        assert_eq!(sts_spec.replicas, Some(5));
        assert_eq!(sts_spec.service_name, "demo-storage-headless");
        assert_eq!(sts_spec.volume_claim_templates.map(|v| v.len()), Some(1));

        let template = sts_spec.template;
        let annotations = template.metadata.unwrap().annotations.unwrap();
        assert_eq!(annotations.get(ANNOTATION_CONFIG_HASH).map(String::as_str), Some("abc"));
        let container = &template.spec.unwrap().containers[0];
        assert_eq!(container.name, "streamline-storage");
        assert_eq!(container.args.as_ref().and_then(|a| a.last()).map(String::as_str), Some("--verbose"));
    }

    #[test]
    fn test_optional_components() {
        let c = cluster(ClusterSpec::default());
        assert!(optional_components(&c).is_empty());
        assert!(build_deployment(&c, Component::Gateway, &OperatorConfig::default(), "x").is_err());

        let spec = ClusterSpec {
            console: Some(ComponentSpec::default()),
            ..Default::default()
        };
        assert_eq!(optional_components(&cluster(spec)), vec![Component::Console]);
    }

    #[test]
    fn test_headless_service() {
        let svc = build_headless_service(
            &cluster(ClusterSpec::default()),
            Component::Metadata,
            &OperatorConfig::default(),
        );
        let spec = svc.spec.unwrap();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.publish_not_ready_addresses, Some(true));
        assert_eq!(spec.ports.unwrap().len(), 2);
    }

    #[test]
    fn test_statefulset_readiness() {
        let mut sts = build_statefulset(
            &cluster(ClusterSpec::default()),
            Component::Storage,
            &OperatorConfig::default(),
            "x",
        )
        .unwrap();
        assert!(!statefulset_ready(&sts));
        sts.status = Some(StatefulSetStatus {
            replicas: 3,
            ready_replicas: Some(3),
            current_replicas: Some(2),
            ..Default::default()
        });
        assert!(!statefulset_ready(&sts));
        if let Some(status) = sts.status.as_mut() {
            status.current_replicas = Some(3);
        }
        assert!(statefulset_ready(&sts));
    }
}
