//! StreamlineCluster Custom Resource Definition
//!
//! Declares a tiered Streamline deployment: a metadata-consensus tier, a
//! storage tier, a compute tier, the admin server used to drive them, and
//! optional edge components.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// StreamlineCluster is the Schema for the streamlineclusters API
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "streamline.io",
    version = "v1alpha1",
    kind = "StreamlineCluster",
    namespaced,
    status = "ClusterStatus",
    shortname = "slc",
    printcolumn = r#"{"name":"Storage","type":"integer","jsonPath":".spec.storage.replicas"}"#,
    printcolumn = r#"{"name":"Compute","type":"integer","jsonPath":".spec.compute.replicas"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Container image shared by all components unless overridden
    #[serde(default = "default_image")]
    pub image: String,

    /// Image pull policy
    #[serde(default = "default_pull_policy")]
    pub image_pull_policy: String,

    /// Cluster-wide configuration
    #[serde(default)]
    pub config: ClusterConfig,

    /// Use an externally managed metadata store instead of deploying the metadata tier
    #[serde(default)]
    pub external_metadata: Option<ExternalMetadata>,

    /// Metadata-consensus tier
    #[serde(default)]
    pub metadata: ComponentSpec,

    /// Admin server hosting the administrative CLI
    #[serde(default)]
    pub admin_server: ComponentSpec,

    /// Storage tier
    #[serde(default)]
    pub storage: ComponentSpec,

    /// Compute tier
    #[serde(default)]
    pub compute: ComponentSpec,

    /// Optional protocol gateway
    #[serde(default)]
    pub gateway: Option<ComponentSpec>,

    /// Optional web console
    #[serde(default)]
    pub console: Option<ComponentSpec>,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            image: default_image(),
            image_pull_policy: default_pull_policy(),
            config: ClusterConfig::default(),
            external_metadata: None,
            metadata: ComponentSpec::default(),
            admin_server: ComponentSpec::default(),
            storage: ComponentSpec::default(),
            compute: ComponentSpec::default(),
            gateway: None,
            console: None,
        }
    }
}

/// Cluster-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Number of shards per storage node
    #[serde(default = "default_shard_count")]
    pub shard_count: i32,

    /// Requested metadata replication factor for the storage tier
    #[serde(default)]
    pub metadata_replication_factor: Option<i32>,

    /// Raw JSON bootstrap configuration merged into the generated config
    #[serde(default)]
    pub bootstrap_config: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            shard_count: default_shard_count(),
            metadata_replication_factor: None,
            bootstrap_config: None,
        }
    }
}

/// Externally managed metadata store
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetadata {
    /// Host name of the metadata HTTP endpoint
    pub host: String,
    /// Port of the metadata HTTP endpoint
    #[serde(default = "default_metadata_port")]
    pub port: i32,
}

/// Per-component overrides
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Image override
    #[serde(default)]
    pub image: Option<String>,

    /// Replica count; the operator default applies when unset
    #[serde(default)]
    pub replicas: Option<i32>,

    /// Resource requirements for the container
    #[serde(default)]
    pub resources: ResourceRequirements,

    /// Additional environment variables
    #[serde(default)]
    pub env: Vec<EnvVar>,

    /// Additional container arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Persistent storage (stateful tiers only)
    #[serde(default)]
    pub storage: Option<ClusterStorage>,

    /// Node selector for pod placement
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
}

/// Resource requirements for containers
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Resource limits
    #[serde(default)]
    pub limits: ResourceList,
    /// Resource requests
    #[serde(default)]
    pub requests: ResourceList,
}

/// Resource quantities
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct ResourceList {
    /// CPU limit/request (e.g., "500m", "2")
    #[serde(default)]
    pub cpu: Option<String>,
    /// Memory limit/request (e.g., "512Mi", "2Gi")
    #[serde(default)]
    pub memory: Option<String>,
}

/// Storage configuration for a stateful tier
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStorage {
    /// Storage class name for PVCs
    #[serde(default)]
    pub storage_class_name: Option<String>,
    /// Size of the persistent volume (e.g., "10Gi")
    #[serde(default = "default_storage_size")]
    pub size: String,
    /// Access modes for the PVC
    #[serde(default = "default_access_modes")]
    pub access_modes: Vec<String>,
}

impl Default for ClusterStorage {
    fn default() -> Self {
        Self {
            storage_class_name: None,
            size: default_storage_size(),
            access_modes: default_access_modes(),
        }
    }
}

/// Environment variable
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EnvVar {
    /// Environment variable name
    pub name: String,
    /// Environment variable value
    #[serde(default)]
    pub value: Option<String>,
}

/// Status of the StreamlineCluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Current phase of the cluster
    #[serde(default)]
    pub phase: ClusterPhase,
    /// Conditions representing cluster state, most recent transition first
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,
    /// Metadata tier status
    #[serde(default)]
    pub metadata: MetadataStatus,
    /// Storage tier status
    #[serde(default)]
    pub storage: StorageStatus,
    /// Compute tier status
    #[serde(default)]
    pub compute: ComputeStatus,
    /// Last observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// Metadata tier status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataStatus {
    /// Nodes reported by the metadata status endpoint
    #[serde(default)]
    pub nodes: Vec<MetadataNode>,
}

/// A metadata node as last reported
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataNode {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
    pub reachable: bool,
    pub leader: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Storage tier status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    /// Whether the one-time metadata bootstrap has succeeded
    #[serde(default)]
    pub bootstrapped: bool,
    /// Replication factor used for the bootstrap
    #[serde(default)]
    pub replication_factor: Option<i32>,
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
    /// Replica count a resize in progress started from; cleared once it completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling_from: Option<i32>,
}

/// Compute tier status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputeStatus {
    /// Whether the one-time initialization has succeeded
    #[serde(default)]
    pub bootstrapped: bool,
    /// Stable network identities of the compute nodes
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Phase of the cluster lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ClusterPhase {
    /// Tiers are being created
    #[default]
    Pending,
    /// At least one tier has been bootstrapped, the cluster is not ready yet
    Bootstrapping,
    /// The storage tier is being resized
    Scaling,
    /// All components are ready
    Running,
}

/// Status of a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

/// Condition of the cluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Machine-readable reason for the last update
    #[serde(default)]
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Last time the status changed (RFC 3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Generation of the cluster when the status last changed
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl StreamlineCluster {
    /// Replica count for a component, falling back to the supplied default.
    pub fn replicas_or(spec: &ComponentSpec, default: i32) -> i32 {
        spec.replicas.unwrap_or(default)
    }

    /// Image for a component, falling back to the cluster image.
    pub fn image_for<'a>(&'a self, spec: &'a ComponentSpec) -> &'a str {
        spec.image.as_deref().unwrap_or(&self.spec.image)
    }

    /// Whether the metadata tier is supplied externally.
    pub fn uses_external_metadata(&self) -> bool {
        self.spec.external_metadata.is_some()
    }
}

// Default value functions
fn default_image() -> String {
    "ghcr.io/streamlinelabs/streamline:latest".to_string()
}

fn default_pull_policy() -> String {
    "IfNotPresent".to_string()
}

fn default_shard_count() -> i32 {
    1
}

fn default_metadata_port() -> i32 {
    4001
}

fn default_storage_size() -> String {
    "10Gi".to_string()
}

fn default_access_modes() -> Vec<String> {
    vec!["ReadWriteOnce".to_string()]
}
