//! Custom Resource Definitions for the Streamline cluster operator
//!
//! - StreamlineCluster: a tiered Streamline deployment (metadata, storage,
//!   compute, admin server and optional edge components)

mod cluster;

pub use cluster::{
    ClusterCondition, ClusterConfig, ClusterPhase, ClusterSpec, ClusterStatus, ClusterStorage,
    ComponentSpec, ComputeStatus, ConditionStatus, EnvVar, ExternalMetadata, MetadataNode,
    MetadataStatus, ResourceList, ResourceRequirements, StorageStatus, StreamlineCluster,
};
