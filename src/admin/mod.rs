//! Remote administration of running cluster nodes
//!
//! Bootstrap, initialization and drain are one-shot administrative commands
//! issued against a live cluster. The engine only depends on the
//! [`RemoteAdmin`] contract; [`ExecAdmin`] implements it by running the admin
//! CLI inside the admin-server pod and by polling the metadata tier's HTTP
//! status endpoint.

mod exec;

pub use exec::ExecAdmin;

use crate::config::{Component, OperatorConfig};
use crate::crd::StreamlineCluster;
use crate::error::Result;
use crate::resources;
use async_trait::async_trait;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where admin operations for one cluster are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminTarget {
    pub cluster: String,
    pub namespace: String,
    /// Label selector matching the admin-server pods.
    pub admin_selector: String,
    /// Admin server address passed to the CLI.
    pub admin_host: String,
    pub admin_port: i32,
    /// Base URL of the metadata HTTP endpoint.
    pub metadata_url: String,
}

impl AdminTarget {
    pub fn for_cluster(cluster: &StreamlineCluster, config: &OperatorConfig) -> Self {
        let namespace = resources::namespace_of(cluster);
        Self {
            cluster: cluster.name_any(),
            admin_selector: resources::selector_string(cluster, Component::AdminServer),
            admin_host: format!(
                "{}.{}.svc",
                resources::service_name(cluster, Component::AdminServer),
                namespace
            ),
            admin_port: config.components.admin_server.primary_port(),
            metadata_url: resources::metadata_url(cluster, config),
            namespace,
        }
    }
}

/// Maintenance actions the operator issues against the storage tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceAction {
    Apply,
}

impl MaintenanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceAction::Apply => "apply",
        }
    }
}

/// One metadata node as reported by the metadata status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataNodeStatus {
    #[serde(default, alias = "api_addr")]
    pub address: Option<String>,
    #[serde(default)]
    pub reachable: bool,
    #[serde(default)]
    pub leader: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Administrative operations against a running cluster.
#[async_trait]
pub trait RemoteAdmin: Send + Sync {
    /// Run a storage-tier admin command and return its output.
    async fn call_storage(&self, target: &AdminTarget, args: &[String]) -> Result<String>;

    /// Run a compute-tier admin command and return its output.
    async fn call_compute(&self, target: &AdminTarget, args: &[String]) -> Result<String>;

    /// Run a storage maintenance command (e.g. drain).
    async fn maintenance_storage(
        &self,
        target: &AdminTarget,
        action: MaintenanceAction,
        args: &[String],
    ) -> Result<String>;

    /// Node map reported by the metadata tier, keyed by node id.
    async fn metadata_status(
        &self,
        target: &AdminTarget,
    ) -> Result<BTreeMap<String, MetadataNodeStatus>>;
}

/// Arguments for the one-time storage metadata bootstrap.
pub fn bootstrap_storage_args(replication_factor: i32) -> Vec<String> {
    vec![
        "nodes-config".to_string(),
        "bootstrap".to_string(),
        "--metadata-replicate-across".to_string(),
        format!("node:{}", replication_factor),
    ]
}

/// Arguments for the one-time compute initialization against `host:port`.
pub fn init_compute_args(host: &str, port: i32) -> Vec<String> {
    vec![
        "--host".to_string(),
        host.to_string(),
        "--port".to_string(),
        port.to_string(),
        "init".to_string(),
    ]
}

/// Arguments draining the given storage node indexes.
pub fn drain_args(indexes: &[i32]) -> Vec<String> {
    let mut args = vec![
        "--shard-target-state".to_string(),
        "drained".to_string(),
    ];
    for index in indexes {
        args.push("--node-indexes".to_string());
        args.push(index.to_string());
    }
    args
}

/// Node indexes named in drain arguments.
#[cfg(test)]
pub fn indexes_in_drain_args(args: &[String]) -> Vec<i32> {
    args.windows(2)
        .filter(|pair| pair[0] == "--node-indexes")
        .filter_map(|pair| pair[1].parse().ok())
        .collect()
}
