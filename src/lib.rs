//! Streamline Kubernetes Operator
//!
//! A Kubernetes operator that deploys and manages tiered Streamline clusters:
//! a metadata-consensus tier, a storage tier, a compute tier, the admin
//! server used to bootstrap and drain them, and optional edge components.
//!
//! ## Custom Resources
//!
//! - `StreamlineCluster`: one tiered cluster; each tier becomes a StatefulSet
//!   or Deployment with its Services, sharing a generated ConfigMap
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: streamline.io/v1alpha1
//! kind: StreamlineCluster
//! metadata:
//!   name: my-cluster
//! spec:
//!   storage:
//!     replicas: 3
//!   compute:
//!     replicas: 2
//!   gateway: {}
//! ```

pub mod admin;
pub mod client;
pub mod conditions;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod resources;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::OperatorConfig;
pub use controllers::ClusterController;
pub use crd::{
    ClusterCondition, ClusterConfig, ClusterPhase, ClusterSpec, ClusterStatus, ClusterStorage,
    ComponentSpec, ConditionStatus, ExternalMetadata, ResourceRequirements, StreamlineCluster,
};
pub use error::{OperatorError, Result};
pub use reconcile::{Context, Driver, Outcome, PassOutcome, Phase};
