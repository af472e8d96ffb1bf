//! Controllers for the Streamline cluster operator
//!
//! The cluster controller watches StreamlineCluster resources and the objects
//! they own, and drives each cluster through the reconcile pipeline.

mod cluster;

pub use cluster::ClusterController;
