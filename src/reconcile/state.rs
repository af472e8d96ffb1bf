use super::Context;
use crate::admin::AdminTarget;
use crate::client;
use crate::conditions::{
    ConditionSet, CONDITION_COMPUTE_READY, CONDITION_METADATA_READY, CONDITION_READY,
    CONDITION_STORAGE_READY, CONDITION_STORAGE_UPDATING,
};
use crate::crd::{ClusterPhase, ClusterStatus, ConditionStatus, StreamlineCluster};
use crate::error::Result;
use crate::resources;
use kube::ResourceExt;
use tracing::debug;

/// Working copy of one cluster for the duration of a pass.
///
/// Phases mutate `status` and the condition set; [`ClusterState::persist_status`]
/// writes them back only when they differ from what was last persisted.
pub struct ClusterState {
    pub cluster: StreamlineCluster,
    pub status: ClusterStatus,
    pub conditions: ConditionSet,
    /// Digest of the rendered ConfigMap, stamped on pod templates.
    pub config_hash: String,
    persisted: ClusterStatus,
}

impl ClusterState {
    pub fn new(cluster: StreamlineCluster) -> Self {
        let persisted = cluster.status.clone().unwrap_or_default();
        let generation = cluster.metadata.generation;
        let mut status = persisted.clone();
        status.observed_generation = generation;
        let conditions = ConditionSet::new(persisted.conditions.clone(), generation);
        Self {
            cluster,
            status,
            conditions,
            config_hash: String::new(),
            persisted,
        }
    }

    pub fn name(&self) -> String {
        self.cluster.name_any()
    }

    pub fn namespace(&self) -> String {
        resources::namespace_of(&self.cluster)
    }

    pub fn is_true(&self, condition_type: &str) -> bool {
        self.conditions.is_true(condition_type)
    }

    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        self.conditions.set(condition_type, status, reason, message);
    }

    pub fn admin_target(&self, ctx: &Context) -> AdminTarget {
        AdminTarget::for_cluster(&self.cluster, &ctx.config)
    }

    fn phase(&self) -> ClusterPhase {
        if self.is_true(CONDITION_READY) {
            ClusterPhase::Running
        } else if self.is_true(CONDITION_STORAGE_UPDATING) {
            ClusterPhase::Scaling
        } else if [
            CONDITION_METADATA_READY,
            CONDITION_STORAGE_READY,
            CONDITION_COMPUTE_READY,
        ]
        .iter()
        .any(|c| self.is_true(c))
        {
            ClusterPhase::Bootstrapping
        } else {
            ClusterPhase::Pending
        }
    }

    /// The status as it would be persisted now.
    pub fn snapshot(&self) -> ClusterStatus {
        let mut status = self.status.clone();
        status.conditions = self.conditions.to_vec();
        status.phase = self.phase();
        status
    }

    /// Write the status subresource if it changed. Returns whether a write happened.
    pub async fn persist_status(&mut self, ctx: &Context) -> Result<bool> {
        let snapshot = self.snapshot();
        if snapshot == self.persisted {
            return Ok(false);
        }

        let mut object = self.cluster.clone();
        object.status = Some(snapshot.clone());
        let updated: StreamlineCluster = client::replace_status(ctx.client.as_ref(), &object).await?;
        self.cluster.metadata.resource_version = updated.metadata.resource_version;
        self.cluster.status = Some(snapshot.clone());
        self.persisted = snapshot;
        debug!(cluster = %self.name(), "Persisted cluster status");
        Ok(true)
    }
}
