//! Compute tier StatefulSet.

use super::{ClusterState, Context, Outcome, Phase};
use crate::config::Component;
use crate::error::Result;
use crate::resources;
use crate::sync;
use async_trait::async_trait;

/// Compute tier StatefulSet and its node identities.
pub struct ComputeTier;

#[async_trait]
impl Phase for ComputeTier {
    fn name(&self) -> &'static str {
        "compute"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let sts = resources::build_statefulset(
            &state.cluster,
            Component::Compute,
            &ctx.config,
            &state.config_hash,
        )?;
        sync::sync(ctx.client.as_ref(), &state.cluster, &sts).await?;

        let replicas = resources::replicas(&state.cluster, Component::Compute, &ctx.config);
        state.status.compute.nodes = (0..replicas)
            .map(|i| resources::pod_dns(&state.cluster, Component::Compute, i))
            .collect();
        Ok(Outcome::Continue)
    }
}
