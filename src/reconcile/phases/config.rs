//! Generated configuration shared by every tier.

use super::{ClusterState, Context, Outcome, Phase};
use crate::error::Result;
use crate::resources;
use crate::sync;
use async_trait::async_trait;

/// Renders the cluster ConfigMap and records its digest for the pod templates.
pub struct ConfigPhase;

#[async_trait]
impl Phase for ConfigPhase {
    fn name(&self) -> &'static str {
        "config"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let config_map = resources::build_config_map(&state.cluster, &ctx.config)?;
        state.config_hash = resources::config_hash(&config_map);
        sync::sync(ctx.client.as_ref(), &state.cluster, &config_map).await?;
        Ok(Outcome::Continue)
    }
}
