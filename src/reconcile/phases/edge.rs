//! Optional edge components.

use super::{ClusterState, Context, Outcome, Phase};
use crate::conditions::CONDITION_COMPUTE_READY;
use crate::error::Result;
use crate::resources;
use crate::sync;
use async_trait::async_trait;

/// Optional edge components. Nothing is created until the compute tier is ready.
pub struct EdgeComponents;

#[async_trait]
impl Phase for EdgeComponents {
    fn name(&self) -> &'static str {
        "edge"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let components = resources::optional_components(&state.cluster);
        if components.is_empty() {
            return Ok(Outcome::Continue);
        }

        if !state.is_true(CONDITION_COMPUTE_READY) {
            let names: Vec<&str> = components.iter().map(|c| c.as_str()).collect();
            return Ok(Outcome::wait(
                format!("waiting for compute tier before creating {}", names.join(", ")),
                ctx.config.wait_delay,
            ));
        }

        let client = ctx.client.as_ref();
        for component in components {
            let deployment =
                resources::build_deployment(&state.cluster, component, &ctx.config, &state.config_hash)?;
            sync::sync(client, &state.cluster, &deployment).await?;
            let service = resources::build_client_service(&state.cluster, component, &ctx.config);
            sync::sync(client, &state.cluster, &service).await?;
        }
        Ok(Outcome::Continue)
    }
}
