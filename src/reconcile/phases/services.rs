//! Headless and client Services for the internal tiers.

use super::{ClusterState, Context, Outcome, Phase};
use crate::config::Component;
use crate::error::Result;
use crate::resources;
use crate::sync;
use async_trait::async_trait;

/// Headless and client Services for the internal tiers, client Service for the admin server.
pub struct ServicesPhase;

#[async_trait]
impl Phase for ServicesPhase {
    fn name(&self) -> &'static str {
        "services"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let mut tiers = vec![Component::Storage, Component::Compute];
        if !state.cluster.uses_external_metadata() {
            tiers.insert(0, Component::Metadata);
        }

        let client = ctx.client.as_ref();
        for component in tiers {
            let headless = resources::build_headless_service(&state.cluster, component, &ctx.config);
            sync::sync(client, &state.cluster, &headless).await?;
            let service = resources::build_client_service(&state.cluster, component, &ctx.config);
            sync::sync(client, &state.cluster, &service).await?;
        }

        let admin = resources::build_client_service(&state.cluster, Component::AdminServer, &ctx.config);
        sync::sync(client, &state.cluster, &admin).await?;
        Ok(Outcome::Continue)
    }
}
