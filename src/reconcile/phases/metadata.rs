//! Metadata-consensus tier and its reachability gate.

use super::{live_statefulset, pods_not_ready, ClusterState, Context, Outcome, Phase};
use crate::conditions::{CONDITION_METADATA_READY, REASON_NODES_REACHABLE};
use crate::config::Component;
use crate::crd::{ConditionStatus, MetadataNode};
use crate::error::Result;
use crate::events::{self, EventKind};
use crate::resources;
use crate::sync;
use async_trait::async_trait;
use tracing::info;

/// Metadata-consensus tier: StatefulSet (unless external) and the reachability gate.
///
/// The tier has no bootstrap command; it is ready once every node reported
/// by the status endpoint is reachable.
pub struct MetadataTier;

#[async_trait]
impl Phase for MetadataTier {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        let external = state.cluster.uses_external_metadata();
        if !external {
            let sts = resources::build_statefulset(
                &state.cluster,
                Component::Metadata,
                &ctx.config,
                &state.config_hash,
            )?;
            sync::sync(ctx.client.as_ref(), &state.cluster, &sts).await?;
        }

        if state.is_true(CONDITION_METADATA_READY) {
            return Ok(Outcome::Continue);
        }

        if !external {
            let live = live_statefulset(ctx, state, Component::Metadata).await?;
            if !resources::statefulset_ready(&live) {
                return Ok(pods_not_ready(ctx, Component::Metadata, resources::statefulset_counts(&live)));
            }
        }

        let target = state.admin_target(ctx);
        let nodes = match ctx.admin.metadata_status(&target).await {
            Ok(nodes) => nodes,
            Err(err) => {
                return Ok(Outcome::wait(
                    format!("metadata status unavailable: {}", err),
                    ctx.config.wait_delay,
                ))
            }
        };
        if nodes.is_empty() {
            return Ok(Outcome::wait("metadata tier reported no nodes", ctx.config.wait_delay));
        }

        let unreachable: Vec<&str> = nodes
            .iter()
            .filter(|(_, node)| !node.reachable)
            .map(|(id, _)| id.as_str())
            .collect();
        if !unreachable.is_empty() {
            return Ok(Outcome::wait(
                format!("metadata nodes not reachable: {}", unreachable.join(", ")),
                ctx.config.wait_delay,
            ));
        }

        state.status.metadata.nodes = nodes
            .into_iter()
            .map(|(id, node)| MetadataNode {
                id,
                address: node.address,
                reachable: node.reachable,
                leader: node.leader,
                error: node.error,
            })
            .collect();
        let message = format!("{} metadata nodes reachable", state.status.metadata.nodes.len());
        state.set_condition(
            CONDITION_METADATA_READY,
            ConditionStatus::True,
            REASON_NODES_REACHABLE,
            &message,
        );
        state.persist_status(ctx).await?;
        info!(cluster = %state.name(), nodes = state.status.metadata.nodes.len(), "Metadata tier ready");
        ctx.events
            .publish(&state.cluster, EventKind::Normal, events::REASON_METADATA_READY, &message)
            .await;
        Ok(Outcome::Continue)
    }
}
