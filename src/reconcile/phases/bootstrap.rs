//! One-time administrative bootstrap of the storage and compute tiers
//!
//! Each tier's `<Tier>Ready` condition is the idempotency guard: it is
//! persisted right after the admin call succeeds, and once it is true the
//! phase does nothing. A failed admin call leaves the condition unset and
//! turns into a wait, so the call is retried on a later pass.

use super::{live_statefulset, pods_not_ready, ClusterState, Context, Outcome, Phase};
use super::storage::recommended_replication_factor;
use crate::admin;
use crate::conditions::{
    CONDITION_ADMIN_SERVER_READY, CONDITION_COMPUTE_READY, CONDITION_STORAGE_READY,
    REASON_BOOTSTRAPPED,
};
use crate::config::Component;
use crate::crd::ConditionStatus;
use crate::error::Result;
use crate::events::{self, EventKind};
use crate::resources;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub struct StorageBootstrap;

#[async_trait]
impl Phase for StorageBootstrap {
    fn name(&self) -> &'static str {
        "storage-bootstrap"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        if state.is_true(CONDITION_STORAGE_READY) {
            return Ok(Outcome::Continue);
        }
        if !state.is_true(CONDITION_ADMIN_SERVER_READY) {
            return Ok(Outcome::wait("admin server not ready", ctx.config.wait_delay));
        }

        let live = live_statefulset(ctx, state, Component::Storage).await?;
        let counts = resources::statefulset_counts(&live);
        if !resources::statefulset_ready(&live) {
            return Ok(pods_not_ready(ctx, Component::Storage, counts));
        }

        let factor = recommended_replication_factor(
            state.cluster.spec.config.metadata_replication_factor,
            counts.0,
            ctx.config.max_replication_factor,
        );
        let target = state.admin_target(ctx);
        match ctx
            .admin
            .call_storage(&target, &admin::bootstrap_storage_args(factor))
            .await
        {
            Ok(output) => debug!(cluster = %state.name(), output = %output.trim(), "Storage bootstrap output"),
            Err(err) => {
                warn!(cluster = %state.name(), error = %err, "Storage bootstrap failed");
                return Ok(Outcome::wait(
                    format!("storage bootstrap failed: {}", err),
                    ctx.config.wait_delay,
                ));
            }
        }

        state.status.storage.bootstrapped = true;
        state.status.storage.replication_factor = Some(factor);
        let message = format!("metadata replicated across {} storage nodes", factor);
        state.set_condition(CONDITION_STORAGE_READY, ConditionStatus::True, REASON_BOOTSTRAPPED, &message);
        state.persist_status(ctx).await?;
        info!(cluster = %state.name(), replication_factor = factor, "Storage tier bootstrapped");
        ctx.events
            .publish(&state.cluster, EventKind::Normal, events::REASON_STORAGE_BOOTSTRAPPED, &message)
            .await;
        Ok(Outcome::Continue)
    }
}

pub struct ComputeBootstrap;

#[async_trait]
impl Phase for ComputeBootstrap {
    fn name(&self) -> &'static str {
        "compute-bootstrap"
    }

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome> {
        if state.is_true(CONDITION_COMPUTE_READY) {
            return Ok(Outcome::Continue);
        }

        let live = live_statefulset(ctx, state, Component::Compute).await?;
        if !resources::statefulset_ready(&live) {
            return Ok(pods_not_ready(ctx, Component::Compute, resources::statefulset_counts(&live)));
        }

        let host = resources::pod_dns(&state.cluster, Component::Compute, 0);
        let port = ctx.config.components.compute.primary_port();
        let target = state.admin_target(ctx);
        match ctx
            .admin
            .call_compute(&target, &admin::init_compute_args(&host, port))
            .await
        {
            Ok(output) => debug!(cluster = %state.name(), output = %output.trim(), "Compute init output"),
            Err(err) => {
                warn!(cluster = %state.name(), error = %err, "Compute init failed");
                return Ok(Outcome::wait(
                    format!("compute initialization failed: {}", err),
                    ctx.config.wait_delay,
                ));
            }
        }

        state.status.compute.bootstrapped = true;
        let message = format!("compute cluster initialized through {}:{}", host, port);
        state.set_condition(CONDITION_COMPUTE_READY, ConditionStatus::True, REASON_BOOTSTRAPPED, &message);
        state.persist_status(ctx).await?;
        info!(cluster = %state.name(), "Compute tier initialized");
        ctx.events
            .publish(&state.cluster, EventKind::Normal, events::REASON_COMPUTE_INITIALIZED, &message)
            .await;
        Ok(Outcome::Continue)
    }
}
