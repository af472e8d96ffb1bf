//! Reconcile phases, in pipeline order

mod admin_server;
mod bootstrap;
mod compute;
mod config;
mod edge;
mod metadata;
mod readiness;
mod scale;
mod services;
mod storage;

pub use admin_server::AdminServerPhase;
pub use bootstrap::{ComputeBootstrap, StorageBootstrap};
pub use compute::ComputeTier;
pub use config::ConfigPhase;
pub use edge::EdgeComponents;
pub use metadata::MetadataTier;
pub use readiness::Readiness;
pub use scale::ScaleController;
pub use services::ServicesPhase;
pub use storage::{recommended_replication_factor, validate_scale, StorageTier};

use super::{ClusterState, Context, Outcome, Phase};
use crate::client;
use crate::config::Component;
use crate::error::{OperatorError, Result};
use crate::resources;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};

/// The standard pipeline.
pub fn pipeline() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(ConfigPhase),
        Box::new(ServicesPhase),
        Box::new(MetadataTier),
        Box::new(AdminServerPhase),
        Box::new(StorageTier),
        Box::new(StorageBootstrap),
        Box::new(ScaleController),
        Box::new(ComputeTier),
        Box::new(ComputeBootstrap),
        Box::new(EdgeComponents),
        Box::new(Readiness),
    ]
}

async fn live_statefulset(ctx: &Context, state: &ClusterState, component: Component) -> Result<StatefulSet> {
    let name = resources::resource_name(&state.cluster, component);
    client::get::<StatefulSet>(ctx.client.as_ref(), &state.namespace(), &name)
        .await?
        .ok_or_else(|| OperatorError::NotFound(format!("StatefulSet {}", name)))
}

async fn live_deployment(ctx: &Context, state: &ClusterState, component: Component) -> Result<Deployment> {
    let name = resources::resource_name(&state.cluster, component);
    client::get::<Deployment>(ctx.client.as_ref(), &state.namespace(), &name)
        .await?
        .ok_or_else(|| OperatorError::NotFound(format!("Deployment {}", name)))
}

fn pods_not_ready(ctx: &Context, component: Component, (desired, ready, _): (i32, i32, i32)) -> Outcome {
    Outcome::wait(
        format!("{} pods not ready ({}/{} ready)", component, ready, desired),
        ctx.config.wait_delay,
    )
}
