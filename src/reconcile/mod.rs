//! The reconcile engine
//!
//! One pass runs a fixed, ordered list of [`Phase`]s against a
//! [`ClusterState`]. Each phase returns an [`Outcome`]:
//!
//! - `Continue`: move on to the next phase.
//! - `Deferred`: move on, but the pass is incomplete and is re-run right away.
//! - `Wait`: stop the pass and retry after the given delay.
//! - `Err`: stop the pass; the controller's error policy applies backoff.
//!
//! Optimistic-concurrency conflicts are not errors: they become a short wait.

pub mod phases;
mod state;

pub use state::ClusterState;

use crate::admin::RemoteAdmin;
use crate::client::ResourceClient;
use crate::conditions::CONDITION_READY;
use crate::config::OperatorConfig;
use crate::crd::StreamlineCluster;
use crate::error::Result;
use crate::events::{self, EventKind, EventPublisher};
use async_trait::async_trait;
use kube::runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every phase of every pass.
#[derive(Clone)]
pub struct Context {
    pub client: Arc<dyn ResourceClient>,
    pub admin: Arc<dyn RemoteAdmin>,
    pub events: Arc<dyn EventPublisher>,
    pub config: Arc<OperatorConfig>,
}

/// Result of a single phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Wait { message: String, delay: Duration },
    Deferred,
}

impl Outcome {
    pub fn wait(message: impl Into<String>, delay: Duration) -> Self {
        Outcome::Wait {
            message: message.into(),
            delay,
        }
    }
}

/// Result of a whole pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every phase continued; check again after the resync period.
    Synced,
    /// A phase is waiting on pods, a remote node or a conflicting writer.
    Waiting { message: String, delay: Duration },
    /// At least one phase deferred; run again immediately.
    Incomplete,
}

impl PassOutcome {
    pub fn requeue_after(&self, config: &OperatorConfig) -> Duration {
        match self {
            PassOutcome::Synced => config.resync_period,
            PassOutcome::Waiting { delay, .. } => *delay,
            PassOutcome::Incomplete => config.incomplete_delay,
        }
    }

    pub fn into_action(self, config: &OperatorConfig) -> Action {
        Action::requeue(self.requeue_after(config))
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    async fn reconcile(&self, ctx: &Context, state: &mut ClusterState) -> Result<Outcome>;
}

/// Runs the phase pipeline for one cluster.
pub struct Driver {
    phases: Vec<Box<dyn Phase>>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    /// Driver with the standard pipeline.
    pub fn new() -> Self {
        Self::with_phases(phases::pipeline())
    }

    pub fn with_phases(phases: Vec<Box<dyn Phase>>) -> Self {
        Self { phases }
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    /// Run one pass against `cluster` as last observed.
    pub async fn run(&self, ctx: &Context, cluster: StreamlineCluster) -> Result<PassOutcome> {
        let mut state = ClusterState::new(cluster);
        match self.run_phases(ctx, &mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_conflict() => {
                warn!(
                    cluster = %state.name(),
                    namespace = %state.namespace(),
                    error = %err,
                    "Conflict during reconcile, retrying"
                );
                ctx.events
                    .publish(&state.cluster, EventKind::Warning, events::REASON_CONFLICT, &err.to_string())
                    .await;
                Ok(PassOutcome::Waiting {
                    message: err.to_string(),
                    delay: ctx.config.conflict_delay,
                })
            }
            Err(err) => {
                error!(
                    cluster = %state.name(),
                    namespace = %state.namespace(),
                    error = %err,
                    "Reconcile failed"
                );
                ctx.events
                    .publish(
                        &state.cluster,
                        EventKind::Warning,
                        events::REASON_RECONCILE_FAILED,
                        &err.to_string(),
                    )
                    .await;
                Err(err)
            }
        }
    }

    async fn run_phases(&self, ctx: &Context, state: &mut ClusterState) -> Result<PassOutcome> {
        let mut incomplete = false;
        for phase in &self.phases {
            match phase.reconcile(ctx, state).await? {
                Outcome::Continue => {}
                Outcome::Deferred => {
                    debug!(cluster = %state.name(), phase = phase.name(), "Phase deferred");
                    let note = state
                        .conditions
                        .get(CONDITION_READY)
                        .map(|c| c.message.clone())
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| format!("{} phase incomplete", phase.name()));
                    ctx.events
                        .publish(&state.cluster, EventKind::Normal, events::REASON_NOT_READY, &note)
                        .await;
                    incomplete = true;
                }
                Outcome::Wait { message, delay } => {
                    info!(
                        cluster = %state.name(),
                        namespace = %state.namespace(),
                        phase = phase.name(),
                        delay_secs = delay.as_secs(),
                        "{}",
                        message
                    );
                    ctx.events
                        .publish(&state.cluster, EventKind::Warning, events::REASON_WAITING, &message)
                        .await;
                    state.persist_status(ctx).await?;
                    return Ok(PassOutcome::Waiting { message, delay });
                }
            }
        }

        state.persist_status(ctx).await?;
        if incomplete {
            Ok(PassOutcome::Incomplete)
        } else {
            debug!(cluster = %state.name(), "Cluster in sync");
            Ok(PassOutcome::Synced)
        }
    }
}
