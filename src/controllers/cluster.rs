//! Cluster Controller
//!
//! Watches StreamlineCluster custom resources and the workloads they own, and
//! runs one reconcile pass per change or requeue.

use crate::admin::ExecAdmin;
use crate::client::KubeResourceClient;
use crate::config::OperatorConfig;
use crate::crd::StreamlineCluster;
use crate::error::{OperatorError, Result};
use crate::events::KubeEventPublisher;
use crate::reconcile::{Context, Driver};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Client, Resource, ResourceExt};
use std::sync::Arc;
use tracing::{error, info, warn};

const CONTROLLER_NAME: &str = "streamline-operator";

/// Shared state handed to every reconcile call
struct ControllerContext {
    ctx: Context,
    driver: Driver,
}

/// Runs the StreamlineCluster reconcile loop
pub struct ClusterController {
    client: Client,
    namespace: Option<String>,
    ctx: Context,
}

impl ClusterController {
    /// Create a controller watching `namespace`, or every namespace when `None`
    pub fn new(client: Client, config: OperatorConfig, namespace: Option<String>) -> Result<Self> {
        let admin = ExecAdmin::new(client.clone(), config.admin_timeout)?;
        let ctx = Context {
            client: Arc::new(KubeResourceClient::new(client.clone(), config.field_manager.clone())),
            admin: Arc::new(admin),
            events: Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME)),
            config: Arc::new(config),
        };
        Ok(Self {
            client,
            namespace,
            ctx,
        })
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// Run the controller until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let clusters: Api<StreamlineCluster> = self.api();
        // Fail fast when the CRD is not installed or RBAC is missing.
        clusters.list(&ListParams::default().limit(1)).await?;

        info!(
            namespace = self.namespace.as_deref().unwrap_or("all"),
            "Starting StreamlineCluster controller"
        );

        let context = Arc::new(ControllerContext {
            ctx: self.ctx.clone(),
            driver: Driver::new(),
        });

        Controller::new(clusters, Config::default())
            .owns(self.api::<StatefulSet>(), Config::default())
            .owns(self.api::<Deployment>(), Config::default())
            .owns(self.api::<Service>(), Config::default())
            .owns(self.api::<ConfigMap>(), Config::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|result| async move {
                match result {
                    Ok((obj, _action)) => {
                        info!(cluster = %obj.name, namespace = ?obj.namespace, "Reconciled cluster");
                    }
                    Err(e) => {
                        warn!("Reconcile loop error: {:?}", e);
                    }
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(
    cluster: Arc<StreamlineCluster>,
    context: Arc<ControllerContext>,
) -> std::result::Result<Action, OperatorError> {
    if cluster.metadata.deletion_timestamp.is_some() {
        // Owned objects are garbage collected through their owner references.
        return Ok(Action::await_change());
    }

    info!(
        cluster = %cluster.name_any(),
        namespace = %cluster.namespace().unwrap_or_default(),
        "Reconciling StreamlineCluster"
    );
    let outcome = context.driver.run(&context.ctx, (*cluster).clone()).await?;
    Ok(outcome.into_action(&context.ctx.config))
}

fn error_policy(
    cluster: Arc<StreamlineCluster>,
    error: &OperatorError,
    context: Arc<ControllerContext>,
) -> Action {
    error!(
        cluster = %cluster.name_any(),
        namespace = %cluster.namespace().unwrap_or_default(),
        error = %error,
        "Reconciliation error"
    );
    Action::requeue(context.ctx.config.error_backoff)
}
