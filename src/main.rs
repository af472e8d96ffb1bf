//! Streamline Kubernetes Operator
//!
//! This operator manages tiered Streamline clusters on Kubernetes.
//!
//! ## Usage
//!
//! ```bash
//! # Run the operator (requires kubeconfig)
//! streamline-cluster-operator
//!
//! # Watch a single namespace with debug logging
//! streamline-cluster-operator --namespace streaming --log-level debug
//! ```

use clap::Parser;
use kube::Client;
use std::time::Duration;
use streamline_cluster_operator::{ClusterController, OperatorConfig};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Streamline Kubernetes Operator
#[derive(Parser, Debug)]
#[command(name = "streamline-cluster-operator")]
#[command(version, about = "Kubernetes Operator for tiered Streamline clusters")]
struct Args {
    /// Namespace to watch (empty for all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    namespace: String,

    /// Seconds between resyncs of a cluster that is in sync
    #[arg(long, env = "RESYNC_SECONDS", default_value_t = 60)]
    resync_seconds: u64,

    /// Seconds to wait before retrying a phase that is waiting on pods or nodes
    #[arg(long, env = "WAIT_SECONDS", default_value_t = 10)]
    wait_seconds: u64,

    /// Seconds before a failed reconcile is retried
    #[arg(long, env = "ERROR_BACKOFF_SECONDS", default_value_t = 30)]
    error_backoff_seconds: u64,

    /// Upper bound in seconds for a single admin command
    #[arg(long, env = "ADMIN_TIMEOUT_SECONDS", default_value_t = 30)]
    admin_timeout_seconds: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn operator_config(&self) -> OperatorConfig {
        OperatorConfig {
            resync_period: Duration::from_secs(self.resync_seconds),
            wait_delay: Duration::from_secs(self.wait_seconds),
            error_backoff: Duration::from_secs(self.error_backoff_seconds),
            admin_timeout: Duration::from_secs(self.admin_timeout_seconds),
            ..OperatorConfig::default()
        }
    }

    fn watched_namespace(&self) -> Option<String> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(self.namespace.clone())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Streamline Kubernetes Operator");
    info!(
        "Watching namespace: {}",
        if args.namespace.is_empty() {
            "all"
        } else {
            &args.namespace
        }
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let controller = ClusterController::new(client, args.operator_config(), args.watched_namespace())?;
    let cluster_handle = tokio::spawn(async move {
        if let Err(e) = controller.run().await {
            error!("Cluster controller error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = cluster_handle => {
            if let Err(e) = result {
                error!("Cluster controller task failed: {}", e);
            }
        }
    }

    info!("Streamline Operator shutting down");
    Ok(())
}
