use super::{AdminTarget, MaintenanceAction, MetadataNodeStatus, RemoteAdmin};
use crate::error::{OperatorError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

/// Binary invoked inside the admin-server pod.
const ADMIN_CLI: &str = "streamline-admin";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`RemoteAdmin`] that execs the admin CLI in the admin-server pod and reads
/// the metadata status endpoint over HTTP.
#[derive(Clone)]
pub struct ExecAdmin {
    client: Client,
    http: reqwest::Client,
    timeout: Duration,
}

impl ExecAdmin {
    pub fn new(client: Client, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            http,
            timeout,
        })
    }

    async fn admin_pod(&self, target: &AdminTarget) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &target.namespace);
        let list = pods
            .list(&ListParams::default().labels(&target.admin_selector))
            .await?;
        list.items
            .iter()
            .find(|pod| is_running(pod))
            .map(|pod| pod.name_any())
            .ok_or_else(|| {
                OperatorError::Admin(format!(
                    "no running admin-server pod for cluster {}",
                    target.cluster
                ))
            })
    }

    fn command(&self, target: &AdminTarget, tier: &str, args: &[String]) -> Vec<String> {
        let mut command = vec![
            ADMIN_CLI.to_string(),
            "--host".to_string(),
            target.admin_host.clone(),
            "--port".to_string(),
            target.admin_port.to_string(),
            tier.to_string(),
        ];
        command.extend(args.iter().cloned());
        command
    }

    async fn run(&self, target: &AdminTarget, command: Vec<String>) -> Result<String> {
        let pod = self.admin_pod(target).await?;
        debug!(cluster = %target.cluster, pod = %pod, command = ?command, "Running admin command");
        with_timeout(self.timeout, self.exec(&target.namespace, &pod, command)).await
    }

    async fn exec(&self, namespace: &str, pod: &str, command: Vec<String>) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = AttachParams::default().stdout(true).stderr(true);
        let mut attached = pods.exec(pod, command, &params).await?;

        let (stdout, stderr) = tokio::join!(
            read_all(attached.stdout()),
            read_all(attached.stderr())
        );
        let status = match attached.take_status() {
            Some(status) => status.await,
            None => None,
        };
        if let Err(err) = attached.join().await {
            warn!(pod, error = %err, "Exec session did not close cleanly");
        }

        match status {
            Some(status) if status.status.as_deref() != Some("Success") => {
                let detail = if stderr.trim().is_empty() {
                    status.message.unwrap_or_default()
                } else {
                    stderr.trim().to_string()
                };
                Err(OperatorError::Admin(format!(
                    "admin command failed in {}: {}",
                    pod, detail
                )))
            }
            _ => Ok(stdout),
        }
    }
}

fn is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Running")
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(err) = reader.read_to_end(&mut buf).await {
            warn!(error = %err, "Failed to read exec output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn with_timeout<T>(timeout: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        OperatorError::Admin(format!("admin call timed out after {}s", timeout.as_secs()))
    })?
}

#[async_trait]
impl RemoteAdmin for ExecAdmin {
    async fn call_storage(&self, target: &AdminTarget, args: &[String]) -> Result<String> {
        self.run(target, self.command(target, "store", args)).await
    }

    async fn call_compute(&self, target: &AdminTarget, args: &[String]) -> Result<String> {
        self.run(target, self.command(target, "server", args)).await
    }

    async fn maintenance_storage(
        &self,
        target: &AdminTarget,
        action: MaintenanceAction,
        args: &[String],
    ) -> Result<String> {
        let mut full = vec!["maintenance".to_string(), action.as_str().to_string()];
        full.extend(args.iter().cloned());
        self.run(target, self.command(target, "store", &full)).await
    }

    async fn metadata_status(
        &self,
        target: &AdminTarget,
    ) -> Result<BTreeMap<String, MetadataNodeStatus>> {
        let url = format!("{}/nodes", target.metadata_url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OperatorError::Admin(format!(
                "metadata status endpoint {} returned {}: {}",
                url, status, body
            )));
        }
        Ok(response.json().await?)
    }
}
