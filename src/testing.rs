//! In-memory collaborators for reconcile tests

use crate::admin::{self, AdminTarget, MaintenanceAction, MetadataNodeStatus, RemoteAdmin};
use crate::client::{self, ResourceClient};
use crate::config::OperatorConfig;
use crate::crd::{ClusterSpec, StreamlineCluster};
use crate::error::{OperatorError, Result};
use crate::events::{EventKind, EventPublisher};
use crate::reconcile::{Context, Driver, PassOutcome};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "streaming";
pub const CLUSTER: &str = "demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Replace,
    ReplaceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

type Key = (String, String, String);

#[derive(Default)]
struct Store {
    objects: BTreeMap<Key, DynamicObject>,
    next_id: u64,
    writes: Vec<Write>,
    pending_conflicts: usize,
    replace_conflicts: Vec<String>,
}

impl Store {
    fn next(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn take_conflict(&mut self, kind: &str, name: &str) -> Result<()> {
        if self.pending_conflicts > 0 {
            self.pending_conflicts -= 1;
            return Err(OperatorError::Conflict(format!(
                "injected conflict on {} {}",
                kind, name
            )));
        }
        Ok(())
    }
}

/// API server stand-in with resourceVersion checks and a write log.
#[derive(Default)]
pub struct InMemoryClient {
    store: Mutex<Store>,
}

fn key(resource: &ApiResource, namespace: &str, name: &str) -> Key {
    (resource.kind.clone(), namespace.to_string(), name.to_string())
}

fn name_of(object: &DynamicObject) -> Result<String> {
    object
        .metadata
        .name
        .clone()
        .ok_or_else(|| OperatorError::InvalidState("object has no name".to_string()))
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.store.lock().unwrap().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.store.lock().unwrap().writes.len()
    }

    /// Fail the next `count` writes with a conflict.
    pub fn fail_next_writes_with_conflict(&self, count: usize) {
        self.store.lock().unwrap().pending_conflicts = count;
    }

    /// Fail the next replace of an object of `kind` with a conflict.
    pub fn fail_next_replace_of(&self, kind: &str) {
        self.store.lock().unwrap().replace_conflicts.push(kind.to_string());
    }

    /// Store an object directly, bypassing the write log.
    pub fn seed<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let resource = client::api_resource::<K>();
        let mut dynamic = client::to_dynamic(object).unwrap();
        let mut store = self.store.lock().unwrap();
        dynamic.metadata.uid = Some(format!("uid-{}", store.next()));
        dynamic.metadata.resource_version = Some(store.next());
        dynamic.metadata.generation = Some(1);
        let k = key(
            &resource,
            dynamic.metadata.namespace.as_deref().unwrap_or_default(),
            dynamic.metadata.name.as_deref().unwrap_or_default(),
        );
        store.objects.insert(k, dynamic);
    }

    pub fn get_typed<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let resource = client::api_resource::<K>();
        let store = self.store.lock().unwrap();
        store
            .objects
            .get(&key(&resource, namespace, name))
            .cloned()
            .map(|o| client::from_dynamic(o).unwrap())
    }

    /// Edit an object as another writer would: bumps resourceVersion, and generation
    /// when the spec changes.
    pub fn edit<K, F>(&self, namespace: &str, name: &str, edit: F)
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
        F: FnOnce(&mut K),
    {
        let resource = client::api_resource::<K>();
        let mut store = self.store.lock().unwrap();
        let k = key(&resource, namespace, name);
        let current = store.objects.get(&k).cloned().expect("object to edit");
        let mut typed: K = client::from_dynamic(current.clone()).unwrap();
        edit(&mut typed);
        let mut updated = client::to_dynamic(&typed).unwrap();
        let generation = current.metadata.generation.unwrap_or(1);
        updated.metadata.generation = if updated.data.get("spec") != current.data.get("spec") {
            Some(generation + 1)
        } else {
            Some(generation)
        };
        updated.metadata.resource_version = Some(store.next());
        store.objects.insert(k, updated);
    }

    fn set_status(&self, kind: &str, name: &str, status: impl FnOnce(&Value) -> Value) {
        let mut store = self.store.lock().unwrap();
        let k = (kind.to_string(), NAMESPACE.to_string(), name.to_string());
        let rv = store.next();
        if let Some(object) = store.objects.get_mut(&k) {
            let new_status = status(&object.data);
            object.data["status"] = new_status;
            object.metadata.resource_version = Some(rv);
        }
    }

    /// Report every StatefulSet and Deployment as fully rolled out.
    pub fn mark_all_ready(&self) {
        let workloads: Vec<(String, String)> = {
            let store = self.store.lock().unwrap();
            store
                .objects
                .keys()
                .filter(|(kind, _, _)| kind == "StatefulSet" || kind == "Deployment")
                .map(|(kind, _, name)| (kind.clone(), name.clone()))
                .collect()
        };
        for (kind, name) in workloads {
            self.mark_ready(&kind, &name);
        }
    }

    pub fn mark_ready(&self, kind: &str, name: &str) {
        let rolled_out = |data: &Value| {
            let replicas = data["spec"]["replicas"].as_i64().unwrap_or(1);
            if kind == "StatefulSet" {
                json!({"replicas": replicas, "readyReplicas": replicas, "currentReplicas": replicas})
            } else {
                json!({"replicas": replicas, "readyReplicas": replicas, "updatedReplicas": replicas})
            }
        };
        self.set_status(kind, name, rolled_out);
    }

    pub fn mark_not_ready(&self, kind: &str, name: &str) {
        self.set_status(kind, name, |data| {
            let replicas = data["spec"]["replicas"].as_i64().unwrap_or(1);
            json!({"replicas": replicas, "readyReplicas": 0, "currentReplicas": replicas, "updatedReplicas": replicas})
        });
    }
}

#[async_trait]
impl ResourceClient for InMemoryClient {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>> {
        let store = self.store.lock().unwrap();
        Ok(store.objects.get(&key(resource, namespace, name)).cloned())
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = name_of(object)?;
        let mut store = self.store.lock().unwrap();
        store.take_conflict(&resource.kind, &name)?;
        let k = key(resource, namespace, &name);
        if store.objects.contains_key(&k) {
            return Err(OperatorError::Conflict(format!("{} {} already exists", resource.kind, name)));
        }
        let mut created = object.clone();
        created.metadata.uid = Some(format!("uid-{}", store.next()));
        created.metadata.resource_version = Some(store.next());
        created.metadata.generation = Some(1);
        if let Some(data) = created.data.as_object_mut() {
            data.remove("status");
        }
        store.objects.insert(k, created.clone());
        store.writes.push(Write {
            verb: Verb::Create,
            kind: resource.kind.clone(),
            name,
        });
        Ok(created)
    }

    async fn replace(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = name_of(object)?;
        let mut store = self.store.lock().unwrap();
        store.take_conflict(&resource.kind, &name)?;
        if let Some(pos) = store.replace_conflicts.iter().position(|k| *k == resource.kind) {
            store.replace_conflicts.remove(pos);
            return Err(OperatorError::Conflict(format!("{} {} was modified", resource.kind, name)));
        }
        let k = key(resource, namespace, &name);
        let current = store
            .objects
            .get(&k)
            .cloned()
            .ok_or_else(|| OperatorError::NotFound(format!("{} {}", resource.kind, name)))?;
        if object.metadata.resource_version != current.metadata.resource_version {
            return Err(OperatorError::Conflict(format!("{} {} was modified", resource.kind, name)));
        }

        let mut replaced = object.clone();
        replaced.metadata.uid = current.metadata.uid.clone();
        replaced.metadata.resource_version = Some(store.next());
        replaced.metadata.generation = Some(current.metadata.generation.unwrap_or(1) + 1);
        if let Some(data) = replaced.data.as_object_mut() {
            match current.data.get("status") {
                Some(status) => {
                    data.insert("status".to_string(), status.clone());
                }
                None => {
                    data.remove("status");
                }
            }
        }
        store.objects.insert(k, replaced.clone());
        store.writes.push(Write {
            verb: Verb::Replace,
            kind: resource.kind.clone(),
            name,
        });
        Ok(replaced)
    }

    async fn replace_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = name_of(object)?;
        let mut store = self.store.lock().unwrap();
        store.take_conflict(&resource.kind, &name)?;
        let k = key(resource, namespace, &name);
        let mut current = store
            .objects
            .get(&k)
            .cloned()
            .ok_or_else(|| OperatorError::NotFound(format!("{} {}", resource.kind, name)))?;
        if object.metadata.resource_version != current.metadata.resource_version {
            return Err(OperatorError::Conflict(format!("{} {} was modified", resource.kind, name)));
        }

        current.data["status"] = object.data.get("status").cloned().unwrap_or(Value::Null);
        current.metadata.resource_version = Some(store.next());
        store.objects.insert(k, current.clone());
        store.writes.push(Write {
            verb: Verb::ReplaceStatus,
            kind: resource.kind.clone(),
            name,
        });
        Ok(current)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    Storage(Vec<String>),
    Compute(Vec<String>),
    Maintenance(MaintenanceAction, Vec<String>),
}

struct AdminState {
    calls: Vec<AdminCall>,
    metadata_nodes: BTreeMap<String, MetadataNodeStatus>,
    fail_storage: bool,
    fail_compute: bool,
    fail_maintenance: bool,
}

/// Records admin calls; every call succeeds unless told otherwise.
pub struct FakeAdmin {
    state: Mutex<AdminState>,
}

impl Default for FakeAdmin {
    fn default() -> Self {
        let node = |leader| MetadataNodeStatus {
            address: None,
            reachable: true,
            leader,
            error: None,
        };
        Self {
            state: Mutex::new(AdminState {
                calls: Vec::new(),
                metadata_nodes: BTreeMap::from([("1".to_string(), node(true)), ("2".to_string(), node(false))]),
                fail_storage: false,
                fail_compute: false,
                fail_maintenance: false,
            }),
        }
    }
}

impl FakeAdmin {
    pub fn calls(&self) -> Vec<AdminCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn storage_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                AdminCall::Storage(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    pub fn compute_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                AdminCall::Compute(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    /// Node indexes of every drain issued so far.
    pub fn drains(&self) -> Vec<Vec<i32>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                AdminCall::Maintenance(MaintenanceAction::Apply, args) => {
                    Some(admin::indexes_in_drain_args(&args))
                }
                _ => None,
            })
            .collect()
    }

    pub fn set_node_reachable(&self, id: &str, reachable: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(node) = state.metadata_nodes.get_mut(id) {
            node.reachable = reachable;
            node.error = (!reachable).then(|| "connection refused".to_string());
        }
    }

    pub fn fail_storage(&self, fail: bool) {
        self.state.lock().unwrap().fail_storage = fail;
    }

    pub fn fail_compute(&self, fail: bool) {
        self.state.lock().unwrap().fail_compute = fail;
    }

    pub fn fail_maintenance(&self, fail: bool) {
        self.state.lock().unwrap().fail_maintenance = fail;
    }
}

#[async_trait]
impl RemoteAdmin for FakeAdmin {
    async fn call_storage(&self, _target: &AdminTarget, args: &[String]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(AdminCall::Storage(args.to_vec()));
        if state.fail_storage {
            return Err(OperatorError::Admin("storage admin unavailable".to_string()));
        }
        Ok("Successfully bootstrapped the cluster".to_string())
    }

    async fn call_compute(&self, _target: &AdminTarget, args: &[String]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(AdminCall::Compute(args.to_vec()));
        if state.fail_compute {
            return Err(OperatorError::Admin("compute admin unavailable".to_string()));
        }
        Ok("Cluster Started".to_string())
    }

    async fn maintenance_storage(
        &self,
        _target: &AdminTarget,
        action: MaintenanceAction,
        args: &[String],
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(AdminCall::Maintenance(action, args.to_vec()));
        if state.fail_maintenance {
            return Err(OperatorError::Admin("maintenance rejected".to_string()));
        }
        Ok(String::new())
    }

    async fn metadata_status(
        &self,
        _target: &AdminTarget,
    ) -> Result<BTreeMap<String, MetadataNodeStatus>> {
        Ok(self.state.lock().unwrap().metadata_nodes.clone())
    }
}

/// Records published events.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(EventKind, String, String)>>,
}

impl RecordingEvents {
    pub fn all(&self) -> Vec<(EventKind, String, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn reasons(&self, kind: EventKind) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, reason, _)| reason)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEvents {
    async fn publish(&self, _cluster: &StreamlineCluster, kind: EventKind, reason: &str, note: &str) {
        self.events
            .lock()
            .unwrap()
            .push((kind, reason.to_string(), note.to_string()));
    }
}

/// A cluster plus fakes wired into a reconcile [`Context`].
pub struct Harness {
    pub client: Arc<InMemoryClient>,
    pub admin: Arc<FakeAdmin>,
    pub events: Arc<RecordingEvents>,
    pub ctx: Context,
    pub driver: Driver,
}

impl Harness {
    pub fn new(spec: ClusterSpec) -> Self {
        Self::with_driver(spec, Driver::new())
    }

    pub fn with_driver(spec: ClusterSpec, driver: Driver) -> Self {
        let client = Arc::new(InMemoryClient::new());
        let admin = Arc::new(FakeAdmin::default());
        let events = Arc::new(RecordingEvents::default());

        let mut cluster = StreamlineCluster::new(CLUSTER, spec);
        cluster.metadata.namespace = Some(NAMESPACE.to_string());
        client.seed(&cluster);

        let ctx = Context {
            client: client.clone(),
            admin: admin.clone(),
            events: events.clone(),
            config: Arc::new(OperatorConfig::default()),
        };
        Self {
            client,
            admin,
            events,
            ctx,
            driver,
        }
    }

    pub fn cluster(&self) -> StreamlineCluster {
        self.client
            .get_typed(NAMESPACE, CLUSTER)
            .expect("cluster is seeded")
    }

    pub fn edit_cluster(&self, edit: impl FnOnce(&mut StreamlineCluster)) {
        self.client.edit(NAMESPACE, CLUSTER, edit);
    }

    /// Run one pass against the latest stored cluster.
    pub async fn pass(&self) -> Result<PassOutcome> {
        self.driver.run(&self.ctx, self.cluster()).await
    }

    /// Alternate passes with marking every workload rolled out until a pass is synced.
    pub async fn converge(&self) {
        for _ in 0..20 {
            if self.pass().await.unwrap() == PassOutcome::Synced {
                return;
            }
            self.client.mark_all_ready();
        }
        panic!("cluster did not converge");
    }
}
