//! Kubernetes-backed collaborators.
//!
//! `Scaler` objects are read with a plain GET and their status is written
//! through the status subresource with a JSON merge patch. Deployments are
//! scaled with a merge patch that carries the `resourceVersion` they were
//! read at, so a concurrent writer turns the update into a 409 instead of
//! being overwritten silently.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use kube::api::{Api, Patch, PatchParams};
use serde_json::{Value, json};
use tracing::debug;

use hourscale_state::{
    PolicyClient, PolicyRef, PolicyStatus, ScalingPolicy, StoreError, StoreResult, WorkloadRef,
    WorkloadState, WorkloadStore,
};

use crate::crd::{Scaler, ScalerPhase};

/// Replica count Kubernetes assumes when `spec.replicas` is unset.
const DEFAULT_DEPLOYMENT_REPLICAS: i32 = 1;

/// Map a kube client error onto a collaborator error kind.
fn store_error(err: kube::Error, what: &str) -> StoreError {
    match err {
        kube::Error::Api(resp) => classify_status(resp.code, what, &resp.message),
        other => StoreError::Transport(format!("{what}: {other}")),
    }
}

/// Map an API server status code onto a collaborator error kind.
pub fn classify_status(code: u16, what: &str, message: &str) -> StoreError {
    match code {
        404 => StoreError::NotFound(format!("{what}: {message}")),
        409 => StoreError::Conflict(format!("{what}: {message}")),
        _ => StoreError::Transport(format!("{what}: {code} {message}")),
    }
}

/// Merge patch body recording `status` on a `Scaler`.
pub fn status_patch(status: PolicyStatus) -> Value {
    json!({ "status": { "status": ScalerPhase::from_status(status) } })
}

/// Merge patch body setting replicas, conditioned on `resource_version`.
pub fn replicas_patch(resource_version: Option<&str>, replicas: i32) -> Value {
    match resource_version {
        Some(rv) => json!({
            "metadata": { "resourceVersion": rv },
            "spec": { "replicas": replicas }
        }),
        None => json!({ "spec": { "replicas": replicas } }),
    }
}

/// The reconciler's view of a Deployment.
pub fn workload_state(workload: &WorkloadRef, deployment: &Deployment) -> WorkloadState {
    WorkloadState {
        reference: workload.clone(),
        replicas: deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(DEFAULT_DEPLOYMENT_REPLICAS),
        resource_version: deployment.metadata.resource_version.clone(),
    }
}

// ── Policies ──────────────────────────────────────────────────────

/// [`PolicyClient`] over `Scaler` custom resources.
#[derive(Clone)]
pub struct KubePolicyClient {
    client: Client,
}

impl KubePolicyClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, policy: &PolicyRef) -> Api<Scaler> {
        Api::namespaced(self.client.clone(), &policy.namespace)
    }
}

#[async_trait]
impl PolicyClient for KubePolicyClient {
    async fn get(&self, policy: &PolicyRef) -> StoreResult<ScalingPolicy> {
        let scaler = self
            .api(policy)
            .get(&policy.name)
            .await
            .map_err(|e| store_error(e, &format!("scaler {policy}")))?;
        Ok(scaler.to_policy())
    }

    async fn update_status(&self, policy: &ScalingPolicy) -> StoreResult<()> {
        let key = &policy.reference;
        let patch = status_patch(policy.status);
        self.api(key)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_error(e, &format!("scaler {key} status")))?;
        debug!(policy = %key, status = %policy.status, "status patched");
        Ok(())
    }
}

// ── Workloads ─────────────────────────────────────────────────────

/// [`WorkloadStore`] over `apps/v1` Deployments.
#[derive(Clone)]
pub struct KubeWorkloadStore {
    client: Client,
}

impl KubeWorkloadStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, workload: &WorkloadRef) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &workload.namespace)
    }
}

#[async_trait]
impl WorkloadStore for KubeWorkloadStore {
    async fn get(&self, workload: &WorkloadRef) -> StoreResult<WorkloadState> {
        let deployment = self
            .api(workload)
            .get(&workload.name)
            .await
            .map_err(|e| store_error(e, &format!("deployment {workload}")))?;
        Ok(workload_state(workload, &deployment))
    }

    async fn set_replicas(&self, current: &WorkloadState, replicas: i32) -> StoreResult<()> {
        let key = &current.reference;
        let patch = replicas_patch(current.resource_version.as_deref(), replicas);
        self.api(key)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_error(e, &format!("deployment {key}")))?;
        debug!(workload = %key, replicas, "deployment patched");
        Ok(())
    }
}
