//! MemoryCluster: an in-process policy and workload store.
//!
//! Implements both [`PolicyClient`] and [`WorkloadStore`] over shared maps.
//! Every call is appended to a call log, and individual operations can be
//! primed to fail, so tests can assert exactly which collaborator calls a
//! reconcile made and in which order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::{PolicyClient, WorkloadStore};
use crate::error::{StoreError, StoreResult};
use crate::types::*;

/// Collaborator operation kinds, used to prime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetPolicy,
    UpdateStatus,
    GetWorkload,
    SetReplicas,
}

/// A recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetPolicy(PolicyRef),
    UpdateStatus(PolicyRef, PolicyStatus),
    GetWorkload(WorkloadRef),
    SetReplicas(WorkloadRef, i32),
}

#[derive(Default)]
struct Inner {
    policies: BTreeMap<PolicyRef, ScalingPolicy>,
    /// Replica count and a monotonically increasing version per workload.
    workloads: BTreeMap<WorkloadRef, (i32, u64)>,
    failures: HashMap<(Op, String), StoreError>,
    calls: Vec<Call>,
}

impl Inner {
    fn take_failure(&mut self, op: Op, key: &str) -> Option<StoreError> {
        self.failures.remove(&(op, key.to_string()))
    }
}

/// Thread-safe in-memory cluster. Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ────────────────────────────────────────────────────

    /// Insert or replace a policy.
    pub async fn put_policy(&self, policy: ScalingPolicy) {
        let mut inner = self.inner.lock().await;
        debug!(policy = %policy.reference, "policy stored");
        inner.policies.insert(policy.reference.clone(), policy);
    }

    /// Insert or replace a workload, bumping its version.
    pub async fn put_workload(&self, workload: WorkloadRef, replicas: i32) {
        let mut inner = self.inner.lock().await;
        let version = inner.workloads.get(&workload).map_or(1, |(_, v)| v + 1);
        inner.workloads.insert(workload, (replicas, version));
    }

    /// Remove a workload. Returns true if it existed.
    pub async fn delete_workload(&self, workload: &WorkloadRef) -> bool {
        self.inner.lock().await.workloads.remove(workload).is_some()
    }

    /// Make the next `op` against the object keyed `key` fail with `error`.
    ///
    /// `key` is the `namespace/name` rendering of the policy or workload.
    pub async fn fail_next(&self, op: Op, key: impl Into<String>, error: StoreError) {
        self.inner
            .lock()
            .await
            .failures
            .insert((op, key.into()), error);
    }

    // ── Inspection ─────────────────────────────────────────────────

    pub async fn policy(&self, policy: &PolicyRef) -> Option<ScalingPolicy> {
        self.inner.lock().await.policies.get(policy).cloned()
    }

    pub async fn replicas(&self, workload: &WorkloadRef) -> Option<i32> {
        self.inner.lock().await.workloads.get(workload).map(|(r, _)| *r)
    }

    /// All calls made so far, oldest first.
    pub async fn calls(&self) -> Vec<Call> {
        self.inner.lock().await.calls.clone()
    }

    /// Number of `set_replicas` calls made so far.
    pub async fn update_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, Call::SetReplicas(..)))
            .count()
    }

    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }
}

#[async_trait]
impl PolicyClient for MemoryCluster {
    async fn get(&self, policy: &PolicyRef) -> StoreResult<ScalingPolicy> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(Call::GetPolicy(policy.clone()));
        if let Some(err) = inner.take_failure(Op::GetPolicy, &policy.to_string()) {
            return Err(err);
        }
        inner
            .policies
            .get(policy)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("policy {policy}")))
    }

    async fn update_status(&self, policy: &ScalingPolicy) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let key = &policy.reference;
        inner
            .calls
            .push(Call::UpdateStatus(key.clone(), policy.status));
        if let Some(err) = inner.take_failure(Op::UpdateStatus, &key.to_string()) {
            return Err(err);
        }
        match inner.policies.get_mut(key) {
            Some(stored) => {
                stored.status = policy.status;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("policy {key}"))),
        }
    }
}

#[async_trait]
impl WorkloadStore for MemoryCluster {
    async fn get(&self, workload: &WorkloadRef) -> StoreResult<WorkloadState> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(Call::GetWorkload(workload.clone()));
        if let Some(err) = inner.take_failure(Op::GetWorkload, &workload.to_string()) {
            return Err(err);
        }
        match inner.workloads.get(workload) {
            Some((replicas, version)) => Ok(WorkloadState {
                reference: workload.clone(),
                replicas: *replicas,
                resource_version: Some(version.to_string()),
            }),
            None => Err(StoreError::NotFound(format!("workload {workload}"))),
        }
    }

    async fn set_replicas(&self, current: &WorkloadState, replicas: i32) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let key = &current.reference;
        inner.calls.push(Call::SetReplicas(key.clone(), replicas));
        if let Some(err) = inner.take_failure(Op::SetReplicas, &key.to_string()) {
            return Err(err);
        }
        let Some((stored, version)) = inner.workloads.get_mut(key) else {
            return Err(StoreError::NotFound(format!("workload {key}")));
        };
        if let Some(expected) = &current.resource_version
            && *expected != version.to_string()
        {
            return Err(StoreError::Conflict(format!(
                "workload {key} changed: version {expected} is stale"
            )));
        }
        *stored = replicas;
        *version += 1;
        debug!(workload = %key, replicas, "replicas updated");
        Ok(())
    }
}
