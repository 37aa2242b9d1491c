//! Collaborator traits the reconciler talks to.
//!
//! Implementations must be safe to share between concurrently running
//! reconciles of different policies.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{PolicyRef, ScalingPolicy, WorkloadRef, WorkloadState};

/// Read access to policies plus their status write-back path.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Fetch the current version of a policy.
    async fn get(&self, policy: &PolicyRef) -> StoreResult<ScalingPolicy>;

    /// Persist `policy.status`. Other fields are ignored.
    async fn update_status(&self, policy: &ScalingPolicy) -> StoreResult<()>;
}

/// Read and conditional write access to workload replica counts.
#[async_trait]
pub trait WorkloadStore: Send + Sync {
    /// Fetch the current state of a workload.
    async fn get(&self, workload: &WorkloadRef) -> StoreResult<WorkloadState>;

    /// Set the replica count of the workload `current` was read from.
    ///
    /// When `current.resource_version` is set, the write fails with
    /// [`crate::StoreError::Conflict`] if the workload changed since.
    async fn set_replicas(&self, current: &WorkloadState, replicas: i32) -> StoreResult<()>;
}
