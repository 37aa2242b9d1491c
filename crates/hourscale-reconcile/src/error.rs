//! Reconcile error types.

use thiserror::Error;

use hourscale_state::{PolicyRef, PolicyStatus, StoreError};

use crate::converge::ConvergeError;

/// The single error a reconcile pass surfaces to its caller.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("failed to fetch policy {policy}: {source}")]
    FetchPolicy { policy: PolicyRef, source: StoreError },

    #[error(transparent)]
    Converge(#[from] ConvergeError),

    #[error("failed to record status {status} on policy {policy}: {source}")]
    StatusUpdate {
        policy: PolicyRef,
        status: PolicyStatus,
        source: StoreError,
    },
}

impl ReconcileError {
    /// The collaborator error underneath.
    pub fn store_error(&self) -> &StoreError {
        match self {
            ReconcileError::FetchPolicy { source, .. } => source,
            ReconcileError::Converge(err) => &err.source,
            ReconcileError::StatusUpdate { source, .. } => source,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.store_error().is_retryable()
    }
}
