//! Convergence driver: drives a list of workloads to one replica count.
//!
//! Targets are processed strictly in order. A read or write failure ends
//! the pass immediately; targets already scaled stay scaled and later
//! targets are never read. Targets already at the desired count cost a
//! single read and no write, so repeating a pass is cheap.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hourscale_state::{StoreError, StoreResult, WorkloadRef, WorkloadStore};

/// Which collaborator call failed for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => f.write_str("fetch"),
            Stage::Update => f.write_str("update"),
        }
    }
}

/// Result of a pass in which every target was processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Targets whose replica count was changed, in order.
    pub scaled: Vec<WorkloadRef>,
    /// Targets that were already at the desired count.
    pub unchanged: Vec<WorkloadRef>,
}

/// A pass that stopped at a failing target.
#[derive(Debug, Clone, Error)]
#[error("{stage} of workload {target} (target #{index}) failed: {source}")]
pub struct ConvergeError {
    pub target: WorkloadRef,
    /// Position of `target` in the policy's target list.
    pub index: usize,
    pub stage: Stage,
    pub source: StoreError,
    /// Targets scaled before the failure. Their updates are kept.
    pub scaled: Vec<WorkloadRef>,
}

/// Run `fut` unless `cancel` fires first, in which case `fut` is dropped.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StoreError::Cancelled),
        res = fut => res,
    }
}

/// Drive every target to `desired` replicas, in order.
pub async fn converge<W>(
    targets: &[WorkloadRef],
    desired: i32,
    store: &W,
    cancel: &CancellationToken,
) -> Result<ConvergeReport, ConvergeError>
where
    W: WorkloadStore + ?Sized,
{
    let mut report = ConvergeReport::default();

    for (index, target) in targets.iter().enumerate() {
        let current = match cancellable(cancel, store.get(target)).await {
            Ok(state) => state,
            Err(source) => {
                warn!(workload = %target, index, error = %source, "failed to read workload");
                return Err(ConvergeError {
                    target: target.clone(),
                    index,
                    stage: Stage::Fetch,
                    source,
                    scaled: report.scaled,
                });
            }
        };

        if current.replicas == desired {
            debug!(workload = %target, replicas = desired, "already converged");
            report.unchanged.push(target.clone());
            continue;
        }

        if let Err(source) = cancellable(cancel, store.set_replicas(&current, desired)).await {
            warn!(
                workload = %target,
                index,
                from = current.replicas,
                to = desired,
                error = %source,
                "failed to scale workload"
            );
            return Err(ConvergeError {
                target: target.clone(),
                index,
                stage: Stage::Update,
                source,
                scaled: report.scaled,
            });
        }

        info!(
            workload = %target,
            from = current.replicas,
            to = desired,
            "scaled workload"
        );
        report.scaled.push(target.clone());
    }

    Ok(report)
}
