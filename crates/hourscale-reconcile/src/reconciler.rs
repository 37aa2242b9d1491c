//! Reconciler: one stateless pass over a single scaling policy.
//!
//! Nothing is carried between passes. The only durable signal is the
//! status written back onto the policy, so passes for different policies
//! can run concurrently against the same `Reconciler`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hourscale_state::{PolicyClient, PolicyRef, PolicyStatus, ScalingPolicy, WorkloadStore};

use crate::clock::{Clock, SystemClock};
use crate::converge::{cancellable, converge};
use crate::error::ReconcileError;
use crate::window::{current_hour, in_window};

/// Delay between passes over the same policy.
pub const DEFAULT_REQUEUE_INTERVAL: Duration = Duration::from_secs(30);

/// Tunables for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Returned after every pass that does not surface an error,
    /// whether or not the window was open.
    pub requeue_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            requeue_interval: DEFAULT_REQUEUE_INTERVAL,
        }
    }
}

/// Drives scaling policies through their policy and workload collaborators.
pub struct Reconciler<P, W> {
    policies: P,
    workloads: W,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
}

impl<P, W> Reconciler<P, W>
where
    P: PolicyClient,
    W: WorkloadStore,
{
    /// Create a reconciler on the system clock with default config.
    pub fn new(policies: P, workloads: W) -> Self {
        Self {
            policies,
            workloads,
            clock: Arc::new(SystemClock),
            config: ReconcilerConfig::default(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one pass over `policy_ref`.
    ///
    /// Returns the delay after which the policy should be reconciled
    /// again. On error nothing is requeued here; the caller decides.
    pub async fn reconcile(
        &self,
        policy_ref: &PolicyRef,
        cancel: &CancellationToken,
    ) -> Result<Duration, ReconcileError> {
        let requeue = self.config.requeue_interval;

        let mut policy = cancellable(cancel, self.policies.get(policy_ref))
            .await
            .map_err(|source| ReconcileError::FetchPolicy {
                policy: policy_ref.clone(),
                source,
            })?;

        let now_hour = current_hour(self.clock.now());

        if policy.window_is_inverted() {
            warn!(
                policy = %policy_ref,
                start = policy.window_start,
                end = policy.window_end,
                "window start is after end; policy never activates"
            );
        }

        if !in_window(now_hour, policy.window_start, policy.window_end) {
            debug!(
                policy = %policy_ref,
                hour = now_hour,
                start = policy.window_start,
                end = policy.window_end,
                "outside window"
            );
            return Ok(requeue);
        }

        debug!(
            policy = %policy_ref,
            hour = now_hour,
            replicas = policy.target_replicas,
            targets = policy.targets.len(),
            "inside window, converging"
        );

        let outcome = converge(
            &policy.targets,
            policy.target_replicas,
            &self.workloads,
            cancel,
        )
        .await;

        match outcome {
            Ok(report) => {
                policy.status = PolicyStatus::Success;
                self.write_status(&policy, cancel).await?;
                info!(
                    policy = %policy_ref,
                    scaled = report.scaled.len(),
                    unchanged = report.unchanged.len(),
                    "policy converged"
                );
                Ok(requeue)
            }
            Err(err) => {
                policy.status = PolicyStatus::Failed;
                warn!(policy = %policy_ref, error = %err, "convergence failed");
                // A failed status write takes precedence over the
                // convergence error.
                self.write_status(&policy, cancel).await?;
                Err(ReconcileError::Converge(err))
            }
        }
    }

    async fn write_status(
        &self,
        policy: &ScalingPolicy,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        cancellable(cancel, self.policies.update_status(policy))
            .await
            .map_err(|source| {
                warn!(
                    policy = %policy.reference,
                    status = %policy.status,
                    error = %source,
                    "failed to record status"
                );
                ReconcileError::StatusUpdate {
                    policy: policy.reference.clone(),
                    status: policy.status,
                    source,
                }
            })
    }
}
