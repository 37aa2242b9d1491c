//! Controller runner: watches `Scaler` objects and reconciles them.
//!
//! The watch only decides *when* a pass runs. Each pass re-reads the
//! `Scaler` through [`KubePolicyClient`], so the reconciler never acts on
//! a cached copy. Successful passes requeue after the reconciler's
//! interval; failed passes requeue after `error_backoff`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hourscale_reconcile::{ReconcileError, Reconciler, ReconcilerConfig};

use crate::client::{KubePolicyClient, KubeWorkloadStore};
use crate::crd::Scaler;

/// Delay before retrying a pass that surfaced an error.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// Settings for [`run`].
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Watch a single namespace, or every namespace when `None`.
    pub namespace: Option<String>,
    pub error_backoff: Duration,
    pub reconciler: ReconcilerConfig,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            namespace: None,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            reconciler: ReconcilerConfig::default(),
        }
    }
}

struct Context {
    reconciler: Reconciler<KubePolicyClient, KubeWorkloadStore>,
    error_backoff: Duration,
    shutdown: CancellationToken,
}

/// Run the `Scaler` controller until `shutdown` is cancelled.
pub async fn run(client: Client, settings: ControllerSettings, shutdown: CancellationToken) {
    let scalers: Api<Scaler> = match &settings.namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let reconciler = Reconciler::new(
        KubePolicyClient::new(client.clone()),
        KubeWorkloadStore::new(client),
    )
    .with_config(settings.reconciler.clone());

    let ctx = Arc::new(Context {
        reconciler,
        error_backoff: settings.error_backoff,
        shutdown: shutdown.clone(),
    });

    info!(
        namespace = settings.namespace.as_deref().unwrap_or("*"),
        requeue_secs = settings.reconciler.requeue_interval.as_secs(),
        error_backoff_secs = settings.error_backoff.as_secs(),
        "scaler controller started"
    );

    Controller::new(scalers, watcher::Config::default())
        .graceful_shutdown_on(async move { shutdown.cancelled().await })
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!(scaler = %obj, ?action, "reconciled"),
                Err(e) => debug!(error = %e, "reconcile failed"),
            }
        })
        .await;

    info!("scaler controller stopped");
}

async fn reconcile(scaler: Arc<Scaler>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let policy = scaler.policy_ref();
    // Abort in-flight API calls as soon as shutdown starts.
    let cancel = ctx.shutdown.child_token();
    let requeue = ctx.reconciler.reconcile(&policy, &cancel).await?;
    Ok(Action::requeue(requeue))
}

fn error_policy(scaler: Arc<Scaler>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    warn!(
        scaler = %scaler.policy_ref(),
        error = %err,
        kind = err.store_error().kind(),
        retryable = err.is_retryable(),
        backoff_secs = ctx.error_backoff.as_secs(),
        "scheduling retry"
    );
    Action::requeue(ctx.error_backoff)
}
