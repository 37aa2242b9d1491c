//! End-to-end reconcile scenarios against the in-memory cluster.
//!
//! Exercises the reconciler the way the controller drives it: one pass
//! per policy reference, passes repeated on requeue, several policies in
//! flight at once.

use std::sync::Arc;
use std::time::Duration;

use hourscale_reconcile::{
    DEFAULT_REQUEUE_INTERVAL, FixedClock, ReconcileError, Reconciler, ReconcilerConfig, Stage,
};
use hourscale_state::*;
use tokio_util::sync::CancellationToken;

fn policy(name: &str, start: i32, end: i32, replicas: i32, targets: &[&str]) -> ScalingPolicy {
    ScalingPolicy {
        reference: PolicyRef::new("ops", name),
        window_start: start,
        window_end: end,
        target_replicas: replicas,
        targets: targets.iter().map(|t| WorkloadRef::new("ns-a", *t)).collect(),
        status: PolicyStatus::Unset,
    }
}

fn reconciler_at(cluster: &MemoryCluster, hour: u32) -> Reconciler<MemoryCluster, MemoryCluster> {
    Reconciler::new(cluster.clone(), cluster.clone()).with_clock(FixedClock::at_hour(hour))
}

#[tokio::test]
async fn business_hours_scale_up_at_noon() {
    let cluster = MemoryCluster::new();
    let p = policy("business-hours", 9, 17, 5, &["web"]);
    cluster.put_policy(p.clone()).await;
    cluster.put_workload(WorkloadRef::new("ns-a", "web"), 3).await;

    let requeue = reconciler_at(&cluster, 12)
        .reconcile(&p.reference, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(requeue, DEFAULT_REQUEUE_INTERVAL);
    assert_eq!(
        cluster.calls().await,
        vec![
            Call::GetPolicy(p.reference.clone()),
            Call::GetWorkload(WorkloadRef::new("ns-a", "web")),
            Call::SetReplicas(WorkloadRef::new("ns-a", "web"), 5),
            Call::UpdateStatus(p.reference.clone(), PolicyStatus::Success),
        ]
    );
}

#[tokio::test]
async fn business_hours_idle_in_the_evening() {
    let cluster = MemoryCluster::new();
    let p = policy("business-hours", 9, 17, 5, &["web"]);
    cluster.put_policy(p.clone()).await;
    cluster.put_workload(WorkloadRef::new("ns-a", "web"), 3).await;

    let requeue = reconciler_at(&cluster, 20)
        .reconcile(&p.reference, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(requeue, DEFAULT_REQUEUE_INTERVAL);
    assert_eq!(cluster.calls().await, vec![Call::GetPolicy(p.reference.clone())]);
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "web")).await, Some(3));
    assert_eq!(
        cluster.policy(&p.reference).await.unwrap().status,
        PolicyStatus::Unset
    );
}

#[tokio::test]
async fn second_target_failure_leaves_first_scaled_and_third_untouched() {
    let cluster = MemoryCluster::new();
    let p = policy("batch", 0, 23, 4, &["a", "b", "c"]);
    cluster.put_policy(p.clone()).await;
    for name in ["a", "b", "c"] {
        cluster.put_workload(WorkloadRef::new("ns-a", name), 1).await;
    }
    cluster
        .fail_next(Op::SetReplicas, "ns-a/b", StoreError::Conflict("b modified".into()))
        .await;

    let err = reconciler_at(&cluster, 6)
        .reconcile(&p.reference, &CancellationToken::new())
        .await
        .unwrap_err();

    let ReconcileError::Converge(converge) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(converge.index, 1);
    assert_eq!(converge.stage, Stage::Update);
    assert_eq!(converge.scaled, vec![WorkloadRef::new("ns-a", "a")]);
    assert!(err.is_retryable());

    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "a")).await, Some(4));
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "b")).await, Some(1));
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "c")).await, Some(1));
    assert!(
        !cluster
            .calls()
            .await
            .contains(&Call::GetWorkload(WorkloadRef::new("ns-a", "c")))
    );
    assert_eq!(
        cluster.policy(&p.reference).await.unwrap().status,
        PolicyStatus::Failed
    );
}

#[tokio::test]
async fn requeued_pass_recovers_after_failure() {
    let cluster = MemoryCluster::new();
    let p = policy("batch", 0, 23, 4, &["a", "b"]);
    cluster.put_policy(p.clone()).await;
    cluster.put_workload(WorkloadRef::new("ns-a", "a"), 1).await;
    cluster.put_workload(WorkloadRef::new("ns-a", "b"), 1).await;
    cluster
        .fail_next(Op::GetWorkload, "ns-a/b", StoreError::Transport("timeout".into()))
        .await;

    let reconciler = reconciler_at(&cluster, 6);
    let cancel = CancellationToken::new();

    assert!(reconciler.reconcile(&p.reference, &cancel).await.is_err());
    assert_eq!(
        cluster.policy(&p.reference).await.unwrap().status,
        PolicyStatus::Failed
    );

    cluster.clear_calls().await;
    reconciler.reconcile(&p.reference, &cancel).await.unwrap();

    // "a" was already scaled by the failed pass; only "b" is written now.
    assert_eq!(cluster.update_count().await, 1);
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "b")).await, Some(4));
    assert_eq!(
        cluster.policy(&p.reference).await.unwrap().status,
        PolicyStatus::Success
    );
}

#[tokio::test]
async fn deleted_workload_fails_the_pass() {
    let cluster = MemoryCluster::new();
    let p = policy("web", 0, 23, 2, &["web"]);
    cluster.put_policy(p.clone()).await;
    cluster.put_workload(WorkloadRef::new("ns-a", "web"), 2).await;
    let reconciler = reconciler_at(&cluster, 10);

    reconciler
        .reconcile(&p.reference, &CancellationToken::new())
        .await
        .unwrap();

    assert!(cluster.delete_workload(&WorkloadRef::new("ns-a", "web")).await);
    let err = reconciler
        .reconcile(&p.reference, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err.store_error(), StoreError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_policies_reconcile_concurrently() {
    let cluster = MemoryCluster::new();
    let day = policy("day", 8, 18, 6, &["web", "api"]);
    let night = policy("night", 19, 23, 1, &["batch"]);
    let always = policy("always", 0, 23, 2, &["cache"]);
    for p in [&day, &night, &always] {
        cluster.put_policy(p.clone()).await;
    }
    for name in ["web", "api", "batch", "cache"] {
        cluster.put_workload(WorkloadRef::new("ns-a", name), 3).await;
    }

    let reconciler = Arc::new(reconciler_at(&cluster, 12).with_config(ReconcilerConfig {
        requeue_interval: Duration::from_secs(45),
    }));
    let cancel = CancellationToken::new();

    let passes: Vec<_> = [&day, &night, &always]
        .into_iter()
        .map(|p| {
            let reconciler = Arc::clone(&reconciler);
            let cancel = cancel.clone();
            let policy = p.reference.clone();
            tokio::spawn(async move { reconciler.reconcile(&policy, &cancel).await })
        })
        .collect();

    for pass in passes {
        assert_eq!(pass.await.unwrap().unwrap(), Duration::from_secs(45));
    }
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "web")).await, Some(6));
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "api")).await, Some(6));
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "batch")).await, Some(3));
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "cache")).await, Some(2));
    assert_eq!(
        cluster.policy(&night.reference).await.unwrap().status,
        PolicyStatus::Unset
    );
}

#[tokio::test]
async fn shutdown_token_cancels_pass() {
    let cluster = MemoryCluster::new();
    let p = policy("web", 0, 23, 2, &["web"]);
    cluster.put_policy(p.clone()).await;
    cluster.put_workload(WorkloadRef::new("ns-a", "web"), 1).await;

    let shutdown = CancellationToken::new();
    let pass = shutdown.child_token();
    shutdown.cancel();

    let err = reconciler_at(&cluster, 10)
        .reconcile(&p.reference, &pass)
        .await
        .unwrap_err();

    assert_eq!(err.store_error(), &StoreError::Cancelled);
    assert_eq!(cluster.replicas(&WorkloadRef::new("ns-a", "web")).await, Some(1));
}
