//! hourscale-kube: runs the hourscale reconciler against a Kubernetes cluster.
//!
//! - **`crd`**: the namespaced `Scaler` custom resource (`hourscale.dev/v1`)
//!   and its mapping onto [`hourscale_state::ScalingPolicy`].
//! - **`client`**: [`hourscale_state::PolicyClient`] over `Scaler` objects and
//!   [`hourscale_state::WorkloadStore`] over `apps/v1` Deployments.
//! - **`controller`**: a `kube::runtime::Controller` that invokes the
//!   reconciler for every watched `Scaler` and requeues it.

pub mod client;
pub mod controller;
pub mod crd;

pub use client::{KubePolicyClient, KubeWorkloadStore};
pub use controller::{ControllerSettings, DEFAULT_ERROR_BACKOFF, run};
pub use crd::{DeploymentTarget, Scaler, ScalerPhase, ScalerSpec, ScalerStatus};
