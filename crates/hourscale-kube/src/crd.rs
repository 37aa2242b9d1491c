//! The `Scaler` custom resource.
//!
//! ```yaml
//! apiVersion: hourscale.dev/v1
//! kind: Scaler
//! metadata: { name: business-hours, namespace: ops }
//! spec:
//!   start: 9
//!   end: 17
//!   replicas: 5
//!   deployments:
//!     - { name: web, namespace: ns-a }
//! ```

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use hourscale_state::{PolicyRef, PolicyStatus, ScalingPolicy, WorkloadRef};

/// Desired replicas for a set of Deployments during a daily UTC hour window.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "hourscale.dev",
    version = "v1",
    kind = "Scaler",
    namespaced,
    status = "ScalerStatus",
    shortname = "scl",
    printcolumn = r#"{"name":"Start", "type":"integer", "jsonPath":".spec.start"}"#,
    printcolumn = r#"{"name":"End", "type":"integer", "jsonPath":".spec.end"}"#,
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct ScalerSpec {
    /// First UTC hour (inclusive) of the window.
    #[schemars(range(min = 0, max = 23))]
    pub start: i32,

    /// Last UTC hour (inclusive) of the window.
    #[schemars(range(min = 0, max = 23))]
    pub end: i32,

    /// Replica count applied to every listed Deployment inside the window.
    #[schemars(range(min = 0))]
    pub replicas: i32,

    /// Deployments to scale, in order.
    #[serde(default)]
    pub deployments: Vec<DeploymentTarget>,
}

/// A Deployment addressed by name and namespace.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
pub struct DeploymentTarget {
    pub name: String,
    pub namespace: String,
}

/// Observed outcome of the last convergence.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ScalerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ScalerPhase>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ScalerPhase {
    Success,
    Failed,
}

impl From<ScalerPhase> for PolicyStatus {
    fn from(phase: ScalerPhase) -> Self {
        match phase {
            ScalerPhase::Success => PolicyStatus::Success,
            ScalerPhase::Failed => PolicyStatus::Failed,
        }
    }
}

impl ScalerPhase {
    /// Wire value for a policy status; `None` clears the field.
    pub fn from_status(status: PolicyStatus) -> Option<Self> {
        match status {
            PolicyStatus::Unset => None,
            PolicyStatus::Success => Some(ScalerPhase::Success),
            PolicyStatus::Failed => Some(ScalerPhase::Failed),
        }
    }
}

impl Scaler {
    pub fn policy_ref(&self) -> PolicyRef {
        PolicyRef::new(self.namespace().unwrap_or_default(), self.name_any())
    }

    /// The reconciler's view of this object.
    pub fn to_policy(&self) -> ScalingPolicy {
        let status = self
            .status
            .as_ref()
            .and_then(|s| s.status)
            .map(PolicyStatus::from)
            .unwrap_or_default();

        ScalingPolicy {
            reference: self.policy_ref(),
            window_start: self.spec.start,
            window_end: self.spec.end,
            target_replicas: self.spec.replicas,
            targets: self
                .spec
                .deployments
                .iter()
                .map(|d| WorkloadRef::new(d.namespace.clone(), d.name.clone()))
                .collect(),
            status,
        }
    }
}
