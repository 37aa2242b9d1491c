//! Domain types for scaling policies and the workloads they manage.
//!
//! A [`ScalingPolicy`] is owned by an external object store; the
//! reconciler only ever mutates its `status`. A [`WorkloadState`] is the
//! reconciler's view of a workload at the time it was read.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, ValidationError};

/// Highest hour of the day accepted for window bounds.
pub const MAX_HOUR: i32 = 23;

// ── References ────────────────────────────────────────────────────

/// Identity of a scaling policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRef {
    pub name: String,
    pub namespace: String,
}

impl PolicyRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for PolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of a workload a policy converges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ── Policy ────────────────────────────────────────────────────────

/// Outcome of the last convergence attempt, as recorded on the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyStatus {
    /// No convergence has been recorded yet.
    #[default]
    Unset,
    Success,
    Failed,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyStatus::Unset => "Unset",
            PolicyStatus::Success => "Success",
            PolicyStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Desired replica count for a list of workloads during a daily hour window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub reference: PolicyRef,
    /// First hour (UTC, inclusive) of the window.
    pub window_start: i32,
    /// Last hour (UTC, inclusive) of the window.
    pub window_end: i32,
    /// Replica count every target is driven to inside the window.
    pub target_replicas: i32,
    /// Workloads to converge, in convergence order.
    pub targets: Vec<WorkloadRef>,
    #[serde(default)]
    pub status: PolicyStatus,
}

impl ScalingPolicy {
    /// Whether the declared window can never open (`start > end`).
    pub fn window_is_inverted(&self) -> bool {
        self.window_start > self.window_end
    }

    /// Check field bounds the way an admission hook would.
    ///
    /// Collects every violation instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [("start", self.window_start), ("end", self.window_end)] {
            if !(0..=MAX_HOUR).contains(&value) {
                errors.push(FieldError::new(
                    format!("spec.{field}"),
                    format!("{value} is outside 0..={MAX_HOUR}"),
                ));
            }
        }

        if self.target_replicas < 0 {
            errors.push(FieldError::new(
                "spec.replicas",
                format!("{} must not be negative", self.target_replicas),
            ));
        }

        for (i, target) in self.targets.iter().enumerate() {
            if target.name.is_empty() {
                errors.push(FieldError::new(
                    format!("spec.deployments[{i}].name"),
                    "must not be empty",
                ));
            }
            if target.namespace.is_empty() {
                errors.push(FieldError::new(
                    format!("spec.deployments[{i}].namespace"),
                    "must not be empty",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                object: self.reference.to_string(),
                errors,
            })
        }
    }
}

// ── Workload ──────────────────────────────────────────────────────

/// Observed state of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadState {
    pub reference: WorkloadRef,
    pub replicas: i32,
    /// Opaque version token; updates are conditioned on it when present.
    pub resource_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(start: i32, end: i32, replicas: i32) -> ScalingPolicy {
        ScalingPolicy {
            reference: PolicyRef::new("ops", "business-hours"),
            window_start: start,
            window_end: end,
            target_replicas: replicas,
            targets: vec![WorkloadRef::new("ns-a", "web")],
            status: PolicyStatus::Unset,
        }
    }

    #[test]
    fn refs_display_as_namespace_slash_name() {
        assert_eq!(WorkloadRef::new("ns-a", "web").to_string(), "ns-a/web");
        assert_eq!(PolicyRef::new("ops", "nightly").to_string(), "ops/nightly");
    }

    #[test]
    fn valid_policy_passes() {
        assert!(policy(9, 17, 5).validate().is_ok());
        assert!(policy(0, 23, 0).validate().is_ok());
    }

    #[test]
    fn inverted_window_is_still_valid() {
        let p = policy(22, 4, 1);
        assert!(p.validate().is_ok());
        assert!(p.window_is_inverted());
    }

    #[test]
    fn validation_collects_every_field() {
        let mut p = policy(-1, 24, -3);
        p.targets.push(WorkloadRef::new("", ""));

        let err = p.validate().unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "spec.start",
                "spec.end",
                "spec.replicas",
                "spec.deployments[1].name",
                "spec.deployments[1].namespace",
            ]
        );
        assert_eq!(err.object, "ops/business-hours");
    }

    #[test]
    fn status_defaults_to_unset_when_missing() {
        let json = r#"{
            "reference": {"name": "p", "namespace": "ops"},
            "window_start": 1,
            "window_end": 2,
            "target_replicas": 3,
            "targets": []
        }"#;
        let p: ScalingPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(p.status, PolicyStatus::Unset);
    }
}
