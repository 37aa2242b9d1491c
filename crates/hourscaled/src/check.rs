//! `hourscaled check`: validate a Scaler manifest offline.

use hourscale_kube::Scaler;
use hourscale_reconcile::in_window;
use hourscale_state::{ScalingPolicy, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// What a manifest would do at a given hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub policy: ScalingPolicy,
    pub hour: i32,
    pub window_open: bool,
}

impl CheckReport {
    pub fn render(&self) -> String {
        let p = &self.policy;
        let mut out = format!(
            "policy {}: window {:02}:00-{:02}:59 UTC, {} replicas, {} target(s)\n",
            p.reference,
            p.window_start,
            p.window_end,
            p.target_replicas,
            p.targets.len()
        );
        for target in &p.targets {
            out.push_str(&format!("  - {target}\n"));
        }
        if p.window_is_inverted() {
            out.push_str("warning: start is after end; the window never opens\n");
        }
        let state = if self.window_open { "open" } else { "closed" };
        out.push_str(&format!("at hour {:02}: window {state}\n", self.hour));
        out
    }
}

/// Parse and validate `manifest`, then evaluate its window at `hour`.
pub fn check_manifest(manifest: &str, hour: i32) -> Result<CheckReport, CheckError> {
    let scaler: Scaler = serde_yaml::from_str(manifest)?;
    let policy = scaler.to_policy();
    policy.validate()?;
    let window_open = in_window(hour, policy.window_start, policy.window_end);
    Ok(CheckReport {
        policy,
        hour,
        window_open,
    })
}
