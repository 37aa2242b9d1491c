//! hourscale-reconcile: keeps workloads at a replica count during an hour window.
//!
//! Three layers, leaves first:
//!
//! - **`window`**: pure check of the current UTC hour against `[start, end]`.
//! - **`converge`**: walks a policy's targets in order, reads each
//!   workload and updates it only when its replica count differs. Stops at
//!   the first failure without undoing earlier updates.
//! - **`reconciler`**: one stateless pass over a single policy. Fetch,
//!   window check, converge, write status, return the requeue delay.
//!
//! ```text
//! reconcile(policy_ref)
//!   ├── PolicyClient::get
//!   ├── in_window(now_hour, start, end) ── no ──> requeue after interval
//!   ├── converge(targets, replicas)
//!   │     └── per target: WorkloadStore::get → set_replicas if different
//!   ├── PolicyClient::update_status(Success | Failed)
//!   └── requeue after interval (or surface the error)
//! ```
//!
//! Every collaborator call is raced against a `CancellationToken`.

pub mod clock;
pub mod converge;
pub mod error;
pub mod reconciler;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use converge::{ConvergeError, ConvergeReport, Stage, cancellable, converge};
pub use error::ReconcileError;
pub use reconciler::{DEFAULT_REQUEUE_INTERVAL, Reconciler, ReconcilerConfig};
pub use window::{current_hour, in_window};
