//! hourscale-state: the domain model shared by every hourscale crate.
//!
//! Defines the scaling policy, the workload references it points at, the
//! error kinds collaborators report, and the two collaborator traits the
//! reconciler drives:
//!
//! - [`PolicyClient`] reads policies and writes their status back.
//! - [`WorkloadStore`] reads and conditionally updates workload replicas.
//!
//! [`MemoryCluster`] implements both in-process. It records every call and
//! can be told to fail specific operations, which makes it the harness for
//! the reconciler's tests.

pub mod client;
pub mod error;
pub mod store;
pub mod types;

pub use client::{PolicyClient, WorkloadStore};
pub use error::{FieldError, StoreError, StoreResult, ValidationError};
pub use store::{Call, MemoryCluster, Op};
pub use types::*;
