//! Storage collaborators for the Homewrecker arbitrator
//!
//! This crate defines the seams between arbitration logic and the array:
//! - `traits`: replicated region, raw drive I/O, topology, chassis stores,
//!   event log, service mode
//! - `verify`: per-replica verification report
//! - `retry`: bounded retry for chassis store calls
//! - `memory`: in-memory array implementing every collaborator
//!
//! Arbitration code only sees the traits. Backends are handed over as
//! `Arc<dyn Trait>`.

#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod retry;
pub mod traits;
pub mod verify;

pub use error::{Result, StorageError};
pub use memory::InMemoryArray;
pub use retry::RetryPolicy;
pub use traits::{
    ChassisIdentityStore, DriveHandle, DriveIo, DriveTopology, EventLog, LifecycleState,
    PrivateRegion, ReplicatedRead, ReplicatedRegion, ServiceMode, UserModifiedFlag,
    REGION_CAPACITY,
};
pub use verify::VerifyReport;
