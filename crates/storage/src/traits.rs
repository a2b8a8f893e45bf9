//! Collaborator interfaces consumed by the arbitrator
//!
//! Everything the arbitrator touches outside its own logic goes through one
//! of these traits: the replicated private region, single-drive raw I/O,
//! drive topology, the chassis identity stores, and the one-way event and
//! service-mode notifications. All calls are blocking from the caller's
//! point of view.

use std::fmt;

use homewrecker_core::{DriveLocation, HomewreckerEvent, SerialNumber, ServiceModeReason};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::verify::VerifyReport;

/// Private, non-user-visible regions on every drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateRegion {
    /// Replicated across the mirrored system slots.
    FruDescriptor,
    /// Per-drive, never replicated.
    FruSignature,
}

/// Bytes reserved for each private region on every drive.
pub const REGION_CAPACITY: usize = 512;

/// Opaque handle to a drive known to the topology service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriveHandle(pub u64);

impl fmt::Display for DriveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drive#{}", self.0)
    }
}

/// Lifecycle of the logical attachment to a drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Ready,
    Activating,
    Failed,
    Disconnected,
}

impl LifecycleState {
    /// Only a ready drive has a usable logical attach.
    pub fn is_path_enabled(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }
}

/// Result of a replicated read: the chosen payload plus the verify report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedRead {
    pub data: Vec<u8>,
    pub report: VerifyReport,
}

/// Replicated block I/O across the mirrored system slots.
pub trait ReplicatedRegion: Send + Sync {
    fn read(&self, region: PrivateRegion, offset: u64, length: usize) -> Result<ReplicatedRead>;

    fn write(&self, region: PrivateRegion, offset: u64, data: &[u8]) -> Result<VerifyReport>;
}

/// Raw I/O against a single drive.
pub trait DriveIo: Send + Sync {
    fn read(&self, location: DriveLocation, region: PrivateRegion, length: usize) -> Result<Vec<u8>>;

    fn write(&self, location: DriveLocation, region: PrivateRegion, data: &[u8]) -> Result<()>;
}

/// Drive lookup, lifecycle, and logical detach.
pub trait DriveTopology: Send + Sync {
    fn resolve(&self, location: DriveLocation) -> Result<DriveHandle>;

    fn lifecycle_state(&self, handle: DriveHandle) -> Result<LifecycleState>;

    fn serial_number(&self, handle: DriveHandle) -> Result<SerialNumber>;

    /// Array-wide scan for the drive carrying `serial`.
    fn locate_serial(&self, serial: &SerialNumber) -> Result<Option<DriveLocation>>;

    /// Tear down the logical attachment to the drive.
    fn disconnect(&self, handle: DriveHandle) -> Result<()>;
}

/// Chassis wwn seed held by the hardware information service.
pub trait ChassisIdentityStore: Send + Sync {
    fn get(&self) -> Result<u32>;

    fn set(&self, wwn_seed: u32) -> Result<()>;
}

/// Operator flag "the wwn seed was modified by hand", owned by management.
pub trait UserModifiedFlag: Send + Sync {
    fn get(&self) -> Result<bool>;

    fn clear(&self) -> Result<()>;
}

/// One-way structured event log.
pub trait EventLog: Send + Sync {
    fn emit(&self, event: HomewreckerEvent);
}

/// One-way request to put the array into service mode.
pub trait ServiceMode: Send + Sync {
    fn enter(&self, reason: ServiceModeReason);
}
