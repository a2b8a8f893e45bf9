//! Errors reported by storage and hardware collaborators.

use homewrecker_core::DriveLocation;
use thiserror::Error;

use crate::traits::DriveHandle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No drive is present at the location.
    #[error("no drive found at {0}")]
    NotFound(DriveLocation),

    /// The drive is present but could not be accessed.
    #[error("drive at {0} is not accessible")]
    DriveUnaccessible(DriveLocation),

    /// Topology does not know the handle.
    #[error("unknown drive handle {0}")]
    UnknownHandle(DriveHandle),

    /// Every replica of the replicated region failed.
    #[error("no readable replica in replicated region")]
    NoReplica,

    /// Access beyond the end of a private region.
    #[error("access at offset {offset} length {length} exceeds region size {size}")]
    OutOfRange {
        offset: u64,
        length: usize,
        size: usize,
    },

    /// Persistent store owned by another service failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
