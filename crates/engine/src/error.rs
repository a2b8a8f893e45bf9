//! Hard failures of an arbitration pass.
//!
//! Integrity problems are not errors: they come back as verdicts. Only the
//! failures below abort a pass.

use homewrecker_core::SequenceError;
use homewrecker_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArbitrationError {
    /// Logical detach of an invalid system drive failed.
    #[error("failed to disconnect drive in system slot {slot}: {source}")]
    Disconnect {
        slot: usize,
        #[source]
        source: StorageError,
    },

    /// Chassis identity or user-modified flag could not be read or written.
    #[error("chassis identity store failed: {0}")]
    ChassisIdentity(#[source] StorageError),

    /// Replicated write of the descriptor failed.
    #[error("failed to persist descriptor: {0}")]
    DescriptorPersist(#[source] StorageError),

    /// Writing a drive's signature failed.
    #[error("failed to persist signature in system slot {slot}: {source}")]
    SignaturePersist {
        slot: usize,
        #[source]
        source: StorageError,
    },

    /// Topology could not produce the drive in a system slot.
    #[error("no usable drive in system slot {slot}: {source}")]
    Topology {
        slot: usize,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Operation requires a descriptor published by a successful boot.
    #[error("no standard descriptor has been published")]
    NotPublished,

    #[error("slot {0} is not a system slot")]
    SlotOutOfRange(usize),
}

pub type Result<T> = std::result::Result<T, ArbitrationError>;
