//! Homewrecker
//!
//! Boot-time system drive identity and integrity arbitration for storage
//! arrays. This crate re-exports the public surface of the workspace crates:
//! - record types and codecs from `homewrecker-core`
//! - collaborator traits and the in-memory array from `homewrecker-storage`
//! - the arbitrator facade from `homewrecker-engine`

pub use homewrecker_core::{
    DiskType, DriveLocation, FormatError, FruDescriptor, FruSignature, HomewreckerEvent,
    ReplacementFlag, SequenceError, SequenceGenerator, SerialNumber, ServiceModeReason,
    SlotReport, MIRRORED_SLOT_COUNT, SYSTEM_DRIVE_COUNT,
};
pub use homewrecker_engine::{
    ArbitrationError, Collaborators, ConfigError, Homewrecker, HomewreckerConfig, MiniVerdict,
    PublishedDescriptor, Verdict,
};
pub use homewrecker_storage::{
    ChassisIdentityStore, DriveHandle, DriveIo, DriveTopology, EventLog, InMemoryArray,
    LifecycleState, PrivateRegion, ReplicatedRead, ReplicatedRegion, RetryPolicy, ServiceMode,
    StorageError, UserModifiedFlag, VerifyReport,
};
