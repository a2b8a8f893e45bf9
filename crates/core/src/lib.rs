//! Core types for the Homewrecker system drive arbitrator
//!
//! This crate holds the leaves every other crate builds on:
//! - `descriptor`: the replicated FRU Descriptor record and its codec
//! - `signature`: the per-drive FRU Signature record and its codec
//! - `sequence`: the descriptor sequence generator
//! - `disk_type`: classification labels and the trust table
//! - `event`: structured operator events and service-mode reasons
//! - `types`: slot geometry, locations, serial numbers

pub mod descriptor;
pub mod disk_type;
pub mod error;
pub mod event;
pub mod sequence;
pub mod signature;
pub mod types;

pub use descriptor::{FruDescriptor, ReplacementFlag, DESCRIPTOR_SIZE};
pub use disk_type::DiskType;
pub use error::{FormatError, SequenceError};
pub use event::{HomewreckerEvent, ServiceModeReason, SlotReport};
pub use sequence::{SequenceGenerator, SEQUENCE_DEFAULT};
pub use signature::{FruSignature, SIGNATURE_SIZE};
pub use types::{
    DriveLocation, SerialNumber, MIRRORED_SLOT_COUNT, SERIAL_NUMBER_SIZE, SYSTEM_DRIVE_COUNT,
};
