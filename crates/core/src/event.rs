//! Structured operator events and service-mode reasons.
//!
//! Every event kind carries its own payload; the event log collaborator
//! receives the enum as-is.

use serde::{Deserialize, Serialize};

use crate::disk_type::DiskType;
use crate::types::{DriveLocation, SerialNumber};

/// Classification of one system slot, as reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotReport {
    pub slot: usize,
    pub disk_type: DiskType,
}

/// Events emitted by the arbitrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HomewreckerEvent {
    /// No trustworthy descriptor could be chosen from the replicas. Carries
    /// the chassis identity of each mirrored slot's valid copy, if any.
    DescriptorQuorumLost {
        chassis_wwn_seed: u32,
        replica_wwn_seeds: Vec<Option<u32>>,
    },

    /// Too many system slots are untrustworthy.
    IntegrityBroken { slots: Vec<SlotReport> },

    /// Drives sit in the wrong system slots. `claimed_slots[i]` is the slot
    /// the drive in slot `i` claims to belong to.
    SystemDrivesDisordered { claimed_slots: Vec<Option<u32>> },

    /// The chassis changed without a planned replacement.
    ChassisMismatched {
        descriptor_wwn_seed: u32,
        chassis_wwn_seed: u32,
    },

    /// Planned replacement and manual wwn-seed correction were both requested.
    WwnSeedChaos {
        descriptor_wwn_seed: u32,
        chassis_wwn_seed: u32,
    },

    /// A system drive was found in a user slot.
    SystemDriveInUserSlot {
        serial: SerialNumber,
        expected: DriveLocation,
        actual: DriveLocation,
    },

    /// Two invalid system drives belong to the same mirrored pair.
    MirrorPairLost { slots: [usize; 2] },

    /// A slot was marked invalid and disconnected while booting.
    InvalidSystemDrive { slot: usize, disk_type: DiskType },

    /// A planned chassis replacement was completed.
    ChassisReplaced {
        previous_chassis_wwn_seed: u32,
        chassis_wwn_seed: u32,
    },

    /// The operator's manual wwn-seed correction was accepted.
    UserModifiedWwnSeedAccepted { descriptor_wwn_seed: u32 },
}

/// Why service mode was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceModeReason {
    SystemDriveIntegrityBroken,
    SystemDrivesDisordered,
    ChassisMismatched,
    WwnSeedChaos,
    SystemDriveInUserSlot,
    MirrorPairLost,
}

impl ServiceModeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceModeReason::SystemDriveIntegrityBroken => "system drive integrity broken",
            ServiceModeReason::SystemDrivesDisordered => "system drives disordered",
            ServiceModeReason::ChassisMismatched => "chassis mismatched",
            ServiceModeReason::WwnSeedChaos => "wwn seed chaos",
            ServiceModeReason::SystemDriveInUserSlot => "system drive in user slot",
            ServiceModeReason::MirrorPairLost => "mirrored system drive pair lost",
        }
    }
}

impl std::fmt::Display for ServiceModeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
