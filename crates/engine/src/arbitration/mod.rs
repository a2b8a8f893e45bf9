//! Arbitration state machines
//!
//! - `full`: the normal boot path, with disorder detection and chassis
//!   reconciliation
//! - `mini`: the early boot path, which only decides boot or service mode
//!
//! Both share the steps below: load the table, resolve the standard,
//! classify, mark invalid slots, and on boot detach invalid drives and
//! publish the standard.

pub mod full;
pub mod mini;

use homewrecker_core::{
    FruDescriptor, HomewreckerEvent, SequenceGenerator, ServiceModeReason, DESCRIPTOR_SIZE,
    MIRRORED_SLOT_COUNT,
};
use homewrecker_storage::{PrivateRegion, ReplicatedRead};
use serde::Serialize;

use crate::config::HomewreckerConfig;
use crate::context::Collaborators;
use crate::error::{ArbitrationError, Result};
use crate::persist::read_chassis_wwn_seed;
use crate::published::PublishedDescriptor;
use crate::quorum::{resolve, Resolution};
use crate::table::SystemDiskTable;

/// Outcome of the full boot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Boot,
    IntegrityBroken,
    Disordered,
    ChassisMismatched,
    WwnSeedChaos,
    DoubleInvalidUserSlot,
}

impl Verdict {
    pub fn is_boot(&self) -> bool {
        matches!(self, Verdict::Boot)
    }

    /// Reason passed to service mode for every verdict that refuses boot.
    pub fn service_mode_reason(&self) -> Option<ServiceModeReason> {
        match self {
            Verdict::Boot => None,
            Verdict::IntegrityBroken => Some(ServiceModeReason::SystemDriveIntegrityBroken),
            Verdict::Disordered => Some(ServiceModeReason::SystemDrivesDisordered),
            Verdict::ChassisMismatched => Some(ServiceModeReason::ChassisMismatched),
            Verdict::WwnSeedChaos => Some(ServiceModeReason::WwnSeedChaos),
            Verdict::DoubleInvalidUserSlot => Some(ServiceModeReason::SystemDriveInUserSlot),
        }
    }
}

/// Outcome of the early boot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniVerdict {
    Boot,
    ServiceMode(ServiceModeReason),
}

impl MiniVerdict {
    pub fn is_boot(&self) -> bool {
        matches!(self, MiniVerdict::Boot)
    }
}

/// Borrowed state of one arbitration pass.
pub(crate) struct Pass<'a> {
    pub collaborators: &'a Collaborators,
    pub config: &'a HomewreckerConfig,
    pub sequence: &'a SequenceGenerator,
    pub published: &'a PublishedDescriptor,
}

/// Output of `Pass::resolve_standard`. The chassis identity read there is
/// the one every later step compares against.
pub(crate) struct Resolved {
    pub table: SystemDiskTable,
    pub standard: FruDescriptor,
    pub chassis_wwn_seed: u32,
}

impl<'a> Pass<'a> {
    /// Load the system slots and pick the standard descriptor. On success
    /// the returned table is already classified. `None` means integrity is
    /// broken and the quorum-lost event has been emitted.
    pub fn resolve_standard(&self) -> Result<Option<Resolved>> {
        let chassis_wwn_seed =
            read_chassis_wwn_seed(self.collaborators, &self.config.chassis_retry)?;
        let table = SystemDiskTable::load(self.collaborators);

        let replicated: Option<ReplicatedRead> = match self.collaborators.replicated.read(
            PrivateRegion::FruDescriptor,
            0,
            DESCRIPTOR_SIZE,
        ) {
            Ok(read) => Some(read),
            Err(e) => {
                tracing::debug!(error = %e, "Replicated descriptor read failed");
                None
            }
        };

        let copies = table.descriptor_copies();
        match resolve(replicated.as_ref(), &copies, chassis_wwn_seed, self.sequence)? {
            Resolution::Standard(standard) => Ok(Some(Resolved {
                table: table.classified(&standard.descriptor),
                standard: standard.descriptor,
                chassis_wwn_seed,
            })),
            Resolution::IntegrityBroken => {
                let replica_wwn_seeds = copies
                    .iter()
                    .take(MIRRORED_SLOT_COUNT)
                    .map(|copy| copy.record().map(|d| d.chassis_wwn_seed))
                    .collect();
                self.collaborators
                    .events
                    .emit(HomewreckerEvent::DescriptorQuorumLost {
                        chassis_wwn_seed,
                        replica_wwn_seeds,
                    });
                Ok(None)
            }
        }
    }

    /// Invalid marking shared by both paths.
    ///
    /// Mirrored slots are invalid when their copy is not the standard's
    /// (by chassis identity and sequence). Every slot is invalid when its
    /// signature read failed or its drive is untrustworthy.
    pub fn mark_invalid(&self, table: SystemDiskTable, standard: &FruDescriptor) -> SystemDiskTable {
        let marked = table.with_invalid_where(|entry| {
            let stale_copy = entry.slot < MIRRORED_SLOT_COUNT
                && !entry.descriptor.record().map_or(false, |copy| {
                    copy.chassis_wwn_seed == standard.chassis_wwn_seed
                        && copy.sequence_number == standard.sequence_number
                });
            let invalid =
                stale_copy || entry.signature.is_failed() || !entry.disk_type.is_trustworthy();
            if invalid {
                tracing::debug!(
                    slot = entry.slot,
                    disk_type = %entry.disk_type,
                    stale_copy,
                    "System slot marked invalid"
                );
            }
            invalid
        });
        tracing::info!(invalid_count = marked.invalid_count(), "Invalid slots marked");
        marked
    }

    /// Emit the per-slot report for an integrity-broken verdict.
    pub fn report_integrity_broken(&self, table: &SystemDiskTable) {
        tracing::warn!(
            invalid_count = table.invalid_count(),
            "System drive integrity broken"
        );
        self.collaborators
            .events
            .emit(HomewreckerEvent::IntegrityBroken {
                slots: table.slot_reports(),
            });
    }

    /// Logically detach every invalid slot's drive. Slots without a live
    /// attachment have nothing to tear down.
    pub fn disconnect_invalid(&self, table: &SystemDiskTable) -> Result<()> {
        for entry in table.entries().iter().filter(|e| e.is_invalid) {
            let Some(handle) = entry.handle.filter(|_| entry.path_enabled) else {
                continue;
            };
            self.collaborators
                .topology
                .disconnect(handle)
                .map_err(|source| ArbitrationError::Disconnect {
                    slot: entry.slot,
                    source,
                })?;
            tracing::info!(slot = entry.slot, disk_type = %entry.disk_type, "Invalid system drive disconnected");
        }
        Ok(())
    }

    pub fn publish(&self, standard: &FruDescriptor) {
        self.published.publish(standard.clone());
        tracing::info!(
            sequence = standard.sequence_number,
            wwn_seed = standard.chassis_wwn_seed,
            "Standard descriptor published"
        );
    }
}
