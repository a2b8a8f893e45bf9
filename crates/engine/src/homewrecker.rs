//! Homewrecker facade
//!
//! Owns the collaborators, the descriptor sequence generator and the
//! published descriptor, and exposes the two arbitration entry points plus
//! the maintenance operations used after a boot.
//!
//! # Example
//!
//! ```ignore
//! let array = Arc::new(InMemoryArray::new(chassis_wwn_seed));
//! let homewrecker = Homewrecker::new(Collaborators::from_backend(array), HomewreckerConfig::default());
//!
//! match homewrecker.run_full_arbitration()? {
//!     Verdict::Boot => { /* assemble the configuration database */ }
//!     refused => { /* service mode has been requested */ }
//! }
//! ```
//!
//! # Thread Safety
//!
//! Arbitration is driven by one boot-control thread. The published
//! descriptor may be read from anywhere.

use std::sync::Arc;

use homewrecker_core::{DriveLocation, FruDescriptor, SequenceGenerator, SerialNumber, SYSTEM_DRIVE_COUNT};
use homewrecker_storage::StorageError;

use crate::arbitration::{full, mini, MiniVerdict, Pass, Verdict};
use crate::config::HomewreckerConfig;
use crate::context::Collaborators;
use crate::error::{ArbitrationError, Result};
use crate::persist::{persist_descriptor, read_chassis_wwn_seed, stamp_signature};
use crate::published::PublishedDescriptor;

pub struct Homewrecker {
    collaborators: Collaborators,
    config: HomewreckerConfig,
    sequence: Arc<SequenceGenerator>,
    published: PublishedDescriptor,
}

impl Homewrecker {
    pub fn new(collaborators: Collaborators, config: HomewreckerConfig) -> Self {
        Self {
            collaborators,
            config,
            sequence: Arc::new(SequenceGenerator::new()),
            published: PublishedDescriptor::new(),
        }
    }

    pub fn config(&self) -> &HomewreckerConfig {
        &self.config
    }

    pub fn sequence(&self) -> Arc<SequenceGenerator> {
        Arc::clone(&self.sequence)
    }

    /// Handle on the published descriptor for readers elsewhere.
    pub fn published(&self) -> PublishedDescriptor {
        self.published.clone()
    }

    /// Copy of the descriptor published by the last successful boot.
    pub fn published_descriptor(&self) -> Option<FruDescriptor> {
        self.published.get()
    }

    fn pass(&self) -> Pass<'_> {
        Pass {
            collaborators: &self.collaborators,
            config: &self.config,
            sequence: &self.sequence,
            published: &self.published,
        }
    }

    /// Normal boot path. Service mode is requested for every verdict other
    /// than `Boot`.
    pub fn run_full_arbitration(&self) -> Result<Verdict> {
        let verdict = full::run(&self.pass())?;
        if let Some(reason) = verdict.service_mode_reason() {
            self.collaborators.service_mode.enter(reason);
        }
        Ok(verdict)
    }

    /// Early boot path.
    pub fn run_mini_arbitration(&self) -> Result<MiniVerdict> {
        let verdict = mini::run(&self.pass())?;
        if let MiniVerdict::ServiceMode(reason) = verdict {
            self.collaborators.service_mode.enter(reason);
        }
        Ok(verdict)
    }

    /// Initialize a fresh array: record the drives now in the system slots
    /// under the hardware chassis identity, stamp their signatures and
    /// publish the result.
    pub fn initialize_system_drives(&self) -> Result<FruDescriptor> {
        let chassis_wwn_seed = read_chassis_wwn_seed(&self.collaborators, &self.config.chassis_retry)?;
        self.sequence.initialize();

        let mut serials = [SerialNumber::blank(); SYSTEM_DRIVE_COUNT];
        let mut attached = Vec::with_capacity(SYSTEM_DRIVE_COUNT);
        for (slot, serial) in serials.iter_mut().enumerate() {
            match self.attached_serial(slot) {
                Ok(found) => {
                    *serial = found;
                    attached.push(slot);
                }
                Err(e) => tracing::warn!(slot, error = %e, "System slot left empty at initialization"),
            }
        }

        let descriptor = persist_descriptor(
            &self.collaborators,
            &self.sequence,
            &FruDescriptor::new(chassis_wwn_seed, serials),
        )?;
        for slot in attached {
            stamp_signature(&self.collaborators, slot, chassis_wwn_seed)?;
        }

        self.published.publish(descriptor.clone());
        tracing::info!(
            wwn_seed = chassis_wwn_seed,
            sequence = descriptor.sequence_number,
            "System drives initialized"
        );
        Ok(descriptor)
    }

    /// Record the drive now in `slot` as that slot's system drive.
    pub fn accept_replacement_drive(&self, slot: usize) -> Result<FruDescriptor> {
        if slot >= SYSTEM_DRIVE_COUNT {
            return Err(ArbitrationError::SlotOutOfRange(slot));
        }
        let mut descriptor = self.published.get().ok_or(ArbitrationError::NotPublished)?;
        let serial = self.attached_serial(slot)?;

        descriptor.system_drive_serial[slot] = serial;
        let descriptor = persist_descriptor(&self.collaborators, &self.sequence, &descriptor)?;
        stamp_signature(&self.collaborators, slot, descriptor.chassis_wwn_seed)?;

        self.published.publish(descriptor.clone());
        tracing::info!(slot, serial = %serial, sequence = descriptor.sequence_number, "Replacement system drive accepted");
        Ok(descriptor)
    }

    fn attached_serial(&self, slot: usize) -> Result<SerialNumber> {
        let topology = &self.collaborators.topology;
        let location = DriveLocation::system_slot(slot);
        let topology_error = |source: StorageError| ArbitrationError::Topology { slot, source };

        let handle = topology.resolve(location).map_err(topology_error)?;
        let state = topology.lifecycle_state(handle).map_err(topology_error)?;
        if !state.is_path_enabled() {
            return Err(topology_error(StorageError::DriveUnaccessible(location)));
        }
        topology.serial_number(handle).map_err(topology_error)
    }
}

impl std::fmt::Debug for Homewrecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Homewrecker")
            .field("config", &self.config)
            .field("sequence", &self.sequence.current())
            .finish_non_exhaustive()
    }
}
