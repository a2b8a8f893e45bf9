//! Writes of the private-region records, and chassis store access.

use homewrecker_core::{DriveLocation, FruDescriptor, FruSignature, SequenceGenerator};
use homewrecker_storage::{PrivateRegion, RetryPolicy};

use crate::context::Collaborators;
use crate::error::{ArbitrationError, Result};

/// Stamp the next sequence into `descriptor` and write it through the
/// replicated region. Returns the descriptor as written.
pub(crate) fn persist_descriptor(
    collaborators: &Collaborators,
    sequence: &SequenceGenerator,
    descriptor: &FruDescriptor,
) -> Result<FruDescriptor> {
    let mut stamped = descriptor.clone();
    stamped.sequence_number = sequence.next()?;

    let report = collaborators
        .replicated
        .write(PrivateRegion::FruDescriptor, 0, &stamped.encode())
        .map_err(ArbitrationError::DescriptorPersist)?;
    if !report.fully_healthy() {
        tracing::warn!(
            sequence = stamped.sequence_number,
            failed_replicas = report.failed_replica_count(),
            "Descriptor persisted with degraded replicas"
        );
    }

    tracing::info!(
        sequence = stamped.sequence_number,
        wwn_seed = stamped.chassis_wwn_seed,
        "Descriptor persisted"
    );
    Ok(stamped)
}

/// Write the signature of the drive in system slot `slot`.
pub(crate) fn stamp_signature(collaborators: &Collaborators, slot: usize, wwn_seed: u32) -> Result<()> {
    let location = DriveLocation::system_slot(slot);
    let signature = FruSignature::new(wwn_seed, location);
    collaborators
        .drives
        .write(location, PrivateRegion::FruSignature, &signature.encode())
        .map_err(|source| ArbitrationError::SignaturePersist { slot, source })?;
    tracing::info!(slot, wwn_seed, "Signature stamped");
    Ok(())
}

pub(crate) fn read_chassis_wwn_seed(collaborators: &Collaborators, retry: &RetryPolicy) -> Result<u32> {
    retry
        .run("chassis_identity_get", || collaborators.chassis.get())
        .map_err(ArbitrationError::ChassisIdentity)
}

pub(crate) fn write_chassis_wwn_seed(
    collaborators: &Collaborators,
    retry: &RetryPolicy,
    wwn_seed: u32,
) -> Result<()> {
    retry
        .run("chassis_identity_set", || collaborators.chassis.set(wwn_seed))
        .map_err(ArbitrationError::ChassisIdentity)?;
    tracing::info!(wwn_seed, "Chassis identity updated");
    Ok(())
}
