//! Quorum Resolver
//!
//! Picks the standard descriptor for the pass:
//!
//! 1. a fully healthy replicated read that decodes with a non-zero sequence
//!    is trusted directly
//! 2. otherwise the mirrored slots' own copies are candidates when their
//!    magic matched and their sequence is non-zero
//! 3. the freshest candidate written under the current chassis wins
//! 4. with none, the freshest candidate wins provided every candidate
//!    agrees on the chassis identity; disagreement or no candidates at all
//!    breaks integrity
//!
//! Ties go to the lowest slot. The chosen sequence is adopted by the
//! generator.

use homewrecker_core::{FruDescriptor, SequenceError, SequenceGenerator, MIRRORED_SLOT_COUNT};
use homewrecker_storage::ReplicatedRead;
use serde::Serialize;

use crate::table::RecordRead;

/// Where the standard descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardSource {
    Replicated,
    Slot(usize),
}

/// The descriptor chosen as ground truth for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardDisk {
    pub descriptor: FruDescriptor,
    pub source: StandardSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Standard(StandardDisk),
    IntegrityBroken,
}

/// Resolve the standard descriptor from the replicated read and the
/// mirrored slots' copies (slot order).
pub fn resolve(
    replicated: Option<&ReplicatedRead>,
    copies: &[RecordRead<FruDescriptor>],
    chassis_wwn_seed: u32,
    sequence: &SequenceGenerator,
) -> Result<Resolution, SequenceError> {
    let standard = match trusted_replicated(replicated) {
        Some(descriptor) => {
            tracing::debug!(
                sequence = descriptor.sequence_number,
                wwn_seed = descriptor.chassis_wwn_seed,
                "Replicated descriptor read is healthy"
            );
            StandardDisk {
                descriptor,
                source: StandardSource::Replicated,
            }
        }
        None => match from_copies(copies, chassis_wwn_seed) {
            Some(standard) => standard,
            None => {
                tracing::warn!(wwn_seed = chassis_wwn_seed, "No standard descriptor could be chosen");
                return Ok(Resolution::IntegrityBroken);
            }
        },
    };

    sequence.adopt(standard.descriptor.sequence_number)?;
    tracing::info!(
        source = ?standard.source,
        sequence = standard.descriptor.sequence_number,
        wwn_seed = standard.descriptor.chassis_wwn_seed,
        "Standard descriptor chosen"
    );
    Ok(Resolution::Standard(standard))
}

fn trusted_replicated(replicated: Option<&ReplicatedRead>) -> Option<FruDescriptor> {
    let read = replicated?;
    if !read.report.fully_healthy() {
        tracing::debug!(report = ?read.report, "Replicated descriptor read is degraded");
        return None;
    }
    match FruDescriptor::decode(&read.data) {
        Ok(descriptor) if descriptor.sequence_number != 0 => Some(descriptor),
        Ok(_) => {
            tracing::debug!("Replicated descriptor carries reserved sequence 0");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Replicated descriptor does not decode");
            None
        }
    }
}

fn from_copies(copies: &[RecordRead<FruDescriptor>], chassis_wwn_seed: u32) -> Option<StandardDisk> {
    let candidates: Vec<(usize, &FruDescriptor)> = copies
        .iter()
        .take(MIRRORED_SLOT_COUNT)
        .enumerate()
        .filter_map(|(slot, copy)| copy.record().map(|d| (slot, d)))
        .filter(|(_, d)| d.sequence_number != 0)
        .collect();

    let matching = freshest(
        candidates
            .iter()
            .copied()
            .filter(|(_, d)| d.chassis_wwn_seed == chassis_wwn_seed),
    );
    if let Some(standard) = matching {
        return Some(standard);
    }

    let reference = candidates.first()?.1.chassis_wwn_seed;
    if candidates.iter().any(|(_, d)| d.chassis_wwn_seed != reference) {
        tracing::warn!(
            wwn_seed = chassis_wwn_seed,
            "Descriptor copies disagree on chassis identity"
        );
        return None;
    }
    tracing::debug!(
        wwn_seed = reference,
        chassis_wwn_seed,
        "No copy matches the chassis; copies agree with each other"
    );
    freshest(candidates.into_iter())
}

fn freshest<'a>(candidates: impl Iterator<Item = (usize, &'a FruDescriptor)>) -> Option<StandardDisk> {
    let mut best: Option<(usize, &FruDescriptor)> = None;
    for (slot, descriptor) in candidates {
        match best {
            Some((_, current)) if !descriptor.is_fresher_than(current) => {}
            _ => best = Some((slot, descriptor)),
        }
    }
    best.map(|(slot, descriptor)| StandardDisk {
        descriptor: descriptor.clone(),
        source: StandardSource::Slot(slot),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use homewrecker_core::{FormatError, SerialNumber};
    use homewrecker_storage::{StorageError, VerifyReport};

    const CHASSIS: u32 = 0xC0FF_EE00;

    fn copy(seed: u32, sequence: u32) -> RecordRead<FruDescriptor> {
        let mut d = FruDescriptor::new(seed, [SerialNumber::new("S"); 4]);
        d.sequence_number = sequence;
        RecordRead::Valid(d)
    }

    fn standard(resolution: Resolution) -> StandardDisk {
        match resolution {
            Resolution::Standard(s) => s,
            Resolution::IntegrityBroken => panic!("expected a standard descriptor"),
        }
    }

    #[test]
    fn picks_highest_matching_sequence() {
        let seq = SequenceGenerator::new();
        let copies = [copy(CHASSIS, 5), copy(CHASSIS, 7), copy(CHASSIS, 3)];
        let s = standard(resolve(None, &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.descriptor.sequence_number, 7);
        assert_eq!(s.source, StandardSource::Slot(1));
        assert_eq!(seq.current(), 7);
    }

    #[test]
    fn ties_go_to_first_slot() {
        let seq = SequenceGenerator::new();
        let copies = [copy(CHASSIS, 4), copy(CHASSIS, 9), copy(CHASSIS, 9)];
        let s = standard(resolve(None, &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.source, StandardSource::Slot(1));
    }

    #[test]
    fn matching_chassis_beats_fresher_foreign_copy() {
        let seq = SequenceGenerator::new();
        let copies = [copy(0xBAD, 50), copy(CHASSIS, 2), copy(0xBAD, 60)];
        let s = standard(resolve(None, &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.descriptor.sequence_number, 2);
        assert_eq!(s.descriptor.chassis_wwn_seed, CHASSIS);
    }

    #[test]
    fn agreeing_foreign_copies_pick_highest() {
        let seq = SequenceGenerator::new();
        let copies = [copy(0xAB, 5), copy(0xAB, 9), copy(0xAB, 3)];
        let s = standard(resolve(None, &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.descriptor.sequence_number, 9);
        assert_eq!(s.descriptor.chassis_wwn_seed, 0xAB);
    }

    #[test]
    fn disagreeing_foreign_copies_break_integrity() {
        let seq = SequenceGenerator::new();
        let copies = [copy(0xA1, 5), copy(0xA2, 9), copy(0xA3, 3)];
        assert_eq!(
            resolve(None, &copies, CHASSIS, &seq).unwrap(),
            Resolution::IntegrityBroken
        );
        assert!(!seq.is_initialized());
    }

    #[test]
    fn zero_sequence_copies_are_not_candidates() {
        let seq = SequenceGenerator::new();
        let copies = [
            copy(CHASSIS, 0),
            RecordRead::Invalid(FormatError::BadMagic),
            RecordRead::Failed(StorageError::NoReplica),
        ];
        assert_eq!(
            resolve(None, &copies, CHASSIS, &seq).unwrap(),
            Resolution::IntegrityBroken
        );
    }

    #[test]
    fn healthy_replicated_read_is_trusted() {
        let seq = SequenceGenerator::new();
        let mut d = FruDescriptor::new(0x77, [SerialNumber::new("S"); 4]);
        d.sequence_number = 12;
        let read = ReplicatedRead {
            data: d.encode().to_vec(),
            report: VerifyReport::healthy(),
        };
        let copies = [copy(CHASSIS, 99), copy(CHASSIS, 99), copy(CHASSIS, 99)];

        let s = standard(resolve(Some(&read), &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.source, StandardSource::Replicated);
        assert_eq!(s.descriptor, d);
        assert_eq!(seq.current(), 12);
    }

    #[test]
    fn degraded_replicated_read_falls_back_to_copies() {
        let seq = SequenceGenerator::new();
        let mut d = FruDescriptor::new(CHASSIS, [SerialNumber::new("S"); 4]);
        d.sequence_number = 12;
        let read = ReplicatedRead {
            data: d.encode().to_vec(),
            report: VerifyReport {
                checksum_error_bitmap: 0b001,
                ..Default::default()
            },
        };
        let copies = [
            RecordRead::Invalid(FormatError::BadMagic),
            copy(CHASSIS, 11),
            copy(CHASSIS, 12),
        ];

        let s = standard(resolve(Some(&read), &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.source, StandardSource::Slot(2));
    }

    #[test]
    fn healthy_read_with_sequence_zero_falls_back() {
        let seq = SequenceGenerator::new();
        let d = FruDescriptor::new(CHASSIS, [SerialNumber::new("S"); 4]);
        let read = ReplicatedRead {
            data: d.encode().to_vec(),
            report: VerifyReport::healthy(),
        };
        let copies = [copy(CHASSIS, 3)];
        let s = standard(resolve(Some(&read), &copies, CHASSIS, &seq).unwrap());
        assert_eq!(s.source, StandardSource::Slot(0));
    }
}
