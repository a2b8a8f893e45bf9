//! Full boot path
//!
//! ```text
//! Start -> MarkInvalid -> { IntegrityBroken, CheckDisorder }
//! CheckDisorder -> { Disordered, CheckWwnSeed }
//! CheckWwnSeed -> { ChassisMismatched, WwnSeedChaos, CheckDoubleInvalid }
//! CheckDoubleInvalid -> { DoubleInvalidUserSlot, Boot }
//! ```

use homewrecker_core::{DriveLocation, HomewreckerEvent};

use super::{Pass, Resolved, Verdict};
use crate::error::Result;
use crate::reconcile::{ReconcileOutcome, Reconciler};

/// Most invalid slots the array can boot with.
const MAX_INVALID_SLOTS: usize = 2;

enum State {
    Start,
    MarkInvalid(Resolved),
    CheckDisorder(Resolved),
    CheckWwnSeed(Resolved),
    CheckDoubleInvalid(Resolved),
    Boot(Resolved),
    Finished(Verdict),
}

pub(crate) fn run(pass: &Pass<'_>) -> Result<Verdict> {
    let mut state = State::Start;
    loop {
        state = match state {
            State::Start => match pass.resolve_standard()? {
                Some(resolved) => State::MarkInvalid(resolved),
                None => State::Finished(Verdict::IntegrityBroken),
            },

            State::MarkInvalid(mut resolved) => {
                resolved.table = pass.mark_invalid(resolved.table, &resolved.standard);
                if resolved.table.invalid_count() > MAX_INVALID_SLOTS {
                    pass.report_integrity_broken(&resolved.table);
                    State::Finished(Verdict::IntegrityBroken)
                } else {
                    State::CheckDisorder(resolved)
                }
            }

            State::CheckDisorder(resolved) => check_disorder(pass, resolved),

            State::CheckWwnSeed(mut resolved) => {
                let reconciler = Reconciler::new(
                    pass.collaborators,
                    pass.sequence,
                    pass.config.chassis_retry,
                );
                match reconciler.reconcile(&resolved.standard, resolved.chassis_wwn_seed)? {
                    ReconcileOutcome::Continue(standard) => {
                        resolved.standard = standard;
                        if resolved.table.invalid_count() == MAX_INVALID_SLOTS {
                            State::CheckDoubleInvalid(resolved)
                        } else {
                            State::Boot(resolved)
                        }
                    }
                    ReconcileOutcome::ChassisMismatched => State::Finished(Verdict::ChassisMismatched),
                    ReconcileOutcome::WwnSeedChaos => State::Finished(Verdict::WwnSeedChaos),
                }
            }

            State::CheckDoubleInvalid(resolved) => check_double_invalid(pass, resolved),

            State::Boot(Resolved { table, standard, .. }) => {
                pass.disconnect_invalid(&table)?;
                pass.publish(&standard);
                for entry in table.entries().iter().filter(|e| e.is_invalid) {
                    if entry.disk_type.has_dedicated_report() {
                        continue;
                    }
                    tracing::warn!(slot = entry.slot, disk_type = %entry.disk_type, "Booting without system drive");
                    pass.collaborators
                        .events
                        .emit(HomewreckerEvent::InvalidSystemDrive {
                            slot: entry.slot,
                            disk_type: entry.disk_type,
                        });
                }
                State::Finished(Verdict::Boot)
            }

            State::Finished(verdict) => {
                tracing::info!(verdict = ?verdict, "Full arbitration finished");
                return Ok(verdict);
            }
        };
    }
}

/// Each valid slot must hold the drive the standard expects there, and that
/// drive's signature must claim this slot.
fn check_disorder(pass: &Pass<'_>, resolved: Resolved) -> State {
    let standard = &resolved.standard;
    let misplaced: Vec<usize> = resolved
        .table
        .entries()
        .iter()
        .filter(|e| !e.is_invalid)
        .filter(|entry| {
            let serial_in_place = match (standard.serial_for_slot(entry.slot), &entry.serial) {
                (Some(expected), Some(actual)) => expected.matches(actual),
                _ => false,
            };
            let claims_this_slot = entry
                .signature
                .record()
                .map_or(false, |sig| sig.is_self_consistent(entry.location));
            if !(serial_in_place && claims_this_slot) {
                tracing::debug!(
                    slot = entry.slot,
                    serial_in_place,
                    claims_this_slot,
                    "System drive out of order"
                );
                true
            } else {
                false
            }
        })
        .map(|e| e.slot)
        .collect();

    if misplaced.is_empty() {
        return State::CheckWwnSeed(resolved);
    }

    let table = misplaced
        .iter()
        .fold(resolved.table, |table, &slot| table.with_invalid(slot));
    tracing::warn!(slots = ?misplaced, "System drives disordered");
    pass.collaborators
        .events
        .emit(HomewreckerEvent::SystemDrivesDisordered {
            claimed_slots: table.claimed_slots(),
        });
    State::Finished(Verdict::Disordered)
}

/// With two slots invalid, refuse to boot if either slot's own drive is
/// sitting in a user slot.
fn check_double_invalid(pass: &Pass<'_>, mut resolved: Resolved) -> State {
    let mut found_in_user_slot = false;

    for slot in resolved.table.invalid_slots() {
        let Some(expected) = resolved.standard.serial_for_slot(slot).copied() else {
            continue;
        };
        if expected.is_blank() {
            continue;
        }
        let actual = match pass.collaborators.topology.locate_serial(&expected) {
            Ok(Some(location)) => location,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(slot, error = %e, "Could not locate expected system drive");
                continue;
            }
        };
        resolved.table = resolved.table.with_actual_location(slot, actual);
        if actual.is_system_slot() {
            continue;
        }

        found_in_user_slot = true;
        let expected_location = DriveLocation::system_slot(slot);
        tracing::warn!(
            slot,
            serial = %expected,
            actual = %actual,
            "System drive found in user slot"
        );
        pass.collaborators
            .events
            .emit(HomewreckerEvent::SystemDriveInUserSlot {
                serial: expected,
                expected: expected_location,
                actual,
            });
    }

    if found_in_user_slot {
        State::Finished(Verdict::DoubleInvalidUserSlot)
    } else {
        State::Boot(resolved)
    }
}
