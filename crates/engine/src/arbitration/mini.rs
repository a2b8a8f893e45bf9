//! Early boot path
//!
//! Runs before the configuration service is fully up and only decides
//! between booting and service mode. No disorder detection and no chassis
//! reconciliation: a chassis mismatch goes straight to service mode.

use homewrecker_core::{HomewreckerEvent, ServiceModeReason};

use super::{MiniVerdict, Pass, Resolved};
use crate::error::Result;

const MAX_INVALID_SLOTS: usize = 2;

enum State {
    Start,
    MarkInvalid(Resolved),
    CheckChassis(Resolved),
    CheckInvalidCount(Resolved),
    Boot(Resolved),
    Finished(MiniVerdict),
}

pub(crate) fn run(pass: &Pass<'_>) -> Result<MiniVerdict> {
    let mut state = State::Start;
    loop {
        state = match state {
            State::Start => match pass.resolve_standard()? {
                Some(resolved) => State::MarkInvalid(resolved),
                None => State::Finished(MiniVerdict::ServiceMode(
                    ServiceModeReason::SystemDriveIntegrityBroken,
                )),
            },

            State::MarkInvalid(mut resolved) => {
                resolved.table = pass
                    .mark_invalid(resolved.table, &resolved.standard)
                    .with_invalid_where(|entry| {
                        entry
                            .signature
                            .record()
                            .map_or(false, |sig| !sig.is_self_consistent(entry.location))
                    });
                State::CheckChassis(resolved)
            }

            State::CheckChassis(resolved) => {
                let chassis_wwn_seed = resolved.chassis_wwn_seed;
                let descriptor_wwn_seed = resolved.standard.chassis_wwn_seed;
                if chassis_wwn_seed == descriptor_wwn_seed {
                    State::CheckInvalidCount(resolved)
                } else {
                    tracing::warn!(
                        wwn_seed = descriptor_wwn_seed,
                        chassis_wwn_seed,
                        "Chassis identity does not match system drives"
                    );
                    pass.collaborators
                        .events
                        .emit(HomewreckerEvent::ChassisMismatched {
                            descriptor_wwn_seed,
                            chassis_wwn_seed,
                        });
                    State::Finished(MiniVerdict::ServiceMode(ServiceModeReason::ChassisMismatched))
                }
            }

            State::CheckInvalidCount(resolved) => {
                let invalid = resolved.table.invalid_slots();
                if invalid.len() > MAX_INVALID_SLOTS {
                    pass.report_integrity_broken(&resolved.table);
                    State::Finished(MiniVerdict::ServiceMode(
                        ServiceModeReason::SystemDriveIntegrityBroken,
                    ))
                } else if invalid.len() == MAX_INVALID_SLOTS {
                    if pass.config.same_mirror_pair(invalid[0], invalid[1]) {
                        tracing::warn!(slots = ?invalid, "Both drives of a mirrored pair are invalid");
                        pass.collaborators
                            .events
                            .emit(HomewreckerEvent::MirrorPairLost {
                                slots: [invalid[0], invalid[1]],
                            });
                        State::Finished(MiniVerdict::ServiceMode(ServiceModeReason::MirrorPairLost))
                    } else {
                        // Each pair keeps one mirror. The drives stay attached
                        // so the full pass sees them as they are.
                        tracing::info!(slots = ?invalid, "One drive lost from each mirrored pair");
                        State::Finished(MiniVerdict::Boot)
                    }
                } else {
                    State::Boot(resolved)
                }
            }

            State::Boot(Resolved { table, standard, .. }) => {
                pass.disconnect_invalid(&table)?;
                pass.publish(&standard);
                State::Finished(MiniVerdict::Boot)
            }

            State::Finished(verdict) => {
                tracing::info!(verdict = ?verdict, "Mini arbitration finished");
                return Ok(verdict);
            }
        };
    }
}
