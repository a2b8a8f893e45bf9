//! Chassis-Replacement Reconciler
//!
//! Compares the standard descriptor's chassis identity with the hardware's
//! and applies the operator's recorded intent:
//!
//! | chassis | replacement flag | user modified | action                                   |
//! |---------|------------------|---------------|------------------------------------------|
//! | equal   | set              | any           | clear flag, re-persist, clear user flag  |
//! | equal   | clear            | set           | clear user flag                          |
//! | equal   | clear            | clear         | none                                     |
//! | differ  | set              | clear         | planned swap: store array identity       |
//! | differ  | clear            | set           | re-persist as is, clear user flag        |
//! | differ  | set              | set           | wwn seed chaos                           |
//! | differ  | clear            | clear         | chassis mismatched                       |
//!
//! An accepted operator-modified seed holds for the current boot only. The
//! descriptor keeps its seed and the chassis store is not written, so the
//! next boot reports a mismatch once the user flag is cleared.

use homewrecker_core::{FruDescriptor, HomewreckerEvent, ReplacementFlag, SequenceGenerator};
use homewrecker_storage::RetryPolicy;

use crate::context::Collaborators;
use crate::error::{ArbitrationError, Result};
use crate::persist::{persist_descriptor, write_chassis_wwn_seed};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Boot may continue with this (possibly re-persisted) descriptor.
    Continue(FruDescriptor),
    ChassisMismatched,
    WwnSeedChaos,
}

pub struct Reconciler<'a> {
    collaborators: &'a Collaborators,
    sequence: &'a SequenceGenerator,
    retry: RetryPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(collaborators: &'a Collaborators, sequence: &'a SequenceGenerator, retry: RetryPolicy) -> Self {
        Self {
            collaborators,
            sequence,
            retry,
        }
    }

    /// `chassis_wwn_seed` is the hardware identity read for this pass.
    pub fn reconcile(&self, standard: &FruDescriptor, chassis_wwn_seed: u32) -> Result<ReconcileOutcome> {
        let user_modified = self
            .collaborators
            .user_flag
            .get()
            .map_err(ArbitrationError::ChassisIdentity)?;
        let replacement_planned = standard.chassis_replacement_flag.is_set();
        let equal = chassis_wwn_seed == standard.chassis_wwn_seed;

        tracing::debug!(
            wwn_seed = standard.chassis_wwn_seed,
            chassis_wwn_seed,
            replacement_planned,
            user_modified,
            "Reconciling chassis identity"
        );

        match (equal, replacement_planned, user_modified) {
            (true, true, _) => {
                let descriptor = self.persist_without_flag(standard)?;
                if user_modified {
                    self.clear_user_modified()?;
                }
                Ok(ReconcileOutcome::Continue(descriptor))
            }
            (true, false, true) => {
                self.clear_user_modified()?;
                Ok(ReconcileOutcome::Continue(standard.clone()))
            }
            (true, false, false) => Ok(ReconcileOutcome::Continue(standard.clone())),
            (false, true, false) => {
                write_chassis_wwn_seed(self.collaborators, &self.retry, standard.chassis_wwn_seed)?;
                let descriptor = self.persist_without_flag(standard)?;
                tracing::info!(
                    previous_chassis_wwn_seed = chassis_wwn_seed,
                    wwn_seed = standard.chassis_wwn_seed,
                    "Planned chassis replacement completed"
                );
                self.collaborators.events.emit(HomewreckerEvent::ChassisReplaced {
                    previous_chassis_wwn_seed: chassis_wwn_seed,
                    chassis_wwn_seed: standard.chassis_wwn_seed,
                });
                Ok(ReconcileOutcome::Continue(descriptor))
            }
            (false, false, true) => {
                let descriptor = persist_descriptor(self.collaborators, self.sequence, standard)?;
                self.clear_user_modified()?;
                tracing::info!(
                    wwn_seed = standard.chassis_wwn_seed,
                    chassis_wwn_seed,
                    "Accepted operator-modified wwn seed"
                );
                self.collaborators
                    .events
                    .emit(HomewreckerEvent::UserModifiedWwnSeedAccepted {
                        descriptor_wwn_seed: standard.chassis_wwn_seed,
                    });
                Ok(ReconcileOutcome::Continue(descriptor))
            }
            (false, true, true) => {
                tracing::warn!(
                    wwn_seed = standard.chassis_wwn_seed,
                    chassis_wwn_seed,
                    "Chassis replacement and wwn seed modification both requested"
                );
                self.collaborators.events.emit(HomewreckerEvent::WwnSeedChaos {
                    descriptor_wwn_seed: standard.chassis_wwn_seed,
                    chassis_wwn_seed,
                });
                Ok(ReconcileOutcome::WwnSeedChaos)
            }
            (false, false, false) => {
                tracing::warn!(
                    wwn_seed = standard.chassis_wwn_seed,
                    chassis_wwn_seed,
                    "Chassis identity does not match system drives"
                );
                self.collaborators.events.emit(HomewreckerEvent::ChassisMismatched {
                    descriptor_wwn_seed: standard.chassis_wwn_seed,
                    chassis_wwn_seed,
                });
                Ok(ReconcileOutcome::ChassisMismatched)
            }
        }
    }

    fn persist_without_flag(&self, standard: &FruDescriptor) -> Result<FruDescriptor> {
        let mut cleared = standard.clone();
        cleared.chassis_replacement_flag = ReplacementFlag::NotPlanned;
        persist_descriptor(self.collaborators, self.sequence, &cleared)
    }

    fn clear_user_modified(&self) -> Result<()> {
        self.collaborators
            .user_flag
            .clear()
            .map_err(ArbitrationError::ChassisIdentity)
    }
}
