//! Collaborator bundle handed to the arbitrator.

use std::sync::Arc;

use homewrecker_storage::{
    ChassisIdentityStore, DriveIo, DriveTopology, EventLog, ReplicatedRegion, ServiceMode,
    UserModifiedFlag,
};

/// Every external service an arbitration pass talks to.
///
/// Clone is cheap (Arc clones).
#[derive(Clone)]
pub struct Collaborators {
    pub replicated: Arc<dyn ReplicatedRegion>,
    pub drives: Arc<dyn DriveIo>,
    pub topology: Arc<dyn DriveTopology>,
    pub chassis: Arc<dyn ChassisIdentityStore>,
    pub user_flag: Arc<dyn UserModifiedFlag>,
    pub events: Arc<dyn EventLog>,
    pub service_mode: Arc<dyn ServiceMode>,
}

impl Collaborators {
    /// Use one backend for every collaborator.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ReplicatedRegion
            + DriveIo
            + DriveTopology
            + ChassisIdentityStore
            + UserModifiedFlag
            + EventLog
            + ServiceMode
            + 'static,
    {
        Self {
            replicated: backend.clone(),
            drives: backend.clone(),
            topology: backend.clone(),
            chassis: backend.clone(),
            user_flag: backend.clone(),
            events: backend.clone(),
            service_mode: backend,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
