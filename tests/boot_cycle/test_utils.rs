//! Shared fixtures for the boot cycle suite.

use homewrecker::{Collaborators, DriveLocation, Homewrecker, HomewreckerConfig, InMemoryArray, RetryPolicy};
use std::sync::Arc;

pub const CHASSIS: u32 = 0x00C4_A551;

pub fn config() -> HomewreckerConfig {
    HomewreckerConfig {
        chassis_retry: RetryPolicy::no_retry(),
        ..Default::default()
    }
}

pub fn arbitrator(array: &Arc<InMemoryArray>) -> Homewrecker {
    Homewrecker::new(Collaborators::from_backend(array.clone()), config())
}

/// Array with four system drives initialized by a previous boot.
pub fn initialized_array(chassis_wwn_seed: u32) -> Arc<InMemoryArray> {
    let array = Arc::new(InMemoryArray::new(chassis_wwn_seed));
    for slot in 0..4 {
        array.insert_drive(DriveLocation::system_slot(slot), format!("SYS-{}", slot));
    }
    arbitrator(&array)
        .initialize_system_drives()
        .expect("initialize system drives");
    array
}
