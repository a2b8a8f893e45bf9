//! JSON scenarios for the in-memory array
//!
//! A scenario lists the drives to insert, optionally initializes them as a
//! fresh array (the "previous boot"), then applies actions that rearrange
//! the hardware before arbitration runs.
//!
//! ```json
//! {
//!   "chassis_wwn_seed": 4096,
//!   "initialize": true,
//!   "drives": [
//!     { "location": { "bus": 0, "enclosure": 0, "slot": 0 }, "serial": "SYS-0" }
//!   ],
//!   "actions": [
//!     { "action": "swap_drives", "a": { "bus": 0, "enclosure": 0, "slot": 0 },
//!       "b": { "bus": 0, "enclosure": 0, "slot": 1 } }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use homewrecker_core::{DriveLocation, FruDescriptor, FruSignature, ReplacementFlag, DESCRIPTOR_SIZE};
use homewrecker_engine::{Collaborators, Homewrecker, HomewreckerConfig};
use homewrecker_storage::{InMemoryArray, LifecycleState, PrivateRegion, ReplicatedRegion};
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Clone, Deserialize)]
pub struct DriveSpec {
    pub location: DriveLocation,
    pub serial: String,
    #[serde(default)]
    pub lifecycle: Option<LifecycleState>,
    /// Raw descriptor copy to place on the drive.
    #[serde(default)]
    pub descriptor: Option<FruDescriptor>,
    #[serde(default)]
    pub signature: Option<FruSignature>,
    #[serde(default)]
    pub io_failing: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    InsertDrive { location: DriveLocation, serial: String },
    RemoveDrive { location: DriveLocation },
    MoveDrive { from: DriveLocation, to: DriveLocation },
    SwapDrives { a: DriveLocation, b: DriveLocation },
    SetChassisWwnSeed { wwn_seed: u32 },
    SetUserModified { modified: bool },
    CorruptDescriptor { location: DriveLocation },
    FailIo { location: DriveLocation },
    FailDisconnect { location: DriveLocation },
    FailChassisStore { times: u32 },
    /// Record a planned chassis replacement in the replicated descriptor.
    PlanChassisReplacement,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub chassis_wwn_seed: u32,
    #[serde(default)]
    pub user_modified: bool,
    #[serde(default)]
    pub initialize: bool,
    pub drives: Vec<DriveSpec>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Build the array described by the scenario.
    pub fn build(&self, config: &HomewreckerConfig) -> Result<Arc<InMemoryArray>, CliError> {
        let array = Arc::new(InMemoryArray::new(self.chassis_wwn_seed));
        array.set_user_modified(self.user_modified);

        for drive in &self.drives {
            array.insert_drive(drive.location, drive.serial.as_str());
            if let Some(descriptor) = &drive.descriptor {
                array.install_descriptor(drive.location, descriptor);
            }
            if let Some(signature) = &drive.signature {
                array.install_signature(drive.location, signature);
            }
        }

        if self.initialize {
            Homewrecker::new(Collaborators::from_backend(array.clone()), config.clone())
                .initialize_system_drives()?;
        }

        // Lifecycle and failure hooks apply after initialization so that
        // they describe the boot under test.
        for drive in &self.drives {
            if let Some(lifecycle) = drive.lifecycle {
                array.set_lifecycle(drive.location, lifecycle);
            }
            if drive.io_failing {
                array.set_io_failing(drive.location, true);
            }
        }

        for action in &self.actions {
            apply(&array, action)?;
        }
        Ok(array)
    }
}

fn apply(array: &InMemoryArray, action: &Action) -> Result<(), CliError> {
    tracing::debug!(action = ?action, "Applying scenario action");
    match action {
        Action::InsertDrive { location, serial } => {
            array.insert_drive(*location, serial.as_str());
        }
        Action::RemoveDrive { location } => {
            if array.remove_drive(*location).is_none() {
                return Err(CliError::Scenario(format!("no drive to remove at {}", location)));
            }
        }
        Action::MoveDrive { from, to } => {
            if !array.move_drive(*from, *to) {
                return Err(CliError::Scenario(format!("cannot move drive from {} to {}", from, to)));
            }
        }
        Action::SwapDrives { a, b } => array.swap_drives(*a, *b),
        Action::SetChassisWwnSeed { wwn_seed } => array.set_chassis_wwn_seed(*wwn_seed),
        Action::SetUserModified { modified } => array.set_user_modified(*modified),
        Action::CorruptDescriptor { location } => {
            if !array.corrupt_region(*location, PrivateRegion::FruDescriptor, 0) {
                return Err(CliError::Scenario(format!("no drive to corrupt at {}", location)));
            }
        }
        Action::FailIo { location } => array.set_io_failing(*location, true),
        Action::FailDisconnect { location } => array.set_disconnect_failing(*location, true),
        Action::FailChassisStore { times } => array.fail_chassis_store(*times),
        Action::PlanChassisReplacement => {
            let read = ReplicatedRegion::read(array, PrivateRegion::FruDescriptor, 0, DESCRIPTOR_SIZE)
                .map_err(|e| CliError::Scenario(format!("no descriptor to update: {}", e)))?;
            let mut descriptor = FruDescriptor::decode(&read.data)
                .map_err(|e| CliError::Scenario(format!("no descriptor to update: {}", e)))?;
            descriptor.chassis_replacement_flag = ReplacementFlag::Planned;
            descriptor.sequence_number = descriptor.sequence_number.wrapping_add(1).max(1);
            ReplicatedRegion::write(array, PrivateRegion::FruDescriptor, 0, &descriptor.encode())
                .map_err(|e| CliError::Scenario(format!("descriptor update failed: {}", e)))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FOUR_DRIVES: &str = r#"{
        "chassis_wwn_seed": 4096,
        "initialize": true,
        "drives": [
            { "location": { "bus": 0, "enclosure": 0, "slot": 0 }, "serial": "SYS-0" },
            { "location": { "bus": 0, "enclosure": 0, "slot": 1 }, "serial": "SYS-1" },
            { "location": { "bus": 0, "enclosure": 0, "slot": 2 }, "serial": "SYS-2" },
            { "location": { "bus": 0, "enclosure": 0, "slot": 3 }, "serial": "SYS-3" }
        ],
        "actions": [
            { "action": "set_chassis_wwn_seed", "wwn_seed": 8192 },
            { "action": "plan_chassis_replacement" }
        ]
    }"#;

    #[test]
    fn parses_drives_and_actions() {
        let scenario = Scenario::from_json(FOUR_DRIVES).unwrap();
        assert_eq!(scenario.chassis_wwn_seed, 4096);
        assert!(scenario.initialize);
        assert!(!scenario.user_modified);
        assert_eq!(scenario.drives.len(), 4);
        assert_eq!(scenario.drives[2].location, DriveLocation::system_slot(2));
        assert_eq!(
            scenario.actions,
            vec![
                Action::SetChassisWwnSeed { wwn_seed: 8192 },
                Action::PlanChassisReplacement
            ]
        );
    }

    #[test]
    fn build_initializes_and_applies_actions() {
        let scenario = Scenario::from_json(FOUR_DRIVES).unwrap();
        let array = scenario.build(&HomewreckerConfig::default()).unwrap();

        assert_eq!(array.chassis_wwn_seed(), 8192);
        let descriptor = array.descriptor_at(DriveLocation::system_slot(0)).unwrap();
        assert_eq!(descriptor.chassis_wwn_seed, 4096);
        assert_eq!(descriptor.chassis_replacement_flag, ReplacementFlag::Planned);
        assert_eq!(descriptor.sequence_number, 3);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let text = r#"{ "chassis_wwn_seed": 1, "drives": [], "actions": [ { "action": "explode" } ] }"#;
        assert!(matches!(Scenario::from_json(text), Err(CliError::Json(_))));
    }

    #[test]
    fn removing_absent_drive_fails() {
        let text = r#"{
            "chassis_wwn_seed": 1,
            "drives": [],
            "actions": [ { "action": "remove_drive", "location": { "bus": 0, "enclosure": 0, "slot": 1 } } ]
        }"#;
        let scenario = Scenario::from_json(text).unwrap();
        assert!(matches!(
            scenario.build(&HomewreckerConfig::default()),
            Err(CliError::Scenario(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FOUR_DRIVES.as_bytes()).unwrap();
        let scenario = Scenario::from_file(file.path()).unwrap();
        assert_eq!(scenario.drives.len(), 4);
    }
}
