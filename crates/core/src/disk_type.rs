//! Disk classification labels and their trust table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a drive in a system slot turned out to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskType {
    /// Not classified yet.
    #[default]
    Unknown,
    /// Classification could not be assigned.
    InvalidType,
    /// One of this array's system drives, per the standard descriptor.
    CurrentArraySystemDisk,
    /// A user drive belonging to this array.
    CurrentArrayUserDisk,
    /// A system drive stamped by a different chassis.
    OtherArraySystemDisk,
    /// A user drive stamped by a different chassis.
    OtherArrayUserDisk,
    /// A drive that was never stamped, or whose stamp is unreadable.
    NewDisk,
    /// Nothing usable is attached to the slot.
    NoDisk,
}

impl DiskType {
    /// Only this array's own system drives may be booted from.
    pub fn is_trustworthy(&self) -> bool {
        matches!(self, DiskType::CurrentArraySystemDisk)
    }

    /// Types that already have dedicated operator messaging, so the generic
    /// invalid-slot warning is not emitted for them.
    pub fn has_dedicated_report(&self) -> bool {
        matches!(
            self,
            DiskType::NewDisk | DiskType::OtherArraySystemDisk | DiskType::OtherArrayUserDisk
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiskType::Unknown => "unknown",
            DiskType::InvalidType => "invalid_type",
            DiskType::CurrentArraySystemDisk => "current_array_system_disk",
            DiskType::CurrentArrayUserDisk => "current_array_user_disk",
            DiskType::OtherArraySystemDisk => "other_array_system_disk",
            DiskType::OtherArrayUserDisk => "other_array_user_disk",
            DiskType::NewDisk => "new_disk",
            DiskType::NoDisk => "no_disk",
        }
    }
}

impl fmt::Display for DiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
