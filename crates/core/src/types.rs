//! Slot geometry, drive locations and serial numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of boot slots whose drives carry the system configuration.
pub const SYSTEM_DRIVE_COUNT: usize = 4;

/// Number of leading system slots that hold a copy of the replicated region.
pub const MIRRORED_SLOT_COUNT: usize = 3;

/// Significant bytes of a drive serial number (SCSI inquiry serial size).
pub const SERIAL_NUMBER_SIZE: usize = 20;

/// On-disk width of a serial number field: significant bytes plus a NUL.
pub const SERIAL_NUMBER_FIELD_SIZE: usize = SERIAL_NUMBER_SIZE + 1;

/// Physical position of a drive: bus, enclosure, slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriveLocation {
    pub bus: u32,
    pub enclosure: u32,
    pub slot: u32,
}

impl DriveLocation {
    pub const fn new(bus: u32, enclosure: u32, slot: u32) -> Self {
        Self {
            bus,
            enclosure,
            slot,
        }
    }

    /// Location of the system slot with the given index (bus 0, enclosure 0).
    pub const fn system_slot(index: usize) -> Self {
        Self::new(0, 0, index as u32)
    }

    /// True if this location is one of the first `SYSTEM_DRIVE_COUNT` boot slots.
    pub fn is_system_slot(&self) -> bool {
        self.bus == 0 && self.enclosure == 0 && (self.slot as usize) < SYSTEM_DRIVE_COUNT
    }

    /// Index of the system slot, or None for a user slot.
    pub fn system_index(&self) -> Option<usize> {
        if self.is_system_slot() {
            Some(self.slot as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for DriveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.bus, self.enclosure, self.slot)
    }
}

/// Fixed-width drive serial number as stored on disk.
///
/// The raw field is kept verbatim so that records round-trip bit-for-bit,
/// including any bytes after the terminating NUL. Comparisons between drives
/// go through [`SerialNumber::matches`], which looks at the significant bytes
/// only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct SerialNumber {
    raw: [u8; SERIAL_NUMBER_FIELD_SIZE],
}

impl SerialNumber {
    /// Build a serial from text. Input longer than `SERIAL_NUMBER_SIZE` bytes
    /// is truncated; the remainder of the field is NUL padded.
    pub fn new(serial: &str) -> Self {
        let mut raw = [0u8; SERIAL_NUMBER_FIELD_SIZE];
        let bytes = serial.as_bytes();
        let len = bytes.len().min(SERIAL_NUMBER_SIZE);
        raw[..len].copy_from_slice(&bytes[..len]);
        Self { raw }
    }

    /// An all-zero serial, used for slots with no recorded drive.
    pub const fn blank() -> Self {
        Self {
            raw: [0u8; SERIAL_NUMBER_FIELD_SIZE],
        }
    }

    pub fn from_raw(raw: [u8; SERIAL_NUMBER_FIELD_SIZE]) -> Self {
        Self { raw }
    }

    pub fn as_raw(&self) -> &[u8; SERIAL_NUMBER_FIELD_SIZE] {
        &self.raw
    }

    /// Significant bytes up to (not including) the first NUL.
    pub fn significant(&self) -> &[u8] {
        let window = &self.raw[..SERIAL_NUMBER_SIZE];
        let end = window.iter().position(|b| *b == 0).unwrap_or(SERIAL_NUMBER_SIZE);
        &window[..end]
    }

    pub fn is_blank(&self) -> bool {
        self.significant().is_empty()
    }

    /// Case-sensitive comparison of the significant bytes. Blank serials
    /// never match anything.
    pub fn matches(&self, other: &SerialNumber) -> bool {
        !self.is_blank() && self.significant() == other.significant()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.significant()).into_owned()
    }
}

impl Default for SerialNumber {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Debug for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerialNumber({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<String> for SerialNumber {
    fn from(s: String) -> Self {
        SerialNumber::new(&s)
    }
}

impl From<&str> for SerialNumber {
    fn from(s: &str) -> Self {
        SerialNumber::new(s)
    }
}

impl From<SerialNumber> for String {
    fn from(s: SerialNumber) -> Self {
        s.to_string_lossy()
    }
}
