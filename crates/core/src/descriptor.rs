//! FRU Descriptor record
//!
//! The descriptor is the replicated record that names which drive serial
//! belongs in which system slot, together with the chassis identity it was
//! written under and a freshness sequence number.
//!
//! # Layout
//!
//! Little-endian, packed, `DESCRIPTOR_SIZE` bytes:
//!
//! ```text
//! magic[16] | wwn_seed u32 | serial[4][21] | replacement_flag u32 | sequence u32 | version u32
//! ```

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::types::{SerialNumber, SERIAL_NUMBER_FIELD_SIZE, SYSTEM_DRIVE_COUNT};

/// Marker proving the region was initialized by this software.
pub const DESCRIPTOR_MAGIC: &[u8; 16] = b"$FRU_DESCRIPTOR$";

/// Current descriptor structure version.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Stored value meaning "chassis replacement was planned".
pub const REPLACEMENT_FLAG_TRUE: u32 = 0x5EED_C0DE;

/// Stored value meaning "no chassis replacement planned".
pub const REPLACEMENT_FLAG_FALSE: u32 = 0xC1EA_C0DE;

const MAGIC_OFFSET: usize = 0;
const WWN_SEED_OFFSET: usize = MAGIC_OFFSET + DESCRIPTOR_MAGIC.len();
const SERIALS_OFFSET: usize = WWN_SEED_OFFSET + 4;
const REPLACEMENT_FLAG_OFFSET: usize = SERIALS_OFFSET + SERIAL_NUMBER_FIELD_SIZE * SYSTEM_DRIVE_COUNT;
const SEQUENCE_OFFSET: usize = REPLACEMENT_FLAG_OFFSET + 4;
const VERSION_OFFSET: usize = SEQUENCE_OFFSET + 4;

/// Encoded size of a descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = VERSION_OFFSET + 4;

/// Operator intent recorded in the descriptor: was this chassis swap planned?
///
/// Only the two sentinel values carry meaning. Anything else read from disk
/// is kept as `Unset(raw)` so it re-encodes unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementFlag {
    Planned,
    #[default]
    NotPlanned,
    Unset(u32),
}

impl ReplacementFlag {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            REPLACEMENT_FLAG_TRUE => ReplacementFlag::Planned,
            REPLACEMENT_FLAG_FALSE => ReplacementFlag::NotPlanned,
            other => ReplacementFlag::Unset(other),
        }
    }

    pub fn raw(&self) -> u32 {
        match self {
            ReplacementFlag::Planned => REPLACEMENT_FLAG_TRUE,
            ReplacementFlag::NotPlanned => REPLACEMENT_FLAG_FALSE,
            ReplacementFlag::Unset(raw) => *raw,
        }
    }

    /// True only for the "planned" sentinel.
    pub fn is_set(&self) -> bool {
        matches!(self, ReplacementFlag::Planned)
    }
}

/// Decoded FRU Descriptor.
///
/// The magic string is not stored: a value of this type exists only for a
/// record whose magic matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruDescriptor {
    pub chassis_wwn_seed: u32,
    pub system_drive_serial: [SerialNumber; SYSTEM_DRIVE_COUNT],
    pub chassis_replacement_flag: ReplacementFlag,
    pub sequence_number: u32,
    pub structure_version: u32,
}

impl FruDescriptor {
    /// A fresh descriptor at the current structure version. The sequence
    /// number is left at the reserved 0 until the writer stamps it.
    pub fn new(chassis_wwn_seed: u32, system_drive_serial: [SerialNumber; SYSTEM_DRIVE_COUNT]) -> Self {
        Self {
            chassis_wwn_seed,
            system_drive_serial,
            chassis_replacement_flag: ReplacementFlag::NotPlanned,
            sequence_number: 0,
            structure_version: DESCRIPTOR_VERSION,
        }
    }

    /// Freshness order: higher sequence wins, and 0 is never fresher.
    pub fn is_fresher_than(&self, other: &FruDescriptor) -> bool {
        self.sequence_number != 0 && self.sequence_number > other.sequence_number
    }

    /// Serial recorded for the given system slot.
    pub fn serial_for_slot(&self, slot: usize) -> Option<&SerialNumber> {
        self.system_drive_serial.get(slot)
    }

    /// Index of the system slot whose recorded serial matches `serial`.
    pub fn slot_of_serial(&self, serial: &SerialNumber) -> Option<usize> {
        self.system_drive_serial.iter().position(|s| s.matches(serial))
    }

    pub fn encode(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut buf = [0u8; DESCRIPTOR_SIZE];
        buf[MAGIC_OFFSET..WWN_SEED_OFFSET].copy_from_slice(DESCRIPTOR_MAGIC);
        LittleEndian::write_u32(&mut buf[WWN_SEED_OFFSET..], self.chassis_wwn_seed);
        for (i, serial) in self.system_drive_serial.iter().enumerate() {
            let start = SERIALS_OFFSET + i * SERIAL_NUMBER_FIELD_SIZE;
            buf[start..start + SERIAL_NUMBER_FIELD_SIZE].copy_from_slice(serial.as_raw());
        }
        LittleEndian::write_u32(
            &mut buf[REPLACEMENT_FLAG_OFFSET..],
            self.chassis_replacement_flag.raw(),
        );
        LittleEndian::write_u32(&mut buf[SEQUENCE_OFFSET..], self.sequence_number);
        LittleEndian::write_u32(&mut buf[VERSION_OFFSET..], self.structure_version);
        buf
    }

    /// Decode a descriptor. Bytes past `DESCRIPTOR_SIZE` are ignored so a
    /// whole block can be passed in.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < DESCRIPTOR_SIZE {
            return Err(FormatError::Truncated {
                expected: DESCRIPTOR_SIZE,
                actual: bytes.len(),
            });
        }
        if &bytes[MAGIC_OFFSET..WWN_SEED_OFFSET] != DESCRIPTOR_MAGIC {
            return Err(FormatError::BadMagic);
        }

        let mut system_drive_serial = [SerialNumber::blank(); SYSTEM_DRIVE_COUNT];
        for (i, serial) in system_drive_serial.iter_mut().enumerate() {
            let start = SERIALS_OFFSET + i * SERIAL_NUMBER_FIELD_SIZE;
            let mut raw = [0u8; SERIAL_NUMBER_FIELD_SIZE];
            raw.copy_from_slice(&bytes[start..start + SERIAL_NUMBER_FIELD_SIZE]);
            *serial = SerialNumber::from_raw(raw);
        }

        Ok(Self {
            chassis_wwn_seed: LittleEndian::read_u32(&bytes[WWN_SEED_OFFSET..]),
            system_drive_serial,
            chassis_replacement_flag: ReplacementFlag::from_raw(LittleEndian::read_u32(
                &bytes[REPLACEMENT_FLAG_OFFSET..],
            )),
            sequence_number: LittleEndian::read_u32(&bytes[SEQUENCE_OFFSET..]),
            structure_version: LittleEndian::read_u32(&bytes[VERSION_OFFSET..]),
        })
    }
}
