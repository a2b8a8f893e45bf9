//! FRU Signature record
//!
//! Each drive carries its own signature in a private, non-replicated region.
//! It records the chassis identity and the slot the drive was last stamped
//! into, so a drive that has been moved can be recognised.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::types::DriveLocation;

/// Marker proving the signature was written by this software.
pub const SIGNATURE_MAGIC: &[u8; 16] = b"$FRU_SIGNATURE$\0";

/// The only signature version accepted on decode.
pub const SIGNATURE_VERSION: u32 = 1;

const VERSION_OFFSET: usize = SIGNATURE_MAGIC.len();
const WWN_SEED_OFFSET: usize = VERSION_OFFSET + 4;
const BUS_OFFSET: usize = WWN_SEED_OFFSET + 4;
const ENCLOSURE_OFFSET: usize = BUS_OFFSET + 4;
const SLOT_OFFSET: usize = ENCLOSURE_OFFSET + 4;

/// Encoded size of a signature in bytes.
pub const SIGNATURE_SIZE: usize = SLOT_OFFSET + 4;

/// Decoded FRU Signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruSignature {
    pub chassis_wwn_seed: u32,
    pub location: DriveLocation,
}

impl FruSignature {
    pub fn new(chassis_wwn_seed: u32, location: DriveLocation) -> Self {
        Self {
            chassis_wwn_seed,
            location,
        }
    }

    /// True if the drive claims the slot it was physically read from.
    pub fn is_self_consistent(&self, read_from: DriveLocation) -> bool {
        self.location == read_from
    }

    pub fn encode(&self) -> [u8; SIGNATURE_SIZE] {
        let mut buf = [0u8; SIGNATURE_SIZE];
        buf[..VERSION_OFFSET].copy_from_slice(SIGNATURE_MAGIC);
        LittleEndian::write_u32(&mut buf[VERSION_OFFSET..], SIGNATURE_VERSION);
        LittleEndian::write_u32(&mut buf[WWN_SEED_OFFSET..], self.chassis_wwn_seed);
        LittleEndian::write_u32(&mut buf[BUS_OFFSET..], self.location.bus);
        LittleEndian::write_u32(&mut buf[ENCLOSURE_OFFSET..], self.location.enclosure);
        LittleEndian::write_u32(&mut buf[SLOT_OFFSET..], self.location.slot);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < SIGNATURE_SIZE {
            return Err(FormatError::Truncated {
                expected: SIGNATURE_SIZE,
                actual: bytes.len(),
            });
        }
        if &bytes[..VERSION_OFFSET] != SIGNATURE_MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = LittleEndian::read_u32(&bytes[VERSION_OFFSET..]);
        if version != SIGNATURE_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: SIGNATURE_VERSION,
            });
        }

        Ok(Self {
            chassis_wwn_seed: LittleEndian::read_u32(&bytes[WWN_SEED_OFFSET..]),
            location: DriveLocation::new(
                LittleEndian::read_u32(&bytes[BUS_OFFSET..]),
                LittleEndian::read_u32(&bytes[ENCLOSURE_OFFSET..]),
                LittleEndian::read_u32(&bytes[SLOT_OFFSET..]),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FruSignature {
        FruSignature::new(0x1234_5678, DriveLocation::new(0, 0, 2))
    }

    #[test]
    fn roundtrip() {
        let sig = sample();
        assert_eq!(FruSignature::decode(&sig.encode()).unwrap(), sig);
        assert_eq!(SIGNATURE_SIZE, 36);
    }

    #[test]
    fn version_must_match_exactly() {
        let mut buf = sample().encode();
        LittleEndian::write_u32(&mut buf[VERSION_OFFSET..], SIGNATURE_VERSION + 1);
        assert_eq!(
            FruSignature::decode(&buf),
            Err(FormatError::UnsupportedVersion {
                found: SIGNATURE_VERSION + 1,
                expected: SIGNATURE_VERSION
            })
        );
    }

    #[test]
    fn bad_magic_reported_before_version() {
        let mut buf = sample().encode();
        buf[0] = b'#';
        LittleEndian::write_u32(&mut buf[VERSION_OFFSET..], 99);
        assert_eq!(FruSignature::decode(&buf), Err(FormatError::BadMagic));
    }

    #[test]
    fn truncated_signature() {
        assert!(matches!(
            FruSignature::decode(&[0u8; 10]),
            Err(FormatError::Truncated { actual: 10, .. })
        ));
    }

    #[test]
    fn self_consistency_compares_full_location() {
        let sig = sample();
        assert!(sig.is_self_consistent(DriveLocation::new(0, 0, 2)));
        assert!(!sig.is_self_consistent(DriveLocation::new(0, 0, 1)));
        assert!(!sig.is_self_consistent(DriveLocation::new(0, 1, 2)));
    }
}
