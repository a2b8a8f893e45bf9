//! Disk Classifier
//!
//! Labels the drive in one system slot against the standard descriptor.
//! Rules are checked in order and the first match wins:
//!
//! 1. valid signature and a serial the standard lists: current array system disk
//! 2. no logical attach, or the signature read failed: no disk
//! 3. signature read but not decodable: new disk
//! 4. valid descriptor copy, foreign chassis, claims a system slot: other array system disk
//! 5. foreign chassis, claims a user slot: other array user disk
//! 6. this chassis, claims a user slot: current array user disk
//! 7. anything else: new disk

use homewrecker_core::{DiskType, FruDescriptor};

use crate::table::{RecordRead, SlotEntry};

/// Classify one slot. Total over every entry.
pub fn classify(entry: &SlotEntry, standard: &FruDescriptor) -> DiskType {
    if entry.signature.is_valid() {
        if let Some(serial) = &entry.serial {
            if standard.slot_of_serial(serial).is_some() {
                return DiskType::CurrentArraySystemDisk;
            }
        }
    }

    if !entry.path_enabled || entry.signature.is_failed() {
        return DiskType::NoDisk;
    }

    let signature = match &entry.signature {
        RecordRead::Valid(signature) => signature,
        RecordRead::Invalid(_) => return DiskType::NewDisk,
        // Signatures always live on the drive; treat a missing one as unread.
        RecordRead::Failed(_) | RecordRead::NotMirrored => return DiskType::NoDisk,
    };

    let same_chassis = signature.chassis_wwn_seed == standard.chassis_wwn_seed;
    let claims_system_slot = signature.location.is_system_slot();

    match (same_chassis, claims_system_slot) {
        (false, true) if entry.descriptor.is_valid() => DiskType::OtherArraySystemDisk,
        (false, false) => DiskType::OtherArrayUserDisk,
        (true, false) => DiskType::CurrentArrayUserDisk,
        _ => DiskType::NewDisk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homewrecker_core::{DriveLocation, FormatError, FruSignature, SerialNumber};
    use homewrecker_storage::StorageError;

    const CHASSIS: u32 = 0x1111;
    const FOREIGN: u32 = 0x2222;

    fn standard() -> FruDescriptor {
        FruDescriptor::new(
            CHASSIS,
            [
                SerialNumber::new("S0"),
                SerialNumber::new("S1"),
                SerialNumber::new("S2"),
                SerialNumber::new("S3"),
            ],
        )
    }

    fn attached(slot: usize, serial: &str) -> SlotEntry {
        let mut entry = SlotEntry::empty(slot);
        entry.path_enabled = true;
        entry.serial = Some(SerialNumber::new(serial));
        entry
    }

    fn with_signature(mut entry: SlotEntry, seed: u32, claimed: DriveLocation) -> SlotEntry {
        entry.signature = RecordRead::Valid(FruSignature::new(seed, claimed));
        entry
    }

    #[test]
    fn listed_serial_is_current_system_disk() {
        let entry = with_signature(attached(0, "S2"), FOREIGN, DriveLocation::new(1, 0, 7));
        assert_eq!(classify(&entry, &standard()), DiskType::CurrentArraySystemDisk);
    }

    #[test]
    fn unattached_slot_is_no_disk() {
        assert_eq!(classify(&SlotEntry::empty(1), &standard()), DiskType::NoDisk);
    }

    #[test]
    fn failed_signature_read_is_no_disk() {
        let mut entry = attached(1, "X");
        entry.signature = RecordRead::Failed(StorageError::DriveUnaccessible(entry.location));
        assert_eq!(classify(&entry, &standard()), DiskType::NoDisk);
    }

    #[test]
    fn blank_signature_is_new_disk() {
        let mut entry = attached(1, "S1");
        entry.signature = RecordRead::Invalid(FormatError::BadMagic);
        assert_eq!(classify(&entry, &standard()), DiskType::NewDisk);
    }

    #[test]
    fn foreign_system_disk_needs_descriptor_copy() {
        let claimed = DriveLocation::system_slot(1);
        let mut entry = with_signature(attached(1, "X"), FOREIGN, claimed);
        assert_eq!(classify(&entry, &standard()), DiskType::NewDisk);

        entry.descriptor = RecordRead::Valid(FruDescriptor::new(FOREIGN, standard().system_drive_serial));
        assert_eq!(classify(&entry, &standard()), DiskType::OtherArraySystemDisk);
    }

    #[test]
    fn user_slot_claims_split_by_chassis() {
        let user_slot = DriveLocation::new(0, 1, 4);
        let foreign = with_signature(attached(2, "X"), FOREIGN, user_slot);
        let ours = with_signature(attached(2, "X"), CHASSIS, user_slot);
        assert_eq!(classify(&foreign, &standard()), DiskType::OtherArrayUserDisk);
        assert_eq!(classify(&ours, &standard()), DiskType::CurrentArrayUserDisk);
    }

    #[test]
    fn unlisted_drive_claiming_our_system_slot_is_new() {
        let entry = with_signature(attached(3, "X"), CHASSIS, DriveLocation::system_slot(3));
        assert_eq!(classify(&entry, &standard()), DiskType::NewDisk);
    }

    #[test]
    fn classification_is_total() {
        let locations = [
            DriveLocation::system_slot(0),
            DriveLocation::system_slot(3),
            DriveLocation::new(0, 0, 4),
            DriveLocation::new(2, 1, 0),
        ];
        let descriptors = [
            RecordRead::Valid(standard()),
            RecordRead::Invalid(FormatError::BadMagic),
            RecordRead::Failed(StorageError::NoReplica),
            RecordRead::NotMirrored,
        ];

        for path_enabled in [true, false] {
            for serial in ["S0", "S3", "X", ""] {
                for descriptor in &descriptors {
                    for signature_kind in 0..3 {
                        for location in locations {
                            for seed in [CHASSIS, FOREIGN] {
                                let mut entry = SlotEntry::empty(0);
                                entry.path_enabled = path_enabled;
                                entry.serial = Some(SerialNumber::new(serial));
                                entry.descriptor = descriptor.clone();
                                entry.signature = match signature_kind {
                                    0 => RecordRead::Valid(FruSignature::new(seed, location)),
                                    1 => RecordRead::Invalid(FormatError::BadMagic),
                                    _ => RecordRead::Failed(StorageError::NoReplica),
                                };

                                let disk_type = classify(&entry, &standard());
                                assert!(
                                    !matches!(disk_type, DiskType::Unknown | DiskType::InvalidType),
                                    "unlabelled entry {:?}",
                                    entry
                                );
                                if disk_type.is_trustworthy() {
                                    assert!(entry.signature.is_valid());
                                    assert_ne!(serial, "X");
                                    assert_ne!(serial, "");
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
