//! System Disk Table
//!
//! One entry per system slot holding everything read from that slot during a
//! pass: attach state, reported serial, descriptor copy, signature. The table
//! is immutable; classification and invalid marking each produce a new one.

use homewrecker_core::{
    DiskType, DriveLocation, FormatError, FruDescriptor, FruSignature, SerialNumber, SlotReport,
    DESCRIPTOR_SIZE, MIRRORED_SLOT_COUNT, SIGNATURE_SIZE, SYSTEM_DRIVE_COUNT,
};
use homewrecker_storage::{DriveHandle, PrivateRegion, StorageError};

use crate::classify::classify;
use crate::context::Collaborators;

/// Outcome of reading one private-region record from one drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRead<T> {
    Valid(T),
    /// The bytes were read but did not decode.
    Invalid(FormatError),
    /// The read itself failed.
    Failed(StorageError),
    /// Slot carries no copy of the replicated region.
    NotMirrored,
}

impl<T> RecordRead<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            RecordRead::Valid(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, RecordRead::Valid(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RecordRead::Failed(_))
    }

    fn from_bytes(
        read: Result<Vec<u8>, StorageError>,
        decode: impl FnOnce(&[u8]) -> Result<T, FormatError>,
    ) -> Self {
        match read {
            Ok(bytes) => match decode(&bytes) {
                Ok(record) => RecordRead::Valid(record),
                Err(e) => RecordRead::Invalid(e),
            },
            Err(e) => RecordRead::Failed(e),
        }
    }
}

/// Everything known about one system slot in the current pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    pub slot: usize,
    pub location: DriveLocation,
    pub handle: Option<DriveHandle>,
    /// A logical attach to the slot's drive exists.
    pub path_enabled: bool,
    /// Serial reported by topology for the attached drive.
    pub serial: Option<SerialNumber>,
    pub descriptor: RecordRead<FruDescriptor>,
    pub signature: RecordRead<FruSignature>,
    pub disk_type: DiskType,
    pub is_invalid: bool,
    /// Where the drive with this slot's expected serial was found.
    pub actual_location: Option<DriveLocation>,
}

impl SlotEntry {
    /// An entry for a slot with nothing attached.
    pub fn empty(slot: usize) -> Self {
        let location = DriveLocation::system_slot(slot);
        Self {
            slot,
            location,
            handle: None,
            path_enabled: false,
            serial: None,
            descriptor: if slot < MIRRORED_SLOT_COUNT {
                RecordRead::Failed(StorageError::NotFound(location))
            } else {
                RecordRead::NotMirrored
            },
            signature: RecordRead::Failed(StorageError::NotFound(location)),
            disk_type: DiskType::Unknown,
            is_invalid: false,
            actual_location: None,
        }
    }

    /// Slot number the signature claims, if it decoded.
    pub fn claimed_slot(&self) -> Option<u32> {
        self.signature.record().map(|sig| sig.location.slot)
    }

    fn load(collaborators: &Collaborators, slot: usize) -> Self {
        let mut entry = SlotEntry::empty(slot);
        let location = entry.location;

        let handle = match collaborators.topology.resolve(location) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::debug!(slot, error = %e, "No drive in system slot");
                return entry;
            }
        };
        entry.handle = Some(handle);
        entry.path_enabled = collaborators
            .topology
            .lifecycle_state(handle)
            .map(|state| state.is_path_enabled())
            .unwrap_or(false);

        if !entry.path_enabled {
            let unattached = StorageError::DriveUnaccessible(location);
            if slot < MIRRORED_SLOT_COUNT {
                entry.descriptor = RecordRead::Failed(unattached.clone());
            }
            entry.signature = RecordRead::Failed(unattached);
            tracing::debug!(slot, "System slot drive has no logical attach");
            return entry;
        }

        entry.serial = match collaborators.topology.serial_number(handle) {
            Ok(serial) => Some(serial),
            Err(e) => {
                tracing::debug!(slot, error = %e, "Serial number unavailable");
                None
            }
        };

        if slot < MIRRORED_SLOT_COUNT {
            entry.descriptor = RecordRead::from_bytes(
                collaborators
                    .drives
                    .read(location, PrivateRegion::FruDescriptor, DESCRIPTOR_SIZE),
                FruDescriptor::decode,
            );
        }
        entry.signature = RecordRead::from_bytes(
            collaborators
                .drives
                .read(location, PrivateRegion::FruSignature, SIGNATURE_SIZE),
            FruSignature::decode,
        );

        tracing::debug!(
            slot,
            descriptor_valid = entry.descriptor.is_valid(),
            signature_valid = entry.signature.is_valid(),
            "Loaded system slot"
        );
        entry
    }
}

/// Per-pass table of the system slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDiskTable {
    entries: Vec<SlotEntry>,
}

impl SystemDiskTable {
    /// Read every system slot through the collaborators.
    pub fn load(collaborators: &Collaborators) -> Self {
        Self {
            entries: (0..SYSTEM_DRIVE_COUNT)
                .map(|slot| SlotEntry::load(collaborators, slot))
                .collect(),
        }
    }

    /// Build a table from prepared entries, indexed by their slot. Missing
    /// slots are filled with empty entries.
    pub fn from_entries(entries: impl IntoIterator<Item = SlotEntry>) -> Self {
        let mut table: Vec<SlotEntry> = (0..SYSTEM_DRIVE_COUNT).map(SlotEntry::empty).collect();
        for entry in entries {
            if entry.slot < SYSTEM_DRIVE_COUNT {
                let slot = entry.slot;
                table[slot] = entry;
            }
        }
        Self { entries: table }
    }

    pub fn entries(&self) -> &[SlotEntry] {
        &self.entries
    }

    pub fn entry(&self, slot: usize) -> Option<&SlotEntry> {
        self.entries.get(slot)
    }

    /// Descriptor copies of the mirrored slots, in slot order.
    pub fn descriptor_copies(&self) -> Vec<RecordRead<FruDescriptor>> {
        self.entries
            .iter()
            .take(MIRRORED_SLOT_COUNT)
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Label every slot against the standard descriptor.
    pub fn classified(self, standard: &FruDescriptor) -> Self {
        self.map_entries(|mut entry| {
            entry.disk_type = classify(&entry, standard);
            tracing::debug!(slot = entry.slot, disk_type = %entry.disk_type, "Classified system slot");
            entry
        })
    }

    /// A new table with `slot` marked invalid.
    pub fn with_invalid(self, slot: usize) -> Self {
        self.map_entries(|mut entry| {
            if entry.slot == slot {
                entry.is_invalid = true;
            }
            entry
        })
    }

    /// A new table with every slot satisfying `predicate` marked invalid.
    pub fn with_invalid_where(self, predicate: impl Fn(&SlotEntry) -> bool) -> Self {
        self.map_entries(|mut entry| {
            if predicate(&entry) {
                entry.is_invalid = true;
            }
            entry
        })
    }

    pub fn with_actual_location(self, slot: usize, location: DriveLocation) -> Self {
        self.map_entries(|mut entry| {
            if entry.slot == slot {
                entry.actual_location = Some(location);
            }
            entry
        })
    }

    pub fn invalid_slots(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.is_invalid)
            .map(|e| e.slot)
            .collect()
    }

    pub fn invalid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_invalid).count()
    }

    pub fn slot_reports(&self) -> Vec<SlotReport> {
        self.entries
            .iter()
            .map(|e| SlotReport {
                slot: e.slot,
                disk_type: e.disk_type,
            })
            .collect()
    }

    pub fn claimed_slots(&self) -> Vec<Option<u32>> {
        self.entries.iter().map(SlotEntry::claimed_slot).collect()
    }

    fn map_entries(self, f: impl FnMut(SlotEntry) -> SlotEntry) -> Self {
        Self {
            entries: self.entries.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homewrecker_storage::{InMemoryArray, LifecycleState};
    use std::sync::Arc;

    fn serials() -> [SerialNumber; SYSTEM_DRIVE_COUNT] {
        [
            SerialNumber::new("S0"),
            SerialNumber::new("S1"),
            SerialNumber::new("S2"),
            SerialNumber::new("S3"),
        ]
    }

    #[test]
    fn load_reads_each_slot() {
        let array = Arc::new(InMemoryArray::new(9));
        let descriptor = FruDescriptor::new(9, serials());
        for slot in 0..SYSTEM_DRIVE_COUNT {
            let location = DriveLocation::system_slot(slot);
            array.insert_drive(location, serials()[slot]);
            array.install_descriptor(location, &descriptor);
            array.install_signature(location, &FruSignature::new(9, location));
        }
        array.set_lifecycle(DriveLocation::system_slot(2), LifecycleState::Failed);

        let table = SystemDiskTable::load(&Collaborators::from_backend(array));

        let first = table.entry(0).unwrap();
        assert!(first.path_enabled);
        assert_eq!(first.serial, Some(SerialNumber::new("S0")));
        assert_eq!(first.descriptor.record(), Some(&descriptor));
        assert_eq!(first.claimed_slot(), Some(0));

        let failed = table.entry(2).unwrap();
        assert!(!failed.path_enabled);
        assert!(failed.signature.is_failed());
        assert!(failed.descriptor.is_failed());

        let fourth = table.entry(3).unwrap();
        assert_eq!(fourth.descriptor, RecordRead::NotMirrored);
        assert!(fourth.signature.is_valid());
    }

    #[test]
    fn blank_regions_decode_as_invalid() {
        let array = Arc::new(InMemoryArray::new(9));
        array.insert_drive(DriveLocation::system_slot(0), "S0");

        let table = SystemDiskTable::load(&Collaborators::from_backend(array));
        let entry = table.entry(0).unwrap();
        assert_eq!(entry.descriptor, RecordRead::Invalid(FormatError::BadMagic));
        assert_eq!(entry.signature, RecordRead::Invalid(FormatError::BadMagic));
        assert!(table.entry(1).unwrap().handle.is_none());
    }

    #[test]
    fn invalid_marking_builds_new_table() {
        let table = SystemDiskTable::from_entries(Vec::new());
        let marked = table.clone().with_invalid(1).with_invalid_where(|e| e.slot == 3);
        assert_eq!(table.invalid_count(), 0);
        assert_eq!(marked.invalid_slots(), vec![1, 3]);
    }
}
