//! In-memory array
//!
//! A single object implementing every collaborator trait over per-drive byte
//! regions. The replicated region keeps each replica with a crc32 checksum
//! and a write sequence so reads produce the same kind of verify report as
//! the real transport.
//!
//! # Design
//!
//! - Drives are keyed by physical location; moving a drive moves its regions
//! - Replicas live on the drives in the first `MIRRORED_SLOT_COUNT` slots
//! - Failure hooks: per-drive I/O failure, disconnect refusal, chassis store
//!   outages, replica corruption
//!
//! Used by the integration tests and by the CLI scenario runner.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use homewrecker_core::{
    DriveLocation, FruDescriptor, FruSignature, HomewreckerEvent, SerialNumber, ServiceModeReason,
    MIRRORED_SLOT_COUNT,
};

use crate::error::{Result, StorageError};
use crate::traits::{
    ChassisIdentityStore, DriveHandle, DriveIo, DriveTopology, EventLog, LifecycleState,
    PrivateRegion, ReplicatedRead, ReplicatedRegion, ServiceMode, UserModifiedFlag,
    REGION_CAPACITY,
};
use crate::verify::VerifyReport;

#[derive(Debug, Clone)]
struct RegionData {
    bytes: Vec<u8>,
    checksum: u32,
    write_sequence: u64,
}

impl RegionData {
    fn blank() -> Self {
        let bytes = vec![0u8; REGION_CAPACITY];
        let checksum = crc32fast::hash(&bytes);
        Self {
            bytes,
            checksum,
            write_sequence: 0,
        }
    }

    fn store(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.checksum = crc32fast::hash(&self.bytes);
    }

    fn verifies(&self) -> bool {
        crc32fast::hash(&self.bytes) == self.checksum
    }
}

#[derive(Debug, Clone)]
struct MemoryDrive {
    handle: DriveHandle,
    serial: SerialNumber,
    lifecycle: LifecycleState,
    descriptor: RegionData,
    signature: RegionData,
    fail_io: bool,
    fail_disconnect: bool,
}

impl MemoryDrive {
    fn region(&self, region: PrivateRegion) -> &RegionData {
        match region {
            PrivateRegion::FruDescriptor => &self.descriptor,
            PrivateRegion::FruSignature => &self.signature,
        }
    }

    fn region_mut(&mut self, region: PrivateRegion) -> &mut RegionData {
        match region {
            PrivateRegion::FruDescriptor => &mut self.descriptor,
            PrivateRegion::FruSignature => &mut self.signature,
        }
    }

    fn accessible(&self) -> bool {
        !self.fail_io && self.lifecycle.is_path_enabled()
    }
}

#[derive(Debug, Default)]
struct ArrayState {
    drives: BTreeMap<DriveLocation, MemoryDrive>,
    next_handle: u64,
    replicated_sequence: u64,
    chassis_wwn_seed: u32,
    chassis_failures: u32,
    chassis_reads: u32,
    user_modified: bool,
    events: Vec<HomewreckerEvent>,
    service_mode_requests: Vec<ServiceModeReason>,
    disconnected: Vec<DriveLocation>,
}

impl ArrayState {
    fn drive_by_handle(&self, handle: DriveHandle) -> Option<(&DriveLocation, &MemoryDrive)> {
        self.drives.iter().find(|(_, d)| d.handle == handle)
    }

    fn drive_by_handle_mut(&mut self, handle: DriveHandle) -> Option<(DriveLocation, &mut MemoryDrive)> {
        self.drives
            .iter_mut()
            .find(|(_, d)| d.handle == handle)
            .map(|(loc, d)| (*loc, d))
    }

    fn chassis_call(&mut self) -> Result<()> {
        if self.chassis_failures > 0 {
            self.chassis_failures -= 1;
            return Err(StorageError::StoreUnavailable(
                "chassis identity store busy".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_range(offset: u64, length: usize) -> Result<usize> {
    let start = usize::try_from(offset).map_err(|_| StorageError::OutOfRange {
        offset,
        length,
        size: REGION_CAPACITY,
    })?;
    match start.checked_add(length) {
        Some(end) if end <= REGION_CAPACITY => Ok(start),
        _ => Err(StorageError::OutOfRange {
            offset,
            length,
            size: REGION_CAPACITY,
        }),
    }
}

/// In-memory implementation of every collaborator.
#[derive(Debug)]
pub struct InMemoryArray {
    state: Mutex<ArrayState>,
}

impl InMemoryArray {
    /// Create an empty array whose hardware reports `chassis_wwn_seed`.
    pub fn new(chassis_wwn_seed: u32) -> Self {
        Self {
            state: Mutex::new(ArrayState {
                chassis_wwn_seed,
                ..Default::default()
            }),
        }
    }

    // ========================================================================
    // Drive population
    // ========================================================================

    /// Insert a blank drive, replacing whatever was at `location`.
    pub fn insert_drive(&self, location: DriveLocation, serial: impl Into<SerialNumber>) -> DriveHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = DriveHandle(state.next_handle);
        state.drives.insert(
            location,
            MemoryDrive {
                handle,
                serial: serial.into(),
                lifecycle: LifecycleState::Ready,
                descriptor: RegionData::blank(),
                signature: RegionData::blank(),
                fail_io: false,
                fail_disconnect: false,
            },
        );
        handle
    }

    /// Pull a drive out; returns its serial.
    pub fn remove_drive(&self, location: DriveLocation) -> Option<SerialNumber> {
        self.state.lock().drives.remove(&location).map(|d| d.serial)
    }

    /// Physically move a drive, with its on-disk contents, to an empty slot.
    pub fn move_drive(&self, from: DriveLocation, to: DriveLocation) -> bool {
        let mut state = self.state.lock();
        if state.drives.contains_key(&to) {
            return false;
        }
        match state.drives.remove(&from) {
            Some(drive) => {
                state.drives.insert(to, drive);
                true
            }
            None => false,
        }
    }

    /// Exchange the drives in two slots.
    pub fn swap_drives(&self, a: DriveLocation, b: DriveLocation) {
        let mut state = self.state.lock();
        let first = state.drives.remove(&a);
        let second = state.drives.remove(&b);
        if let Some(drive) = first {
            state.drives.insert(b, drive);
        }
        if let Some(drive) = second {
            state.drives.insert(a, drive);
        }
    }

    pub fn set_io_failing(&self, location: DriveLocation, failing: bool) {
        if let Some(drive) = self.state.lock().drives.get_mut(&location) {
            drive.fail_io = failing;
        }
    }

    pub fn set_lifecycle(&self, location: DriveLocation, lifecycle: LifecycleState) {
        if let Some(drive) = self.state.lock().drives.get_mut(&location) {
            drive.lifecycle = lifecycle;
        }
    }

    pub fn set_disconnect_failing(&self, location: DriveLocation, failing: bool) {
        if let Some(drive) = self.state.lock().drives.get_mut(&location) {
            drive.fail_disconnect = failing;
        }
    }

    // ========================================================================
    // On-disk contents
    // ========================================================================

    /// Write raw bytes at the start of a drive's region, bypassing I/O
    /// failure hooks. The replica checksum is resealed.
    pub fn install_region(&self, location: DriveLocation, region: PrivateRegion, bytes: &[u8]) -> bool {
        if bytes.len() > REGION_CAPACITY {
            return false;
        }
        match self.state.lock().drives.get_mut(&location) {
            Some(drive) => {
                drive.region_mut(region).store(0, bytes);
                true
            }
            None => false,
        }
    }

    pub fn install_descriptor(&self, location: DriveLocation, descriptor: &FruDescriptor) -> bool {
        self.install_region(location, PrivateRegion::FruDescriptor, &descriptor.encode())
    }

    pub fn install_signature(&self, location: DriveLocation, signature: &FruSignature) -> bool {
        self.install_region(location, PrivateRegion::FruSignature, &signature.encode())
    }

    /// Flip one byte of a region without resealing its checksum.
    pub fn corrupt_region(&self, location: DriveLocation, region: PrivateRegion, index: usize) -> bool {
        match self.state.lock().drives.get_mut(&location) {
            Some(drive) if index < REGION_CAPACITY => {
                drive.region_mut(region).bytes[index] ^= 0xFF;
                true
            }
            _ => false,
        }
    }

    pub fn region_bytes(&self, location: DriveLocation, region: PrivateRegion) -> Option<Vec<u8>> {
        self.state
            .lock()
            .drives
            .get(&location)
            .map(|d| d.region(region).bytes.clone())
    }

    pub fn descriptor_at(&self, location: DriveLocation) -> Option<FruDescriptor> {
        self.region_bytes(location, PrivateRegion::FruDescriptor)
            .and_then(|bytes| FruDescriptor::decode(&bytes).ok())
    }

    pub fn signature_at(&self, location: DriveLocation) -> Option<FruSignature> {
        self.region_bytes(location, PrivateRegion::FruSignature)
            .and_then(|bytes| FruSignature::decode(&bytes).ok())
    }

    // ========================================================================
    // Chassis and operator state
    // ========================================================================

    pub fn chassis_wwn_seed(&self) -> u32 {
        self.state.lock().chassis_wwn_seed
    }

    pub fn set_chassis_wwn_seed(&self, wwn_seed: u32) {
        self.state.lock().chassis_wwn_seed = wwn_seed;
    }

    /// Number of chassis store reads attempted so far, failed ones included.
    pub fn chassis_store_reads(&self) -> u32 {
        self.state.lock().chassis_reads
    }

    /// Make the next `times` chassis store calls fail.
    pub fn fail_chassis_store(&self, times: u32) {
        self.state.lock().chassis_failures = times;
    }

    pub fn user_modified(&self) -> bool {
        self.state.lock().user_modified
    }

    pub fn set_user_modified(&self, modified: bool) {
        self.state.lock().user_modified = modified;
    }

    // ========================================================================
    // Observations
    // ========================================================================

    pub fn events(&self) -> Vec<HomewreckerEvent> {
        self.state.lock().events.clone()
    }

    pub fn service_mode_requests(&self) -> Vec<ServiceModeReason> {
        self.state.lock().service_mode_requests.clone()
    }

    /// Locations whose drives were logically disconnected, in order.
    pub fn disconnected(&self) -> Vec<DriveLocation> {
        self.state.lock().disconnected.clone()
    }

    pub fn lifecycle(&self, location: DriveLocation) -> Option<LifecycleState> {
        self.state.lock().drives.get(&location).map(|d| d.lifecycle)
    }
}

impl ReplicatedRegion for InMemoryArray {
    fn read(&self, region: PrivateRegion, offset: u64, length: usize) -> Result<ReplicatedRead> {
        let start = check_range(offset, length)?;
        let state = self.state.lock();
        let mut report = VerifyReport::default();
        let mut replicas: Vec<(usize, &RegionData)> = Vec::with_capacity(MIRRORED_SLOT_COUNT);

        for index in 0..MIRRORED_SLOT_COUNT {
            match state.drives.get(&DriveLocation::system_slot(index)) {
                Some(drive) if drive.accessible() => {
                    let data = drive.region(region);
                    if data.verifies() {
                        replicas.push((index, data));
                    } else {
                        report.checksum_error_bitmap |= 1 << index;
                    }
                }
                _ => report.dead_bitmap |= 1 << index,
            }
        }

        // Newest write wins; ties keep the lowest slot.
        let chosen = replicas
            .iter()
            .fold(None::<&(usize, &RegionData)>, |best, candidate| match best {
                Some(b) if b.1.write_sequence >= candidate.1.write_sequence => Some(b),
                _ => Some(candidate),
            })
            .map(|(_, data)| *data)
            .ok_or(StorageError::NoReplica)?;

        for (index, data) in &replicas {
            if data.write_sequence != chosen.write_sequence || data.bytes != chosen.bytes {
                report.sequence_mismatch_bitmap |= 1 << index;
            }
        }

        Ok(ReplicatedRead {
            data: chosen.bytes[start..start + length].to_vec(),
            report,
        })
    }

    fn write(&self, region: PrivateRegion, offset: u64, data: &[u8]) -> Result<VerifyReport> {
        let start = check_range(offset, data.len())?;
        let mut state = self.state.lock();
        state.replicated_sequence += 1;
        let sequence = state.replicated_sequence;
        let mut report = VerifyReport::default();
        let mut written = 0;

        for index in 0..MIRRORED_SLOT_COUNT {
            match state.drives.get_mut(&DriveLocation::system_slot(index)) {
                Some(drive) if drive.accessible() => {
                    let target = drive.region_mut(region);
                    target.store(start, data);
                    target.write_sequence = sequence;
                    written += 1;
                }
                _ => report.dead_bitmap |= 1 << index,
            }
        }

        if written == 0 {
            return Err(StorageError::NoReplica);
        }
        Ok(report)
    }
}

impl DriveIo for InMemoryArray {
    fn read(&self, location: DriveLocation, region: PrivateRegion, length: usize) -> Result<Vec<u8>> {
        let start = check_range(0, length)?;
        let state = self.state.lock();
        let drive = state
            .drives
            .get(&location)
            .ok_or(StorageError::NotFound(location))?;
        if !drive.accessible() {
            return Err(StorageError::DriveUnaccessible(location));
        }
        Ok(drive.region(region).bytes[start..start + length].to_vec())
    }

    fn write(&self, location: DriveLocation, region: PrivateRegion, data: &[u8]) -> Result<()> {
        check_range(0, data.len())?;
        let mut state = self.state.lock();
        let drive = state
            .drives
            .get_mut(&location)
            .ok_or(StorageError::NotFound(location))?;
        if !drive.accessible() {
            return Err(StorageError::DriveUnaccessible(location));
        }
        drive.region_mut(region).store(0, data);
        Ok(())
    }
}

impl DriveTopology for InMemoryArray {
    fn resolve(&self, location: DriveLocation) -> Result<DriveHandle> {
        self.state
            .lock()
            .drives
            .get(&location)
            .map(|d| d.handle)
            .ok_or(StorageError::NotFound(location))
    }

    fn lifecycle_state(&self, handle: DriveHandle) -> Result<LifecycleState> {
        self.state
            .lock()
            .drive_by_handle(handle)
            .map(|(_, d)| d.lifecycle)
            .ok_or(StorageError::UnknownHandle(handle))
    }

    fn serial_number(&self, handle: DriveHandle) -> Result<SerialNumber> {
        self.state
            .lock()
            .drive_by_handle(handle)
            .map(|(_, d)| d.serial)
            .ok_or(StorageError::UnknownHandle(handle))
    }

    fn locate_serial(&self, serial: &SerialNumber) -> Result<Option<DriveLocation>> {
        Ok(self
            .state
            .lock()
            .drives
            .iter()
            .find(|(_, d)| d.serial.matches(serial))
            .map(|(loc, _)| *loc))
    }

    fn disconnect(&self, handle: DriveHandle) -> Result<()> {
        let mut state = self.state.lock();
        let (location, drive) = state
            .drive_by_handle_mut(handle)
            .ok_or(StorageError::UnknownHandle(handle))?;
        if drive.fail_disconnect {
            return Err(StorageError::Other(format!(
                "disconnect of {} rejected",
                location
            )));
        }
        drive.lifecycle = LifecycleState::Disconnected;
        state.disconnected.push(location);
        Ok(())
    }
}

impl ChassisIdentityStore for InMemoryArray {
    fn get(&self) -> Result<u32> {
        let mut state = self.state.lock();
        state.chassis_reads += 1;
        state.chassis_call()?;
        Ok(state.chassis_wwn_seed)
    }

    fn set(&self, wwn_seed: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.chassis_call()?;
        state.chassis_wwn_seed = wwn_seed;
        Ok(())
    }
}

impl UserModifiedFlag for InMemoryArray {
    fn get(&self) -> Result<bool> {
        Ok(self.state.lock().user_modified)
    }

    fn clear(&self) -> Result<()> {
        self.state.lock().user_modified = false;
        Ok(())
    }
}

impl EventLog for InMemoryArray {
    fn emit(&self, event: HomewreckerEvent) {
        tracing::info!(event = ?event, "Event logged");
        self.state.lock().events.push(event);
    }
}

impl ServiceMode for InMemoryArray {
    fn enter(&self, reason: ServiceModeReason) {
        tracing::warn!(reason = %reason, "Service mode requested");
        self.state.lock().service_mode_requests.push(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_with_mirrors() -> InMemoryArray {
        let array = InMemoryArray::new(0xAA);
        for i in 0..4 {
            array.insert_drive(DriveLocation::system_slot(i), format!("SN{}", i));
        }
        array
    }

    #[test]
    fn replicated_write_then_read_is_healthy() {
        let array = array_with_mirrors();
        let report = ReplicatedRegion::write(&array, PrivateRegion::FruDescriptor, 0, b"hello").unwrap();
        assert!(report.fully_healthy());

        let read = ReplicatedRegion::read(&array, PrivateRegion::FruDescriptor, 0, 5).unwrap();
        assert_eq!(read.data, b"hello");
        assert!(read.report.fully_healthy());
    }

    #[test]
    fn replicated_write_skips_fourth_slot() {
        let array = array_with_mirrors();
        ReplicatedRegion::write(&array, PrivateRegion::FruDescriptor, 0, b"abc").unwrap();
        let fourth = array
            .region_bytes(DriveLocation::system_slot(3), PrivateRegion::FruDescriptor)
            .unwrap();
        assert_eq!(&fourth[..3], &[0u8, 0, 0]);
    }

    #[test]
    fn corruption_sets_checksum_bit() {
        let array = array_with_mirrors();
        ReplicatedRegion::write(&array, PrivateRegion::FruDescriptor, 0, b"abc").unwrap();
        array.corrupt_region(DriveLocation::system_slot(1), PrivateRegion::FruDescriptor, 0);

        let read = ReplicatedRegion::read(&array, PrivateRegion::FruDescriptor, 0, 3).unwrap();
        assert_eq!(read.report.checksum_error_bitmap, 0b010);
        assert_eq!(read.data, b"abc");
        assert!(!read.report.fully_healthy());
    }

    #[test]
    fn divergent_copies_set_sequence_bit() {
        let array = array_with_mirrors();
        array.install_region(DriveLocation::system_slot(0), PrivateRegion::FruDescriptor, b"one");
        array.install_region(DriveLocation::system_slot(1), PrivateRegion::FruDescriptor, b"one");
        array.install_region(DriveLocation::system_slot(2), PrivateRegion::FruDescriptor, b"two");

        let read = ReplicatedRegion::read(&array, PrivateRegion::FruDescriptor, 0, 3).unwrap();
        assert_eq!(read.report.sequence_mismatch_bitmap, 0b100);
    }

    #[test]
    fn missing_drive_is_dead_replica() {
        let array = array_with_mirrors();
        array.remove_drive(DriveLocation::system_slot(2));
        let read = ReplicatedRegion::read(&array, PrivateRegion::FruDescriptor, 0, 4).unwrap();
        assert_eq!(read.report.dead_bitmap, 0b100);
    }

    #[test]
    fn no_replica_is_an_error() {
        let array = InMemoryArray::new(1);
        assert_eq!(
            ReplicatedRegion::read(&array, PrivateRegion::FruDescriptor, 0, 4),
            Err(StorageError::NoReplica)
        );
    }

    #[test]
    fn out_of_range_access_rejected() {
        let array = array_with_mirrors();
        assert!(matches!(
            DriveIo::read(&array, DriveLocation::system_slot(0), PrivateRegion::FruSignature, REGION_CAPACITY + 1),
            Err(StorageError::OutOfRange { .. })
        ));
    }

    #[test]
    fn failing_drive_refuses_io() {
        let array = array_with_mirrors();
        let loc = DriveLocation::system_slot(0);
        array.set_io_failing(loc, true);
        assert_eq!(
            DriveIo::read(&array, loc, PrivateRegion::FruSignature, 8),
            Err(StorageError::DriveUnaccessible(loc))
        );
    }

    #[test]
    fn moved_drive_carries_its_contents() {
        let array = array_with_mirrors();
        let from = DriveLocation::system_slot(3);
        let to = DriveLocation::new(0, 0, 9);
        let sig = FruSignature::new(0xAA, from);
        array.install_signature(from, &sig);

        assert!(array.move_drive(from, to));
        assert_eq!(array.signature_at(to), Some(sig));
        assert_eq!(
            array.locate_serial(&SerialNumber::new("SN3")).unwrap(),
            Some(to)
        );
    }

    #[test]
    fn disconnect_marks_lifecycle() {
        let array = array_with_mirrors();
        let loc = DriveLocation::system_slot(1);
        let handle = array.resolve(loc).unwrap();
        array.disconnect(handle).unwrap();
        assert_eq!(array.lifecycle(loc), Some(LifecycleState::Disconnected));
        assert_eq!(array.disconnected(), vec![loc]);
    }

    #[test]
    fn disconnect_failure_hook() {
        let array = array_with_mirrors();
        let loc = DriveLocation::system_slot(1);
        array.set_disconnect_failing(loc, true);
        let handle = array.resolve(loc).unwrap();
        assert!(array.disconnect(handle).is_err());
        assert!(array.disconnected().is_empty());
    }

    #[test]
    fn chassis_store_failures_are_consumed() {
        let array = InMemoryArray::new(5);
        array.fail_chassis_store(2);
        assert!(ChassisIdentityStore::get(&array).is_err());
        assert!(ChassisIdentityStore::set(&array, 9).is_err());
        assert!(ChassisIdentityStore::set(&array, 9).is_ok());
        assert_eq!(ChassisIdentityStore::get(&array).unwrap(), 9);
        assert_eq!(array.chassis_store_reads(), 2);
    }
}
