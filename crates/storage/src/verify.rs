//! Replica verification report returned by the replicated region.

use serde::{Deserialize, Serialize};

/// Per-replica verification outcome of a replicated read or write.
///
/// Bit `i` of each bitmap refers to the replica on mirrored slot `i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Replicas whose block checksum did not verify.
    pub checksum_error_bitmap: u16,
    /// Replicas whose write sequence or contents differ from the chosen copy.
    pub sequence_mismatch_bitmap: u16,
    /// Replicas that could not be accessed at all.
    pub dead_bitmap: u16,
}

impl VerifyReport {
    /// A report in which every replica verified.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// All replicas present, checksummed and mutually consistent.
    pub fn fully_healthy(&self) -> bool {
        self.checksum_error_bitmap == 0 && self.sequence_mismatch_bitmap == 0 && self.dead_bitmap == 0
    }

    /// True if replica `index` raised any error.
    pub fn replica_failed(&self, index: usize) -> bool {
        let bit = 1u16 << index;
        (self.checksum_error_bitmap | self.sequence_mismatch_bitmap | self.dead_bitmap) & bit != 0
    }

    pub fn failed_replica_count(&self) -> u32 {
        (self.checksum_error_bitmap | self.sequence_mismatch_bitmap | self.dead_bitmap).count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fully_healthy() {
        assert!(VerifyReport::healthy().fully_healthy());
        assert_eq!(VerifyReport::healthy().failed_replica_count(), 0);
    }

    #[test]
    fn any_bitmap_breaks_health() {
        let report = VerifyReport {
            sequence_mismatch_bitmap: 0b010,
            ..Default::default()
        };
        assert!(!report.fully_healthy());
        assert!(report.replica_failed(1));
        assert!(!report.replica_failed(0));

        let report = VerifyReport {
            checksum_error_bitmap: 0b001,
            dead_bitmap: 0b100,
            ..Default::default()
        };
        assert_eq!(report.failed_replica_count(), 2);
    }
}
