//! Boot cycle suite
//!
//! Exercises the public `homewrecker` surface across whole boot cycles:
//! initialize, reboot, lose or replace drives, reboot again.
//!
//! ```bash
//! cargo test --test boot_cycle
//! ```

mod test_utils;

use homewrecker::{DriveLocation, MiniVerdict, SerialNumber, ServiceModeReason, Verdict};
use proptest::prelude::*;
use test_utils::{arbitrator, initialized_array, CHASSIS};

fn removed_slots() -> impl Strategy<Value = Vec<usize>> {
    proptest::sample::subsequence(vec![0usize, 1, 2, 3], 0..=4)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn full_boot_tolerates_two_lost_drives(removed in removed_slots()) {
        let array = initialized_array(CHASSIS);
        for &slot in &removed {
            array.remove_drive(DriveLocation::system_slot(slot));
        }

        let verdict = arbitrator(&array).run_full_arbitration().unwrap();
        if removed.len() <= 2 {
            prop_assert_eq!(verdict, Verdict::Boot);
            prop_assert!(array.service_mode_requests().is_empty());
        } else {
            prop_assert_eq!(verdict, Verdict::IntegrityBroken);
        }
    }

    #[test]
    fn mini_boot_refuses_lost_mirror_pair(removed in removed_slots()) {
        let array = initialized_array(CHASSIS);
        for &slot in &removed {
            array.remove_drive(DriveLocation::system_slot(slot));
        }

        let verdict = arbitrator(&array).run_mini_arbitration().unwrap();
        let same_pair = removed == vec![0, 2] || removed == vec![1, 3];
        match removed.len() {
            0 | 1 => prop_assert_eq!(verdict, MiniVerdict::Boot),
            2 if same_pair => prop_assert_eq!(
                verdict,
                MiniVerdict::ServiceMode(ServiceModeReason::MirrorPairLost)
            ),
            2 => prop_assert_eq!(verdict, MiniVerdict::Boot),
            _ => prop_assert_eq!(
                verdict,
                MiniVerdict::ServiceMode(ServiceModeReason::SystemDriveIntegrityBroken)
            ),
        }
    }
}

#[test]
fn test_replacement_cycle_keeps_sequence_monotonic() {
    let array = initialized_array(CHASSIS);
    let mut last_sequence = 0;

    for round in 0..3 {
        let homewrecker = arbitrator(&array);
        assert_eq!(homewrecker.run_full_arbitration().unwrap(), Verdict::Boot);

        let location = DriveLocation::system_slot(3);
        let serial = format!("REPLACEMENT-{}", round);
        array.remove_drive(location);
        array.insert_drive(location, serial.as_str());

        let descriptor = homewrecker.accept_replacement_drive(3).unwrap();
        assert!(descriptor.sequence_number > last_sequence);
        assert!(descriptor.system_drive_serial[3].matches(&SerialNumber::new(&serial)));
        last_sequence = descriptor.sequence_number;
    }

    let homewrecker = arbitrator(&array);
    assert_eq!(homewrecker.run_full_arbitration().unwrap(), Verdict::Boot);
    assert_eq!(homewrecker.sequence().current(), last_sequence);
}

#[test]
fn test_drives_moved_to_another_chassis_are_refused() {
    let array = initialized_array(CHASSIS);
    array.set_chassis_wwn_seed(CHASSIS + 1);

    assert_eq!(
        arbitrator(&array).run_full_arbitration().unwrap(),
        Verdict::ChassisMismatched
    );
    assert_eq!(
        arbitrator(&array).run_mini_arbitration().unwrap(),
        MiniVerdict::ServiceMode(ServiceModeReason::ChassisMismatched)
    );
}

/// Accepting an operator-modified seed lets one boot through. Neither the
/// descriptor nor the chassis store takes the new seed, so the next boot
/// refuses again.
#[test]
fn test_accepted_seed_change_lasts_one_boot() {
    let array = initialized_array(CHASSIS);
    array.set_chassis_wwn_seed(CHASSIS + 1);
    array.set_user_modified(true);

    assert_eq!(arbitrator(&array).run_full_arbitration().unwrap(), Verdict::Boot);
    assert!(!array.user_modified());
    assert_eq!(array.chassis_wwn_seed(), CHASSIS + 1);

    assert_eq!(
        arbitrator(&array).run_full_arbitration().unwrap(),
        Verdict::ChassisMismatched
    );
}

#[test]
fn test_mini_then_full_boot_refuses_swapped_drives() {
    let array = initialized_array(CHASSIS);
    array.swap_drives(DriveLocation::system_slot(0), DriveLocation::system_slot(1));

    let homewrecker = arbitrator(&array);
    assert_eq!(homewrecker.run_mini_arbitration().unwrap(), MiniVerdict::Boot);
    assert_eq!(homewrecker.run_full_arbitration().unwrap(), Verdict::Disordered);
}
