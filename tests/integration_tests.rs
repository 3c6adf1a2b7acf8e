/*
 * Integration tests for thermgov
 *
 * These run the startup sequence and the governor end to end against fake
 * sysfs trees built in temporary directories.
 */

use std::path::PathBuf;
use std::time::Duration;

use mockall::mock;
use serial_test::serial;
use tempfile::tempdir;

use thermgov::app::{kill_daemon, start_governor_with};
use thermgov::daemon::{LockAttempt, LockBudget, PidLock};
use tg_core::test_support::FakeSysfs;
use tg_core::{
    check_actuation, Actuator, CapabilityBudget, ControlPhase, FrequencyBounds, GovernorSettings,
    Result, ThermgovError, TickOutcome,
};

const MIN_KHZ: i64 = 800_000;
const MAX_KHZ: i64 = 3_200_000;

const FAST_CHECK: CapabilityBudget = CapabilityBudget {
    attempts: 2,
    delay: Duration::ZERO,
};

const FAST_LOCK: LockBudget = LockBudget {
    attempts: 2,
    backoff: Duration::ZERO,
};

mock! {
    pub Cpu {}

    impl Actuator for Cpu {
        fn set_ceiling(&self, hz: f64) -> usize;
        fn current_ceiling(&self) -> Option<f64>;
        fn bounds(&self) -> Result<FrequencyBounds>;
        fn operating_frequency(&self) -> Option<f64>;
    }
}

// Test utilities
fn machine(cores: usize, sensor: &str, millidegrees: &str) -> FakeSysfs {
    let fake = FakeSysfs::new();
    fake.add_thermal_zone(0, "acpitz", Some("30000"));
    fake.add_hwmon(0, sensor, Some(millidegrees));
    for cpu in 0..cores {
        fake.add_cpu(cpu, MIN_KHZ, MAX_KHZ);
    }
    fake
}

fn settings(sensor: &str, target: f64) -> GovernorSettings {
    GovernorSettings {
        sensor: Some(sensor.to_string()),
        target_celsius: Some(target),
        period_secs: 1.0,
        ..GovernorSettings::default()
    }
}

#[test]
fn test_first_iteration_below_target_raises_or_holds() {
    let fake = machine(4, "CPU", "45000");
    for cpu in 0..4 {
        fake.set_scaling_max_khz(cpu, 2_000_000);
    }

    let mut session =
        start_governor_with(&settings("CPU", 60.0), &fake.sysfs(), FAST_CHECK, FAST_LOCK).unwrap();

    // The capability check leaves the system at full performance
    assert_eq!(fake.scaling_max_khz(0), Some(MAX_KHZ));

    match session.governor_mut().tick() {
        TickOutcome::Applied { tick, cores } => {
            assert_eq!(cores, 4);
            assert_eq!(tick.temperature, 45.0);
            assert_eq!(tick.command_hz, 3_200_000_000.0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    match session.governor().phase() {
        ControlPhase::Running(state) => assert_eq!(state.previous_temperature, 45.0),
        ControlPhase::Uninitialized => panic!("governor did not start"),
    }
}

#[test]
fn test_overheating_clamps_to_floor_and_restores_on_exit() {
    let fake = machine(2, "CPU", "95000");
    let mut session =
        start_governor_with(&settings("CPU", 60.0), &fake.sysfs(), FAST_CHECK, FAST_LOCK).unwrap();

    for _ in 0..10 {
        assert!(matches!(session.governor_mut().tick(), TickOutcome::Applied { .. }));
    }
    assert_eq!(fake.scaling_max_khz(0), Some(MIN_KHZ));
    assert_eq!(fake.scaling_max_khz(1), Some(MIN_KHZ));

    drop(session);
    assert_eq!(fake.scaling_max_khz(0), Some(MAX_KHZ));
    assert_eq!(fake.scaling_max_khz(1), Some(MAX_KHZ));
}

#[test]
fn test_missing_sensor_fails_without_actuation() {
    let fake = machine(2, "coretemp", "45000");
    fake.set_scaling_max_khz(0, 1_500_000);
    fake.set_scaling_max_khz(1, 1_500_000);

    let err = match start_governor_with(&settings("CPU", 60.0), &fake.sysfs(), FAST_CHECK, FAST_LOCK) {
        Ok(_) => panic!("resolved a sensor that does not exist"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<ThermgovError>(),
        Some(ThermgovError::SensorNotFound(id)) if id == "CPU"
    ));
    assert_eq!(fake.scaling_max_khz(0), Some(1_500_000));
    assert_eq!(fake.scaling_max_khz(1), Some(1_500_000));
}

#[test]
fn test_invalid_period_rejected_before_hardware() {
    let fake = machine(1, "CPU", "45000");
    fake.set_scaling_max_khz(0, 1_500_000);

    let bad = GovernorSettings {
        period_secs: 0.0,
        ..settings("CPU", 60.0)
    };
    let err = match start_governor_with(&bad, &fake.sysfs(), FAST_CHECK, FAST_LOCK) {
        Ok(_) => panic!("accepted a zero period"),
        Err(e) => e,
    };
    assert!(err.downcast_ref::<ThermgovError>().is_some_and(|e| e.is_config()));
    assert_eq!(fake.scaling_max_khz(0), Some(1_500_000));
}

#[test]
fn test_no_cpufreq_is_fatal() {
    let fake = FakeSysfs::new();
    fake.add_hwmon(0, "CPU", Some("45000"));

    let err = match start_governor_with(&settings("CPU", 60.0), &fake.sysfs(), FAST_CHECK, FAST_LOCK) {
        Ok(_) => panic!("started without cpufreq"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<ThermgovError>(),
        Some(ThermgovError::BoundsUnavailable)
    ));
}

#[test]
fn test_capability_check_failure_is_fatal() {
    let fake = machine(1, "CPU", "45000");
    // A directory in place of the control file: every write fails
    let ceiling = fake.sysfs().cpufreq_file(0, "scaling_max_freq");
    std::fs::remove_file(&ceiling).unwrap();
    std::fs::create_dir(&ceiling).unwrap();

    let err = match start_governor_with(&settings("CPU", 60.0), &fake.sysfs(), FAST_CHECK, FAST_LOCK) {
        Ok(_) => panic!("entered the control loop without actuation"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<ThermgovError>(),
        Some(ThermgovError::CeilingNotApplied { .. })
    ));
}

#[test]
fn test_capability_check_with_ignored_writes() {
    // Writes are accepted but never take effect, as with missing privilege
    let mut cpu = MockCpu::new();
    cpu.expect_set_ceiling().return_const(8usize);
    cpu.expect_current_ceiling().return_const(Some(2_400_000_000.0));

    let bounds = FrequencyBounds::new(800_000_000.0, 3_200_000_000.0).unwrap();
    let err = check_actuation(&cpu, &bounds, FAST_CHECK).unwrap_err();
    assert!(matches!(
        err,
        ThermgovError::CeilingNotApplied { observed_hz: Some(hz), .. } if hz == 2_400_000_000.0
    ));
}

#[test]
#[serial]
fn test_daemon_session_holds_lock_until_dropped() {
    let fake = machine(1, "CPU", "70000");
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join("thermgov.pid");

    let daemon_settings = GovernorSettings {
        pid_file: Some(pid_file.clone()),
        ..settings("CPU", 60.0)
    };
    let session = start_governor_with(&daemon_settings, &fake.sysfs(), FAST_CHECK, FAST_LOCK).unwrap();

    assert!(matches!(PidLock::try_acquire(&pid_file).unwrap(), LockAttempt::Held { .. }));

    drop(session);
    assert!(!pid_file.exists());
    assert!(matches!(PidLock::try_acquire(&pid_file).unwrap(), LockAttempt::Acquired(_)));
}

#[test]
#[serial]
fn test_second_daemon_cannot_start_while_first_holds_lock() {
    let fake = machine(1, "CPU", "70000");
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join("thermgov.pid");

    // Held with no PID recorded, so there is nobody to signal
    let _holder = match PidLock::try_acquire(&pid_file).unwrap() {
        LockAttempt::Acquired(lock) => lock,
        LockAttempt::Held { .. } => panic!("fresh lock already held"),
    };
    fake.set_scaling_max_khz(0, 1_000_000);

    let daemon_settings = GovernorSettings {
        pid_file: Some(pid_file.clone()),
        ..settings("CPU", 60.0)
    };
    let err = match start_governor_with(&daemon_settings, &fake.sysfs(), FAST_CHECK, FAST_LOCK) {
        Ok(_) => panic!("two instances hold the same lock"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<ThermgovError>(),
        Some(ThermgovError::LockContended { pid: None, .. })
    ));
    // The loser never ran its capability check
    assert_eq!(fake.scaling_max_khz(0), Some(1_000_000));
}

#[test]
#[serial]
fn test_kill_daemon_without_running_instance() {
    let dir = tempdir().unwrap();
    let pid_file: PathBuf = dir.path().join("thermgov.pid");

    kill_daemon(&pid_file).unwrap();
    assert!(!pid_file.exists());
}
