// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hardware integration tests for the BNO085 driver
//!
//! These tests require real hardware and are marked with #[ignore].
//! Run with: RUST_LOG=debug cargo test -- --ignored --test-threads=1
//!
//! Note: Tests use handle_one_message() or handle_messages(timeout, max_count)
//! instead of handle_all_messages() which does not return while reports are
//! streaming.

use bno085::{
    CalibrationTarget, DriverConfig, FrsReadOutcome, SpiLinuxInterface, BNO085,
    FRS_RECORDID_ACCELEROMETER, FRS_RECORDID_GYROSCOPE_CALIBRATED,
    FRS_RECORDID_MAGNETIC_FIELD_CALIBRATED, FRS_RECORDID_ROTATION_VECTOR, GYRO_Q1,
    MAGNETOMETER_Q1, ROTATION_VECTOR_Q1, SENSOR_REPORTID_ACCELEROMETER,
    SENSOR_REPORTID_MAGNETIC_FIELD,
};
use std::{sync::Once, thread::sleep, time::Duration};

static INIT: Once = Once::new();

/// Initialize logger for tests (only once)
fn init_logger() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

const TEST_SPI_DEVICE: &str = "/dev/spidev1.0";
const TEST_INT_GPIO: &str = "IMU_INT";
const TEST_RST_GPIO: &str = "IMU_RST";
const REPORT_INTERVAL_MS: u16 = 100;
const REPORT_INTERVAL_US: u32 = 100_000;
const SENSOR_WARMUP_MS: u64 = 500;

fn open_imu() -> BNO085<SpiLinuxInterface> {
    init_logger();
    let mut imu = BNO085::new_spi_from_symbol(
        TEST_SPI_DEVICE,
        TEST_INT_GPIO,
        TEST_RST_GPIO,
        DriverConfig::default(),
    )
    .expect("Failed to create IMU driver");
    imu.init().expect("Failed to initialize IMU");
    imu
}

fn pump(imu: &mut BNO085<SpiLinuxInterface>, rounds: usize) {
    for _ in 0..rounds {
        imu.handle_one_message(u32::from(REPORT_INTERVAL_MS) * 2);
        sleep(Duration::from_millis(u64::from(REPORT_INTERVAL_MS)));
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

// =============================================================================
// Startup
// =============================================================================

#[test]
#[ignore]
fn test_imu_initialization() {
    let imu = open_imu();
    let pid = imu.product_id().expect("No product id");
    println!(
        "✓ IMU initialized, firmware {}.{}.{}",
        pid.sw_version_major, pid.sw_version_minor, pid.sw_version_patch
    );
}

#[test]
#[ignore]
fn test_soft_reset() {
    let mut imu = open_imu();
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));

    imu.soft_reset().expect("Failed to perform soft reset");
    let reason = imu.reset_reason().expect("No reset reason");
    assert!(imu.device_reset());

    println!("✓ Soft reset successful, reset cause {}", reason);
}

// =============================================================================
// Sensor readings
// =============================================================================

#[test]
#[ignore]
fn test_accelerometer() {
    let mut imu = open_imu();
    assert!(imu
        .enable_report(SENSOR_REPORTID_ACCELEROMETER, REPORT_INTERVAL_US)
        .expect("Failed to enable accelerometer"));
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    pump(&mut imu, 10);

    let accel = imu.sensor_data().accelerometer();
    let magnitude = norm(&accel);
    assert!(
        magnitude > 8.0 && magnitude < 12.0,
        "Accelerometer magnitude {} outside expected range",
        magnitude
    );
    println!("✓ Accelerometer: {:?}, |a| = {:.2} m/s²", accel, magnitude);
}

#[test]
#[ignore]
fn test_gyroscope() {
    let mut imu = open_imu();
    imu.enable_gyro(REPORT_INTERVAL_US)
        .expect("Failed to enable gyroscope");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    pump(&mut imu, 10);

    // At rest, angular velocity should be small
    let gyro = imu.sensor_data().gyro();
    assert!(
        gyro.iter().all(|v| v.abs() < 1.0),
        "Gyroscope readings {:?} too high for stationary sensor",
        gyro
    );
    println!("✓ Gyroscope: {:?} rad/s", gyro);
}

#[test]
#[ignore]
fn test_magnetometer() {
    let mut imu = open_imu();
    imu.enable_report(SENSOR_REPORTID_MAGNETIC_FIELD, REPORT_INTERVAL_US)
        .expect("Failed to enable magnetometer");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    pump(&mut imu, 10);

    // Earth's magnetic field is typically 25-65 µT
    let mag = imu.sensor_data().mag_field();
    let magnitude = norm(&mag);
    assert!(
        magnitude > 10.0 && magnitude < 100.0,
        "Magnetic field {} outside expected range",
        magnitude
    );
    println!("✓ Magnetometer: {:?}, |B| = {:.2} µT", mag, magnitude);
}

#[test]
#[ignore]
fn test_rotation_vector() {
    let mut imu = open_imu();
    imu.enable_rotation_vector(REPORT_INTERVAL_US)
        .expect("Failed to enable rotation vector");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS * 2));
    pump(&mut imu, 10);

    let data = imu.sensor_data();
    let quat = data.quaternion();
    let magnitude = norm(&quat);
    assert!(
        (magnitude - 1.0).abs() < 0.1,
        "Quaternion magnitude {} should be close to 1.0",
        magnitude
    );
    println!(
        "✓ Rotation: {:?}, roll {:.1} pitch {:.1} yaw {:.1}, acc = {:.3} rad",
        quat,
        data.roll().to_degrees(),
        data.pitch().to_degrees(),
        data.yaw().to_degrees(),
        data.quat_radian_accuracy()
    );
}

#[test]
#[ignore]
fn test_linear_acceleration() {
    let mut imu = open_imu();
    imu.enable_linear_accel(REPORT_INTERVAL_US)
        .expect("Failed to enable linear accel");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    pump(&mut imu, 10);

    // At rest, linear acceleration should be near zero
    let linear = imu.sensor_data().linear_accel();
    assert!(norm(&linear) < 2.0, "Linear accel too high for stationary sensor");
    println!("✓ Linear accel: {:?}", linear);
}

// =============================================================================
// Polling API
// =============================================================================

#[test]
#[ignore]
fn test_handle_messages_with_limit() {
    let mut imu = open_imu();
    imu.enable_report(SENSOR_REPORTID_ACCELEROMETER, REPORT_INTERVAL_US)
        .expect("Failed to enable accelerometer");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));

    let count = imu.handle_messages(u32::from(REPORT_INTERVAL_MS) * 2, 5);
    assert!(
        count > 0 && count <= 5,
        "Should have handled 1-5 messages, got {}",
        count
    );
    println!("✓ handle_messages(timeout, max=5): {} messages", count);
}

#[test]
#[ignore]
fn test_get_readings() {
    let mut imu = open_imu();
    imu.enable_accelerometer(REPORT_INTERVAL_US)
        .expect("Failed to enable accelerometer");

    let mut seen = false;
    for _ in 0..50 {
        if imu.get_readings() == SENSOR_REPORTID_ACCELEROMETER {
            seen = true;
            break;
        }
        sleep(Duration::from_millis(u64::from(REPORT_INTERVAL_MS) / 2));
    }
    assert!(seen, "No accelerometer report polled");
    println!("✓ get_readings() returned an accelerometer report");
}

#[test]
#[ignore]
fn test_report_status_queries() {
    let mut imu = open_imu();
    assert!(!imu.is_report_enabled(SENSOR_REPORTID_ACCELEROMETER));

    imu.enable_report(SENSOR_REPORTID_ACCELEROMETER, REPORT_INTERVAL_US)
        .expect("Failed to enable accelerometer");
    assert!(imu.is_report_enabled(SENSOR_REPORTID_ACCELEROMETER));

    pump(&mut imu, 5);
    assert!(imu.sensor_data().timestamp() > 0);
    println!("✓ is_report_enabled() works");
}

#[test]
#[ignore]
fn test_multiple_sensors() {
    let mut imu = open_imu();
    imu.enable_accelerometer(REPORT_INTERVAL_US).expect("accel");
    imu.enable_gyro(REPORT_INTERVAL_US).expect("gyro");
    imu.enable_rotation_vector(REPORT_INTERVAL_US)
        .expect("rotation");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));

    for _ in 0..20 {
        imu.handle_messages(u32::from(REPORT_INTERVAL_MS) * 2, 10);
        sleep(Duration::from_millis(u64::from(REPORT_INTERVAL_MS)));
    }

    let data = imu.sensor_data();
    println!("✓ Multiple sensors:");
    println!("  Accel: {:?}", data.accelerometer());
    println!("  Gyro: {:?}", data.gyro());
    println!("  Rotation: {:?}", data.quaternion());
}

// =============================================================================
// Calibration and metadata
// =============================================================================

#[test]
#[ignore]
fn test_calibration_status() {
    let mut imu = open_imu();
    imu.calibrate(CalibrationTarget::All)
        .expect("Failed to start calibration");
    assert!(!imu.calibration_complete());

    for _ in 0..20 {
        if imu.calibration_complete() {
            break;
        }
        imu.handle_one_message(u32::from(REPORT_INTERVAL_MS));
    }
    assert!(
        imu.calibration_complete(),
        "Calibration status {}",
        imu.calibration_status()
    );
    imu.end_calibration().expect("Failed to stop calibration");
    println!("✓ Calibration command acknowledged");
}

#[test]
#[ignore]
fn test_frs_metadata() {
    let mut imu = open_imu();
    let outcome = imu
        .read_frs_data(FRS_RECORDID_ACCELEROMETER, 0, 9)
        .expect("Failed to send FRS read");
    assert_ne!(outcome, FrsReadOutcome::TimedOut);

    let q1 = imu.get_q1(FRS_RECORDID_ACCELEROMETER);
    let range = imu.get_range(FRS_RECORDID_ACCELEROMETER);
    let resolution = imu.get_resolution(FRS_RECORDID_ACCELEROMETER);
    assert_eq!(q1, 8);
    assert!(range > 0.0);
    println!(
        "✓ Accelerometer Q1 {} range {:.2} resolution {:.5}",
        q1, range, resolution
    );
}

#[test]
#[ignore]
fn test_frs_q_points() {
    let mut imu = open_imu();
    for (record_id, expected) in [
        (FRS_RECORDID_GYROSCOPE_CALIBRATED, GYRO_Q1),
        (FRS_RECORDID_MAGNETIC_FIELD_CALIBRATED, MAGNETOMETER_Q1),
        (FRS_RECORDID_ROTATION_VECTOR, ROTATION_VECTOR_Q1),
    ] {
        let q1 = imu.get_q1(record_id);
        assert_eq!(q1, u16::from(expected), "Q1 of record 0x{:04X}", record_id);
        println!("✓ Record 0x{:04X} Q1 {}", record_id, q1);
    }
}
