// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Constants for the BNO085 sensor driver.
//!
//! This module contains all protocol constants, report IDs, command codes,
//! FRS record IDs and Q-point values used for communication with the BNO085
//! sensor hub.

/// Buffer sizes
pub const PACKET_SEND_BUF_LEN: usize = 256;
/// The hub can send up to 270 bytes of cargo in a single report packet
pub const MAX_PACKET_SIZE: usize = 270;
/// Metadata words kept from an FRS read (Q points, range, resolution...)
pub const MAX_METADATA_SIZE: usize = 9;
pub const NUM_CHANNELS: usize = 6;

/// Length of the SHTP header that prefixes every transfer
pub const PACKET_HEADER_LENGTH: usize = 4;
/// Bit 15 of the length field marks a continuation packet
pub const CONTINUATION_BIT: u16 = 1 << 15;

// =============================================================================
// Sensor Hub (SHUB) Protocol Constants
// =============================================================================

/// Command response
pub const SHUB_COMMAND_RESP: u8 = 0xF1;
/// Command request
pub const SHUB_COMMAND_REQ: u8 = 0xF2;
/// FRS read response
pub const SHUB_FRS_READ_RESP: u8 = 0xF3;
/// FRS read request
pub const SHUB_FRS_READ_REQ: u8 = 0xF4;
/// Report ID for Product ID response
pub const SHUB_PROD_ID_RESP: u8 = 0xF8;
/// Report ID for Product ID request
pub const SHUB_PROD_ID_REQ: u8 = 0xF9;
/// Base timestamp that prefixes every input report
pub const SHUB_BASE_TIMESTAMP: u8 = 0xFB;
/// Get feature response
pub const SHUB_GET_FEATURE_RESP: u8 = 0xFC;
/// Set feature command
pub const SHUB_REPORT_SET_FEATURE_CMD: u8 = 0xFD;

// =============================================================================
// Command Channel Responses
// =============================================================================

/// Advertisement response
pub const CMD_RESP_ADVERTISEMENT: u8 = 0;
/// Error list response
pub const CMD_RESP_ERROR_LIST: u8 = 1;

// =============================================================================
// Executable/Device Channel Commands
// =============================================================================

/// Reset command
pub const EXECUTABLE_DEVICE_CMD_RESET: u8 = 1;
/// Reset complete response
pub const EXECUTABLE_DEVICE_RESP_RESET_COMPLETE: u8 = 1;

// =============================================================================
// Sensor Report IDs (from SH2 Reference Manual)
// =============================================================================

/// Accelerometer (m/s^2 including gravity): Q point 8
pub const SENSOR_REPORTID_ACCELEROMETER: u8 = 0x01;
/// Gyroscope calibrated (rad/s): Q point 9
pub const SENSOR_REPORTID_GYROSCOPE: u8 = 0x02;
/// Magnetic field calibrated (uTesla): Q point 4
pub const SENSOR_REPORTID_MAGNETIC_FIELD: u8 = 0x03;
/// Linear acceleration (m/s^2 minus gravity): Q point 8
pub const SENSOR_REPORTID_LINEAR_ACCELERATION: u8 = 0x04;
/// Unit quaternion rotation vector, Q point 14, with heading accuracy (radians)
/// Q point 12
pub const SENSOR_REPORTID_ROTATION_VECTOR: u8 = 0x05;
/// Game rotation vector: Q point 14
pub const SENSOR_REPORTID_GAME_ROTATION_VECTOR: u8 = 0x08;
pub const SENSOR_REPORTID_STEP_COUNTER: u8 = 0x11;
pub const SENSOR_REPORTID_STABILITY_CLASSIFIER: u8 = 0x13;
/// Raw MEMS readings, ADC units
pub const SENSOR_REPORTID_RAW_ACCELEROMETER: u8 = 0x14;
pub const SENSOR_REPORTID_RAW_GYROSCOPE: u8 = 0x15;
pub const SENSOR_REPORTID_RAW_MAGNETOMETER: u8 = 0x16;
pub const SENSOR_REPORTID_PERSONAL_ACTIVITY_CLASSIFIER: u8 = 0x1E;
pub const SENSOR_REPORTID_AR_VR_STABILIZED_ROTATION_VECTOR: u8 = 0x28;
pub const SENSOR_REPORTID_AR_VR_STABILIZED_GAME_ROTATION_VECTOR: u8 = 0x29;
/// Delivered on the gyro channel without the usual report framing
pub const SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR: u8 = 0x2A;

// =============================================================================
// Command IDs (SH2 Reference Manual 6.4)
// =============================================================================

pub const COMMAND_TARE: u8 = 3;
pub const COMMAND_INITIALIZE: u8 = 4;
/// Save dynamic calibration data to flash
pub const COMMAND_DCD: u8 = 6;
/// Motion engine calibration
pub const COMMAND_ME_CALIBRATE: u8 = 7;

/// Calibrate sub-command: get calibration status
pub const ME_CALIBRATE_GET: u8 = 0x01;

/// Tare sub-commands
pub const TARE_NOW: u8 = 0;
pub const TARE_PERSIST: u8 = 1;

/// Tare axis bitmaps
pub const TARE_AXIS_ALL: u8 = 0x07;
pub const TARE_AXIS_Z: u8 = 0x04;

/// Unsolicited flag
pub const SH2_INIT_UNSOLICITED: u8 = 0x80;
/// System initialization
pub const SH2_INIT_SYSTEM: u8 = 1;
/// Startup initialization (unsolicited)
pub const SH2_STARTUP_INIT_UNSOLICITED: u8 = COMMAND_INITIALIZE | SH2_INIT_UNSOLICITED;

// =============================================================================
// FRS (Flash Record System)
// =============================================================================

/// Metadata record IDs, figure 29 of the reference manual
pub const FRS_RECORDID_ACCELEROMETER: u16 = 0xE302;
pub const FRS_RECORDID_GYROSCOPE_CALIBRATED: u16 = 0xE306;
pub const FRS_RECORDID_MAGNETIC_FIELD_CALIBRATED: u16 = 0xE309;
pub const FRS_RECORDID_ROTATION_VECTOR: u16 = 0xE30B;

/// FRS read status codes (low nibble of byte 1 of the read response)
pub const FRS_READ_STATUS_NO_ERROR: u8 = 0;
pub const FRS_READ_STATUS_UNRECOGNIZED_FRS_TYPE: u8 = 1;
pub const FRS_READ_STATUS_BUSY: u8 = 2;
pub const FRS_READ_STATUS_READ_COMPLETE: u8 = 3;
pub const FRS_READ_STATUS_OFFSET_OUT_OF_RANGE: u8 = 4;
pub const FRS_READ_STATUS_RECORD_EMPTY: u8 = 5;
/// Read completed because the requested block size was reached
pub const FRS_READ_STATUS_BLOCK_COMPLETE: u8 = 6;
/// Block size reached and the record ended with it
pub const FRS_READ_STATUS_BLOCK_AND_RECORD_COMPLETE: u8 = 7;
pub const FRS_READ_STATUS_DEVICE_ERROR: u8 = 8;

// =============================================================================
// Q-Point Values for Fixed-Point Conversion
// =============================================================================

pub const ACCELEROMETER_Q1: u8 = 8;
pub const LINEAR_ACCELEROMETER_Q1: u8 = 8;
pub const GYRO_Q1: u8 = 9;
pub const MAGNETOMETER_Q1: u8 = 4;
pub const ROTATION_VECTOR_Q1: u8 = 14;
/// Heading accuracy estimate in radians
pub const ROTATION_VECTOR_ACCURACY_Q1: u8 = 12;
/// Fast gyro carried by the gyro-integrated rotation vector
pub const ANGULAR_VELOCITY_Q1: u8 = 10;

// =============================================================================
// Helper Functions
// =============================================================================

/// Convert Q-point fixed-point value to f32
#[inline]
pub fn q_to_f32(q_val: i16, q_point: u8) -> f32 {
    f32::from(q_val) * 2f32.powi(-i32::from(q_point))
}

/// Convert a 32-bit Q-point word (FRS metadata) to f32
#[inline]
pub fn q32_to_f32(q_val: i32, q_point: u8) -> f32 {
    (q_val as f64 * 2f64.powi(-i32::from(q_point))) as f32
}

/// Convert f32 back to a 16-bit Q-point value, rounding to nearest and
/// saturating at the i16 range
#[inline]
pub fn q_to_raw(f32_val: f32, q_point: u8) -> i16 {
    let scaled = (f64::from(f32_val) * 2f64.powi(i32::from(q_point))).round();
    scaled.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Get FRS read status description string
pub fn frs_read_status_to_str(status: u8) -> &'static str {
    match status {
        FRS_READ_STATUS_NO_ERROR => "no error",
        FRS_READ_STATUS_UNRECOGNIZED_FRS_TYPE => "unrecognized FRS type",
        FRS_READ_STATUS_BUSY => "busy",
        FRS_READ_STATUS_READ_COMPLETE => "read record completed",
        FRS_READ_STATUS_OFFSET_OUT_OF_RANGE => "offset out of range",
        FRS_READ_STATUS_RECORD_EMPTY => "record empty",
        FRS_READ_STATUS_BLOCK_COMPLETE => "read block completed",
        FRS_READ_STATUS_BLOCK_AND_RECORD_COMPLETE => "read block and record completed",
        FRS_READ_STATUS_DEVICE_ERROR => "device error",
        _ => "reserved",
    }
}
