// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Latest readings from every supported report.
//!
//! Each sensor has a single slot holding the raw fixed point values of its
//! most recent report. Accessors convert to floating point using the
//! sensor's Q point on every call.

use crate::{
    constants::{
        q_to_f32, ACCELEROMETER_Q1, ANGULAR_VELOCITY_Q1, GYRO_Q1, LINEAR_ACCELEROMETER_Q1,
        MAGNETOMETER_Q1, ROTATION_VECTOR_ACCURACY_Q1, ROTATION_VECTOR_Q1,
    },
    reports::{InputReport, RawKind, SensorReading, VectorKind, ACTIVITY_CONFIDENCES},
};

fn scale3(raw: [i16; 3], q_point: u8) -> [f32; 3] {
    raw.map(|v| q_to_f32(v, q_point))
}

/// Raw three-axis value and its accuracy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct VectorSlot {
    raw: [i16; 3],
    accuracy: u8,
}

/// Sensor data storage for all supported reports
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SensorData {
    accelerometer: VectorSlot,
    linear_accel: VectorSlot,
    gyro: VectorSlot,
    mag_field: VectorSlot,

    /// Rotation quaternion [i, j, k, real], shared by every rotation report
    quaternion: [i16; 4],
    quat_radian_accuracy: i16,
    quat_accuracy: u8,

    /// Angular velocity from the gyro integrated rotation vector
    fast_gyro: [i16; 3],

    raw_accelerometer: [i16; 3],
    raw_gyro: [i16; 3],
    raw_magnetometer: [i16; 3],

    step_count: u16,
    stability_classifier: u8,
    activity_classifier: u8,
    activity_confidences: [u8; ACTIVITY_CONFIDENCES],

    /// Base timestamp of the last timestamped report, microseconds
    timestamp: u32,
}

impl SensorData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the contents of one input report, replacing the previous value
    pub fn apply(&mut self, report: &InputReport) {
        if let Some(timestamp) = report.timestamp {
            self.timestamp = timestamp;
        }
        let accuracy = report.accuracy();

        match report.reading {
            SensorReading::Vector { kind, x, y, z } => {
                let slot = match kind {
                    VectorKind::Accelerometer => &mut self.accelerometer,
                    VectorKind::LinearAcceleration => &mut self.linear_accel,
                    VectorKind::Gyroscope => &mut self.gyro,
                    VectorKind::MagneticField => &mut self.mag_field,
                };
                *slot = VectorSlot {
                    raw: [x, y, z],
                    accuracy,
                };
            }
            SensorReading::Raw { kind, x, y, z } => {
                let slot = match kind {
                    RawKind::Accelerometer => &mut self.raw_accelerometer,
                    RawKind::Gyroscope => &mut self.raw_gyro,
                    RawKind::Magnetometer => &mut self.raw_magnetometer,
                };
                *slot = [x, y, z];
            }
            SensorReading::Rotation {
                i,
                j,
                k,
                real,
                accuracy: radian_accuracy,
                ..
            } => {
                self.quaternion = [i, j, k, real];
                self.quat_radian_accuracy = radian_accuracy.unwrap_or(0);
                self.quat_accuracy = accuracy;
            }
            SensorReading::GyroIntegrated {
                i,
                j,
                k,
                real,
                x,
                y,
                z,
            } => {
                self.quaternion = [i, j, k, real];
                self.fast_gyro = [x, y, z];
            }
            SensorReading::StepCount(count) => self.step_count = count,
            SensorReading::Stability(class) => self.stability_classifier = class,
            SensorReading::Activity {
                most_likely,
                confidence,
            } => {
                self.activity_classifier = most_likely;
                self.activity_confidences = confidence;
            }
        }
    }

    /// Accelerometer [x, y, z] in m/s², gravity included
    pub fn accelerometer(&self) -> [f32; 3] {
        scale3(self.accelerometer.raw, ACCELEROMETER_Q1)
    }

    pub fn accelerometer_accuracy(&self) -> u8 {
        self.accelerometer.accuracy
    }

    /// Linear acceleration [x, y, z] in m/s² (gravity removed)
    pub fn linear_accel(&self) -> [f32; 3] {
        scale3(self.linear_accel.raw, LINEAR_ACCELEROMETER_Q1)
    }

    pub fn linear_accel_accuracy(&self) -> u8 {
        self.linear_accel.accuracy
    }

    /// Calibrated gyroscope [x, y, z] in rad/s
    pub fn gyro(&self) -> [f32; 3] {
        scale3(self.gyro.raw, GYRO_Q1)
    }

    pub fn gyro_accuracy(&self) -> u8 {
        self.gyro.accuracy
    }

    /// Calibrated magnetic field [x, y, z] in µTesla
    pub fn mag_field(&self) -> [f32; 3] {
        scale3(self.mag_field.raw, MAGNETOMETER_Q1)
    }

    pub fn mag_field_accuracy(&self) -> u8 {
        self.mag_field.accuracy
    }

    /// Rotation quaternion [i, j, k, real]
    pub fn quaternion(&self) -> [f32; 4] {
        self.quaternion.map(|v| q_to_f32(v, ROTATION_VECTOR_Q1))
    }

    /// Heading accuracy estimate in radians
    pub fn quat_radian_accuracy(&self) -> f32 {
        q_to_f32(self.quat_radian_accuracy, ROTATION_VECTOR_ACCURACY_Q1)
    }

    pub fn quat_accuracy(&self) -> u8 {
        self.quat_accuracy
    }

    /// Angular velocity [x, y, z] in rad/s from the gyro channel
    pub fn fast_gyro(&self) -> [f32; 3] {
        scale3(self.fast_gyro, ANGULAR_VELOCITY_Q1)
    }

    pub fn raw_accelerometer(&self) -> [i16; 3] {
        self.raw_accelerometer
    }

    pub fn raw_gyro(&self) -> [i16; 3] {
        self.raw_gyro
    }

    pub fn raw_magnetometer(&self) -> [i16; 3] {
        self.raw_magnetometer
    }

    pub fn step_count(&self) -> u16 {
        self.step_count
    }

    pub fn stability_classifier(&self) -> u8 {
        self.stability_classifier
    }

    /// Most likely activity state
    pub fn activity_classifier(&self) -> u8 {
        self.activity_classifier
    }

    /// Confidence (percent) for each activity state
    pub fn activity_confidences(&self) -> [u8; ACTIVITY_CONFIDENCES] {
        self.activity_confidences
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Normalized quaternion as (w, x, y, z), `None` for a zero quaternion
    fn unit_quaternion(&self) -> Option<(f32, f32, f32, f32)> {
        let [x, y, z, w] = self.quaternion();
        let norm = (w * w + x * x + y * y + z * z).sqrt();
        if norm == 0.0 {
            return None;
        }
        Some((w / norm, x / norm, y / norm, z / norm))
    }

    /// Rotation around the x axis, radians
    pub fn roll(&self) -> f32 {
        self.unit_quaternion()
            .map(|(w, x, y, z)| {
                let t0 = 2.0 * (w * x + y * z);
                let t1 = 1.0 - 2.0 * (x * x + y * y);
                t0.atan2(t1)
            })
            .unwrap_or(0.0)
    }

    /// Rotation around the y axis, radians
    pub fn pitch(&self) -> f32 {
        self.unit_quaternion()
            .map(|(w, x, y, z)| (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin())
            .unwrap_or(0.0)
    }

    /// Rotation around the z axis (heading), radians
    pub fn yaw(&self) -> f32 {
        self.unit_quaternion()
            .map(|(w, x, y, z)| {
                let t3 = 2.0 * (w * z + x * y);
                let t4 = 1.0 - 2.0 * (y * y + z * z);
                t3.atan2(t4)
            })
            .unwrap_or(0.0)
    }
}
