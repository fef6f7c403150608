// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Request payloads for the Control and Executable channels.
//!
//! Every builder returns the cargo only; framing is done by [`crate::shtp`].

use crate::constants::{
    COMMAND_DCD, COMMAND_ME_CALIBRATE, COMMAND_TARE, EXECUTABLE_DEVICE_CMD_RESET,
    ME_CALIBRATE_GET, SHUB_COMMAND_REQ, SHUB_PROD_ID_REQ, SHUB_REPORT_SET_FEATURE_CMD,
    TARE_AXIS_ALL, TARE_AXIS_Z, TARE_NOW, TARE_PERSIST,
};
use strum::{Display, FromRepr};

/// Length of a set feature command
pub const SET_FEATURE_LEN: usize = 17;
/// Length of a command request
pub const COMMAND_REQ_LEN: usize = 12;
/// Number of command parameters P0..P8
pub const COMMAND_PARAMS: usize = 9;

/// Which sensors the motion engine should calibrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CalibrationTarget {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    PlanarAccelerometer,
    /// Accelerometer, gyroscope and magnetometer
    All,
    /// Disable all calibration
    Stop,
}

impl CalibrationTarget {
    /// P0..P8 of an ME calibrate configure command
    fn params(self) -> [u8; COMMAND_PARAMS] {
        let mut p = [0u8; COMMAND_PARAMS];
        match self {
            CalibrationTarget::Accelerometer => p[0] = 1,
            CalibrationTarget::Gyroscope => p[1] = 1,
            CalibrationTarget::Magnetometer => p[2] = 1,
            CalibrationTarget::PlanarAccelerometer => p[4] = 1,
            CalibrationTarget::All => {
                p[0] = 1;
                p[1] = 1;
                p[2] = 1;
            }
            CalibrationTarget::Stop => {}
        }
        p
    }
}

/// Axes a tare applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TareAxes {
    All,
    Z,
}

impl TareAxes {
    fn bitmap(self) -> u8 {
        match self {
            TareAxes::All => TARE_AXIS_ALL,
            TareAxes::Z => TARE_AXIS_Z,
        }
    }
}

/// Rotation vector used as the basis of a tare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromRepr, Display)]
#[repr(u8)]
pub enum TareBasis {
    #[default]
    RotationVector = 0,
    GameRotationVector = 1,
    GeomagneticRotationVector = 2,
    GyroIntegratedRotationVector = 3,
    ArVrStabilizedRotationVector = 4,
    ArVrStabilizedGameRotationVector = 5,
}

/// Set feature command enabling `report_id` every `interval_us`
/// microseconds. `specific_config` is sensor dependent, e.g. the
/// activity classifier enable mask.
pub fn build_set_feature(
    report_id: u8,
    interval_us: u32,
    specific_config: u32,
) -> [u8; SET_FEATURE_LEN] {
    let interval = interval_us.to_le_bytes();
    let config = specific_config.to_le_bytes();
    [
        SHUB_REPORT_SET_FEATURE_CMD,
        report_id,
        0, // feature flags
        0, // LSB change sensitivity
        0, // MSB change sensitivity
        interval[0],
        interval[1],
        interval[2],
        interval[3],
        0, // LSB batch interval
        0,
        0,
        0, // MSB batch interval
        config[0],
        config[1],
        config[2],
        config[3],
    ]
}

pub fn build_product_id_request() -> [u8; 2] {
    [SHUB_PROD_ID_REQ, 0]
}

/// Executable channel reset
pub fn build_soft_reset() -> [u8; 1] {
    [EXECUTABLE_DEVICE_CMD_RESET]
}

/// Builds command requests, numbering them with its own wrapping counter
#[derive(Debug, Default)]
pub struct CommandEncoder {
    sequence: u8,
}

impl CommandEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next command will carry
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Command request with explicit parameters
    pub fn command(&mut self, command: u8, params: [u8; COMMAND_PARAMS]) -> [u8; COMMAND_REQ_LEN] {
        let mut body = [0u8; COMMAND_REQ_LEN];
        body[0] = SHUB_COMMAND_REQ;
        body[1] = self.sequence;
        body[2] = command;
        body[3..].copy_from_slice(&params);
        self.sequence = self.sequence.wrapping_add(1);
        body
    }

    pub fn calibrate(&mut self, target: CalibrationTarget) -> [u8; COMMAND_REQ_LEN] {
        self.command(COMMAND_ME_CALIBRATE, target.params())
    }

    pub fn request_calibration_status(&mut self) -> [u8; COMMAND_REQ_LEN] {
        let mut params = [0u8; COMMAND_PARAMS];
        params[3] = ME_CALIBRATE_GET;
        self.command(COMMAND_ME_CALIBRATE, params)
    }

    /// Save the dynamic calibration data to flash
    pub fn save_calibration(&mut self) -> [u8; COMMAND_REQ_LEN] {
        self.command(COMMAND_DCD, [0; COMMAND_PARAMS])
    }

    pub fn tare_now(&mut self, axes: TareAxes, basis: TareBasis) -> [u8; COMMAND_REQ_LEN] {
        let mut params = [0u8; COMMAND_PARAMS];
        params[0] = TARE_NOW;
        params[1] = axes.bitmap();
        params[2] = basis as u8;
        self.command(COMMAND_TARE, params)
    }

    /// Keep the current tare across resets
    pub fn persist_tare(&mut self) -> [u8; COMMAND_REQ_LEN] {
        let mut params = [0u8; COMMAND_PARAMS];
        params[0] = TARE_PERSIST;
        self.command(COMMAND_TARE, params)
    }
}
