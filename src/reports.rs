// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Report decoding.
//!
//! Packets are routed by channel and first payload byte through a static
//! dispatch table, then decoded into a typed [`Report`]. Input reports are
//! routed a second time, by sensor report id, to pick the data layout.
//! Decoding never panics: anything short, malformed or unknown gives `None`.

use crate::{
    constants::{
        CMD_RESP_ADVERTISEMENT, CMD_RESP_ERROR_LIST, EXECUTABLE_DEVICE_RESP_RESET_COMPLETE,
        SENSOR_REPORTID_ACCELEROMETER, SENSOR_REPORTID_AR_VR_STABILIZED_GAME_ROTATION_VECTOR,
        SENSOR_REPORTID_AR_VR_STABILIZED_ROTATION_VECTOR, SENSOR_REPORTID_GAME_ROTATION_VECTOR,
        SENSOR_REPORTID_GYROSCOPE, SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR,
        SENSOR_REPORTID_LINEAR_ACCELERATION, SENSOR_REPORTID_MAGNETIC_FIELD,
        SENSOR_REPORTID_PERSONAL_ACTIVITY_CLASSIFIER, SENSOR_REPORTID_RAW_ACCELEROMETER,
        SENSOR_REPORTID_RAW_GYROSCOPE, SENSOR_REPORTID_RAW_MAGNETOMETER,
        SENSOR_REPORTID_ROTATION_VECTOR, SENSOR_REPORTID_STABILITY_CLASSIFIER,
        SENSOR_REPORTID_STEP_COUNTER, SHUB_BASE_TIMESTAMP, SHUB_COMMAND_RESP,
        SHUB_FRS_READ_RESP, SHUB_GET_FEATURE_RESP, SHUB_PROD_ID_RESP,
    },
    frs::FrsReadResponse,
    shtp::{Channel, Packet},
};
use log::{debug, trace, warn};

/// Error codes kept from one error list report
pub const MAX_ERROR_CODES: usize = 16;
/// Confidence values in a personal activity classifier report
pub const ACTIVITY_CONFIDENCES: usize = 9;

/// Second half of a dispatch key: an exact first payload byte, or anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Exact(u8),
    Any,
}

impl Route {
    fn matches(self, first: Option<u8>) -> bool {
        match self {
            Route::Exact(id) => first == Some(id),
            Route::Any => true,
        }
    }
}

type DecodeFn = fn(&[u8]) -> Option<Report>;

static DISPATCH: &[(Channel, Route, DecodeFn)] = &[
    (Channel::Control, Route::Exact(SHUB_PROD_ID_RESP), decode_product_id),
    (Channel::Control, Route::Exact(SHUB_COMMAND_RESP), decode_command_response),
    (Channel::Control, Route::Exact(SHUB_FRS_READ_RESP), decode_frs_read),
    (Channel::Control, Route::Exact(SHUB_GET_FEATURE_RESP), decode_feature_response),
    (Channel::Reports, Route::Exact(SHUB_BASE_TIMESTAMP), decode_input_report),
    (Channel::WakeReports, Route::Exact(SHUB_BASE_TIMESTAMP), decode_input_report),
    (Channel::Gyro, Route::Any, decode_gyro_integrated),
    (
        Channel::Executable,
        Route::Exact(EXECUTABLE_DEVICE_RESP_RESET_COMPLETE),
        decode_reset_complete,
    ),
    (Channel::Command, Route::Exact(CMD_RESP_ADVERTISEMENT), decode_advertisement),
    (Channel::Command, Route::Exact(CMD_RESP_ERROR_LIST), decode_error_list),
];

/// Data layout that follows the 4-byte input report header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
    Vector(VectorKind),
    Raw(RawKind),
    Rotation(RotationKind),
    StepCounter,
    Stability,
    Activity,
}

static INPUT_LAYOUTS: &[(u8, InputLayout)] = &[
    (SENSOR_REPORTID_ACCELEROMETER, InputLayout::Vector(VectorKind::Accelerometer)),
    (SENSOR_REPORTID_GYROSCOPE, InputLayout::Vector(VectorKind::Gyroscope)),
    (SENSOR_REPORTID_MAGNETIC_FIELD, InputLayout::Vector(VectorKind::MagneticField)),
    (
        SENSOR_REPORTID_LINEAR_ACCELERATION,
        InputLayout::Vector(VectorKind::LinearAcceleration),
    ),
    (SENSOR_REPORTID_ROTATION_VECTOR, InputLayout::Rotation(RotationKind::Rotation)),
    (SENSOR_REPORTID_GAME_ROTATION_VECTOR, InputLayout::Rotation(RotationKind::Game)),
    (
        SENSOR_REPORTID_AR_VR_STABILIZED_ROTATION_VECTOR,
        InputLayout::Rotation(RotationKind::ArVrStabilized),
    ),
    (
        SENSOR_REPORTID_AR_VR_STABILIZED_GAME_ROTATION_VECTOR,
        InputLayout::Rotation(RotationKind::ArVrStabilizedGame),
    ),
    (SENSOR_REPORTID_STEP_COUNTER, InputLayout::StepCounter),
    (SENSOR_REPORTID_STABILITY_CLASSIFIER, InputLayout::Stability),
    (SENSOR_REPORTID_PERSONAL_ACTIVITY_CLASSIFIER, InputLayout::Activity),
    (SENSOR_REPORTID_RAW_ACCELEROMETER, InputLayout::Raw(RawKind::Accelerometer)),
    (SENSOR_REPORTID_RAW_GYROSCOPE, InputLayout::Raw(RawKind::Gyroscope)),
    (SENSOR_REPORTID_RAW_MAGNETOMETER, InputLayout::Raw(RawKind::Magnetometer)),
];

/// Calibrated three-axis sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    Accelerometer,
    LinearAcceleration,
    Gyroscope,
    MagneticField,
}

/// Uncalibrated MEMS sensors, reported in ADC units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

/// Quaternion reports that share the rotation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationKind {
    Rotation,
    Game,
    ArVrStabilized,
    ArVrStabilizedGame,
}

/// Raw fixed point data from one input report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReading {
    Vector {
        kind: VectorKind,
        x: i16,
        y: i16,
        z: i16,
    },
    Raw {
        kind: RawKind,
        x: i16,
        y: i16,
        z: i16,
    },
    Rotation {
        kind: RotationKind,
        i: i16,
        j: i16,
        k: i16,
        real: i16,
        /// Heading accuracy estimate, only sent by some rotation reports
        accuracy: Option<i16>,
    },
    /// Quaternion and fast gyro from the gyro channel
    GyroIntegrated {
        i: i16,
        j: i16,
        k: i16,
        real: i16,
        x: i16,
        y: i16,
        z: i16,
    },
    StepCount(u16),
    Stability(u8),
    Activity {
        most_likely: u8,
        confidence: [u8; ACTIVITY_CONFIDENCES],
    },
}

/// One sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputReport {
    /// Base timestamp, microseconds; absent on the gyro channel
    pub timestamp: Option<u32>,
    pub report_id: u8,
    pub sequence: u8,
    pub status: u8,
    pub delay: u8,
    pub reading: SensorReading,
}

impl InputReport {
    /// Accuracy 0 (unreliable) to 3 (high), the low two status bits
    pub fn accuracy(&self) -> u8 {
        self.status & 0x03
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductId {
    pub reset_cause: u8,
    pub sw_version_major: u8,
    pub sw_version_minor: u8,
    pub sw_part_number: u32,
    pub sw_build_number: u32,
    pub sw_version_patch: u16,
}

/// Response to a command request (report 0xF1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResponse {
    pub sequence: u8,
    pub command: u8,
    pub command_sequence: u8,
    pub response_sequence: u8,
    /// R0..R8
    pub response: [u8; 9],
}

impl CommandResponse {
    /// R0, 0 on success for calibration, DCD and tare commands
    pub fn status(&self) -> u8 {
        self.response[0]
    }
}

/// A decoded packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    ProductId(ProductId),
    CommandResponse(CommandResponse),
    FrsRead(FrsReadResponse),
    /// Get feature response naming a report that is now enabled
    FeatureEnabled(u8),
    Input(InputReport),
    ResetComplete,
    Advertisement,
    ErrorList(heapless::Vec<u8, MAX_ERROR_CODES>),
}

impl Report {
    /// The id a caller polling for readings sees for this report
    pub fn report_id(&self) -> u8 {
        match self {
            Report::ProductId(_) => SHUB_PROD_ID_RESP,
            Report::CommandResponse(_) => SHUB_COMMAND_RESP,
            Report::FrsRead(_) => SHUB_FRS_READ_RESP,
            Report::FeatureEnabled(_) => SHUB_GET_FEATURE_RESP,
            Report::Input(input) => input.report_id,
            Report::ResetComplete => EXECUTABLE_DEVICE_RESP_RESET_COMPLETE,
            Report::Advertisement => CMD_RESP_ADVERTISEMENT,
            Report::ErrorList(_) => CMD_RESP_ERROR_LIST,
        }
    }
}

/// Decode a received packet
pub fn decode(packet: &Packet) -> Option<Report> {
    match packet.channel() {
        Some(channel) => decode_payload(channel, packet.payload()),
        None => {
            trace!("unh chan 0x{:X}", packet.header().channel);
            None
        }
    }
}

/// Decode the cargo of a packet received on `channel`
pub fn decode_payload(channel: Channel, payload: &[u8]) -> Option<Report> {
    let first = payload.first().copied();
    let entry = DISPATCH
        .iter()
        .find(|(ch, route, _)| *ch == channel && route.matches(first));
    match entry {
        Some((_, _, decode_fn)) => decode_fn(payload),
        None => {
            trace!("unh {} report {:X?}", channel, first);
            None
        }
    }
}

/// Little-endian cursor over a payload
pub struct ReportParser<'a> {
    msg: &'a [u8],
    cursor: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(msg: &'a [u8]) -> Self {
        Self { msg, cursor: 0 }
    }

    pub fn at(msg: &'a [u8], cursor: usize) -> Self {
        Self { msg, cursor }
    }

    pub fn remaining(&self) -> usize {
        self.msg.len().saturating_sub(self.cursor)
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.msg.get(self.cursor..self.cursor + N)?;
        self.cursor += N;
        bytes.try_into().ok()
    }

    pub fn skip(&mut self, n: usize) -> Option<()> {
        if self.remaining() < n {
            return None;
        }
        self.cursor += n;
        Some(())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|b| b[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Option<i16> {
        self.take().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    /// Read an i16 if enough bytes remain, leaving the cursor alone otherwise
    #[inline]
    pub fn try_read_i16(&mut self) -> Option<i16> {
        if self.remaining() >= 2 {
            self.read_i16()
        } else {
            None
        }
    }
}

fn decode_product_id(payload: &[u8]) -> Option<Report> {
    let mut p = ReportParser::at(payload, 1);
    let reset_cause = p.read_u8()?;
    let sw_version_major = p.read_u8()?;
    let sw_version_minor = p.read_u8()?;
    let sw_part_number = p.read_u32()?;
    let sw_build_number = p.read_u32()?;
    let sw_version_patch = p.read_u16()?;
    trace!(
        "PID_RESP {}.{}.{} part {} build {}",
        sw_version_major,
        sw_version_minor,
        sw_version_patch,
        sw_part_number,
        sw_build_number
    );
    Some(Report::ProductId(ProductId {
        reset_cause,
        sw_version_major,
        sw_version_minor,
        sw_part_number,
        sw_build_number,
        sw_version_patch,
    }))
}

fn decode_command_response(payload: &[u8]) -> Option<Report> {
    let mut p = ReportParser::at(payload, 1);
    let sequence = p.read_u8()?;
    let command = p.read_u8()?;
    let command_sequence = p.read_u8()?;
    let response_sequence = p.read_u8()?;
    let response: [u8; 9] = p.take()?;
    trace!("CMD_RESP: 0x{:X} R0 {}", command, response[0]);
    Some(Report::CommandResponse(CommandResponse {
        sequence,
        command,
        command_sequence,
        response_sequence,
        response,
    }))
}

fn decode_frs_read(payload: &[u8]) -> Option<Report> {
    FrsReadResponse::parse(payload).map(Report::FrsRead)
}

fn decode_feature_response(payload: &[u8]) -> Option<Report> {
    let report_id = *payload.get(1)?;
    trace!("feat resp: 0x{:X}", report_id);
    Some(Report::FeatureEnabled(report_id))
}

fn decode_reset_complete(_payload: &[u8]) -> Option<Report> {
    trace!("resp_reset");
    Some(Report::ResetComplete)
}

fn decode_advertisement(payload: &[u8]) -> Option<Report> {
    // tag, length, value... after the response type
    let mut p = ReportParser::at(payload, 1);
    let mut tags = 0usize;
    while let (Some(_tag), Some(len)) = (p.read_u8(), p.read_u8()) {
        if p.skip(usize::from(len)).is_none() {
            break;
        }
        tags += 1;
    }
    trace!("advertisement with {} tags", tags);
    Some(Report::Advertisement)
}

fn decode_error_list(payload: &[u8]) -> Option<Report> {
    let mut codes = heapless::Vec::new();
    for &code in payload.iter().skip(1) {
        match error_code_description(code) {
            Some(description) => warn!("{}: Error code {}", description, code),
            None if code != 0 => debug!("Unknown error code {}", code),
            None => {}
        }
        if codes.push(code).is_err() {
            debug!("error list longer than {}", MAX_ERROR_CODES);
            break;
        }
    }
    Some(Report::ErrorList(codes))
}

/// Description of an SHTP error list code; 0 means no error
pub fn error_code_description(code: u8) -> Option<&'static str> {
    let description = match code {
        1 => "Hub application attempted to exceed maximum read cargo length",
        2 => "Host write was too short (need at least a 4-byte header)",
        3 => "Host wrote a header with length greater than maximum write cargo length",
        4 => "Host wrote a header with length less than or equal to header length",
        5 => "Host wrote beginning of fragmented cargo, fragmentation not supported",
        6 => "Host wrote continuation of fragmented cargo, fragmentation not supported",
        7 => "Unrecognized command on control channel",
        8 => "Unrecognized parameter to get-advertisement command",
        9 => "Host wrote to unrecognized channel",
        10 => "Advertisement request received while Advertisement Response was pending",
        11 => "Host performed a write operation before the hub had finished sending its advertisement response",
        12 => "Error list too long to send, truncated",
        _ => return None,
    };
    Some(description)
}

/// Base timestamp followed by one input report
fn decode_input_report(payload: &[u8]) -> Option<Report> {
    let mut p = ReportParser::at(payload, 1);
    let timestamp = p.read_u32()?;

    let report_id = p.read_u8()?;
    let sequence = p.read_u8()?;
    let status = p.read_u8()?;
    let delay = p.read_u8()?;

    let layout = INPUT_LAYOUTS
        .iter()
        .find(|(id, _)| *id == report_id)
        .map(|(_, layout)| *layout);
    let Some(layout) = layout else {
        trace!("unh input report 0x{:X}", report_id);
        return None;
    };

    let reading = match layout {
        InputLayout::Vector(kind) => SensorReading::Vector {
            kind,
            x: p.read_i16()?,
            y: p.read_i16()?,
            z: p.read_i16()?,
        },
        InputLayout::Raw(kind) => SensorReading::Raw {
            kind,
            x: p.read_i16()?,
            y: p.read_i16()?,
            z: p.read_i16()?,
        },
        InputLayout::Rotation(kind) => SensorReading::Rotation {
            kind,
            i: p.read_i16()?,
            j: p.read_i16()?,
            k: p.read_i16()?,
            real: p.try_read_i16().unwrap_or(0),
            accuracy: p.try_read_i16(),
        },
        InputLayout::StepCounter => {
            // detect latency (u32) then the count
            p.skip(4)?;
            SensorReading::StepCount(p.read_u16()?)
        }
        InputLayout::Stability => SensorReading::Stability(p.read_u8()?),
        InputLayout::Activity => {
            // page number and end-of-page flag
            p.skip(1)?;
            SensorReading::Activity {
                most_likely: p.read_u8()?,
                confidence: p.take()?,
            }
        }
    };

    Some(Report::Input(InputReport {
        timestamp: Some(timestamp),
        report_id,
        sequence,
        status,
        delay,
        reading,
    }))
}

/// Gyro channel reports carry no id, sequence, status or timestamp
fn decode_gyro_integrated(payload: &[u8]) -> Option<Report> {
    let mut p = ReportParser::new(payload);
    let reading = SensorReading::GyroIntegrated {
        i: p.read_i16()?,
        j: p.read_i16()?,
        k: p.read_i16()?,
        real: p.read_i16()?,
        x: p.read_i16()?,
        y: p.read_i16()?,
        z: p.read_i16()?,
    };
    Some(Report::Input(InputReport {
        timestamp: None,
        report_id: SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR,
        sequence: 0,
        status: 0,
        delay: 0,
        reading,
    }))
}
