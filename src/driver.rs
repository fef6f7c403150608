// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! BNO085 driver implementation.
//!
//! [`BNO085`] owns the transport, the packet framer, the command encoder and
//! the latest sensor readings. Every bus operation is a blocking poll loop
//! bounded by the limits in [`DriverConfig`].

use crate::{
    commands::{
        build_product_id_request, build_set_feature, build_soft_reset, CalibrationTarget,
        CommandEncoder, TareAxes, TareBasis,
    },
    config::DriverConfig,
    constants::{
        q32_to_f32, COMMAND_DCD, COMMAND_ME_CALIBRATE, COMMAND_TARE, SENSOR_REPORTID_ACCELEROMETER,
        SENSOR_REPORTID_AR_VR_STABILIZED_GAME_ROTATION_VECTOR,
        SENSOR_REPORTID_AR_VR_STABILIZED_ROTATION_VECTOR, SENSOR_REPORTID_GAME_ROTATION_VECTOR,
        SENSOR_REPORTID_GYROSCOPE, SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR,
        SENSOR_REPORTID_LINEAR_ACCELERATION, SENSOR_REPORTID_MAGNETIC_FIELD,
        SENSOR_REPORTID_PERSONAL_ACTIVITY_CLASSIFIER, SENSOR_REPORTID_RAW_ACCELEROMETER,
        SENSOR_REPORTID_RAW_GYROSCOPE, SENSOR_REPORTID_RAW_MAGNETOMETER,
        SENSOR_REPORTID_ROTATION_VECTOR, SENSOR_REPORTID_STABILITY_CLASSIFIER,
        SENSOR_REPORTID_STEP_COUNTER, SH2_INIT_SYSTEM, SH2_STARTUP_INIT_UNSOLICITED,
    },
    frs::{build_frs_read_request, FrsMetadata, FrsReadOutcome, FrsReader},
    interface::{
        delay::{DelayMs, TimerMs},
        gpio::{find_line, GpiodIn, GpiodOut},
        spi::SpiControlLines,
        spidev::SpiDevice,
        I2cInterface, NoInterrupt, SensorInterface, SpiInterface,
    },
    reports::{decode, ProductId, Report, MAX_ERROR_CODES},
    sensor_data::SensorData,
    shtp::{Channel, Packet, Shtp},
};
use embedded_hal::{digital::InputPin, i2c::I2c};
use log::{debug, trace, warn};
use std::{fmt::Debug, io};

/// Calibration status while a command is outstanding
const CALIBRATION_PENDING: u8 = 1;

/// Driver-level errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError<E> {
    /// Communications error
    #[error("communication error: {0:?}")]
    CommError(E),
    /// The hub did not answer the product id request
    #[error("invalid chip id: {0}")]
    InvalidChipId(u8),
    /// The payload does not fit in the send buffer
    #[error("payload of {0} bytes does not fit in the send buffer")]
    PayloadTooLarge(usize),
    /// We expected some data but didn't receive any
    #[error("no data available")]
    NoDataAvailable,
}

/// Linux SPI transport built from spidev and gpiod lines
pub type SpiLinuxInterface = SpiInterface<SpiDevice, GpiodIn, GpiodOut>;

/// BNO085 driver
pub struct BNO085<SI, D = TimerMs> {
    pub(crate) sensor_interface: SI,
    delay_source: D,
    config: DriverConfig,
    shtp: Shtp,
    commands: CommandEncoder,
    sensor_data: SensorData,
    /// Words from the last FRS read
    metadata: FrsMetadata,
    product_id: Option<ProductId>,
    /// Has the device been successfully reset
    device_reset: bool,
    /// Have we received the full advertisement
    advert_received: bool,
    init_received: bool,
    /// 0 when the last calibration, DCD or tare command succeeded
    calibration_status: u8,
    /// Which reports the hub confirmed as enabled
    report_enabled: [bool; 256],
    last_error_list: heapless::Vec<u8, MAX_ERROR_CODES>,
}

impl<SI> BNO085<SI, TimerMs> {
    /// Create a new driver with the default configuration, sleeping the
    /// calling thread for delays
    pub fn new_with_interface(sensor_interface: SI) -> Self {
        Self::new(sensor_interface, TimerMs, DriverConfig::default())
    }
}

impl<SI, D> BNO085<SI, D> {
    pub fn new(sensor_interface: SI, delay_source: D, config: DriverConfig) -> Self {
        Self {
            sensor_interface,
            delay_source,
            config,
            shtp: Shtp::new(),
            commands: CommandEncoder::new(),
            sensor_data: SensorData::new(),
            metadata: FrsMetadata::new(),
            product_id: None,
            device_reset: false,
            advert_received: false,
            init_received: false,
            calibration_status: 0,
            report_enabled: [false; 256],
            last_error_list: heapless::Vec::new(),
        }
    }

    /// Returns previously consumed sensor interface instance.
    pub fn free(self) -> SI {
        self.sensor_interface
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Latest readings
    pub fn sensor_data(&self) -> &SensorData {
        &self.sensor_data
    }

    /// Product identity captured from the last product id response
    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    /// Whether the hub has announced a reset since the driver was created
    pub fn device_reset(&self) -> bool {
        self.device_reset
    }

    /// Check if a report is enabled
    pub fn is_report_enabled(&self, report_id: u8) -> bool {
        self.report_enabled[usize::from(report_id)]
    }

    /// 0 once the last calibrate, save or tare command succeeded
    pub fn calibration_status(&self) -> u8 {
        self.calibration_status
    }

    pub fn calibration_complete(&self) -> bool {
        self.calibration_status == 0
    }

    /// Words returned by the last FRS read
    pub fn metadata(&self) -> &[u32] {
        &self.metadata
    }

    /// Codes from the last error list the hub sent
    pub fn last_error_list(&self) -> &[u8] {
        &self.last_error_list
    }
}

impl BNO085<SpiLinuxInterface, TimerMs> {
    /// Create a new BNO085 driver using SPI with explicit GPIO chip and pin
    /// numbers
    ///
    /// # Arguments
    /// * `spidevice` - Path to the SPI device (e.g., "/dev/spidev1.0")
    /// * `hintn_gpiochip` - GPIO chip for the interrupt pin
    /// * `hintn_pin` - GPIO pin number for the interrupt
    /// * `reset_gpiochip` - GPIO chip for the reset pin
    /// * `reset_pin` - GPIO pin number for reset
    pub fn new_spi(
        spidevice: &str,
        hintn_gpiochip: &str,
        hintn_pin: u32,
        reset_gpiochip: &str,
        reset_pin: u32,
        config: DriverConfig,
    ) -> io::Result<Self> {
        let hintn: GpiodIn;
        let reset: GpiodOut;
        if hintn_gpiochip == reset_gpiochip {
            let chip = gpiod::Chip::new(hintn_gpiochip)?;
            hintn = GpiodIn::new(&chip, hintn_pin)?;
            reset = GpiodOut::new(&chip, reset_pin)?;
        } else {
            let chip0 = gpiod::Chip::new(hintn_gpiochip)?;
            hintn = GpiodIn::new(&chip0, hintn_pin)?;
            let chip1 = gpiod::Chip::new(reset_gpiochip)?;
            reset = GpiodOut::new(&chip1, reset_pin)?;
        }

        let spi = SpiDevice::new(spidevice, config.spi_speed_hz)?;
        let spi_int = SpiInterface::new(SpiControlLines { spi, hintn, reset });

        Ok(Self::new(spi_int, TimerMs, config))
    }

    /// Create a new BNO085 driver using SPI with GPIO pin names (symbol lookup)
    ///
    /// This method searches for GPIO pins by their symbolic names across all
    /// GPIO chips on the system.
    ///
    /// # Arguments
    /// * `spidevice` - Path to the SPI device (e.g., "/dev/spidev1.0")
    /// * `hintn_pin` - Symbolic name of the interrupt pin (e.g., "IMU_INT")
    /// * `reset_pin` - Symbolic name of the reset pin (e.g., "IMU_RST")
    pub fn new_spi_from_symbol(
        spidevice: &str,
        hintn_pin: &str,
        reset_pin: &str,
        config: DriverConfig,
    ) -> io::Result<Self> {
        let (hintn_chip, hintn_num) = find_line(hintn_pin)?;
        let (reset_chip, reset_num) = find_line(reset_pin)?;
        Self::new_spi(
            spidevice,
            &hintn_chip,
            hintn_num,
            &reset_chip,
            reset_num,
            config,
        )
    }
}

impl<I2C: I2c> BNO085<I2cInterface<I2C, NoInterrupt>, TimerMs> {
    /// Create a new BNO085 driver on an I2C bus without an interrupt line
    pub fn new_i2c(i2c: I2C, config: DriverConfig) -> Self {
        let iface =
            I2cInterface::new(i2c, config.i2c_address).with_read_limit(config.i2c_read_limit);
        Self::new(iface, TimerMs, config)
    }
}

impl<I2C: I2c, INT: InputPin> BNO085<I2cInterface<I2C, INT>, TimerMs> {
    /// Create a new BNO085 driver on an I2C bus, polling `int` (active low)
    /// before each read
    pub fn new_i2c_with_interrupt(i2c: I2C, int: INT, config: DriverConfig) -> Self {
        let iface = I2cInterface::with_interrupt(i2c, int, config.i2c_address)
            .with_read_limit(config.i2c_read_limit);
        Self::new(iface, TimerMs, config)
    }
}

impl<SI, SE, D> BNO085<SI, D>
where
    SI: SensorInterface<SensorError = SE>,
    SE: Debug,
    D: DelayMs,
{
    /// Initialize the BNO085 sensor.
    ///
    /// The BNO085 starts up with all sensors disabled, waiting for the
    /// application to configure it.
    pub fn init(&mut self) -> Result<(), DriverError<SE>> {
        trace!("driver init");
        self.device_reset = false;
        self.advert_received = false;
        self.init_received = false;

        // On startup the hub sends its full advertisement, unsolicited
        self.delay_source.delay_ms(1);
        self.sensor_interface
            .setup(&mut self.delay_source)
            .map_err(DriverError::CommError)?;

        if self.sensor_interface.requires_soft_reset() {
            self.delay_source.delay_ms(1);
            self.soft_reset()?;
        } else {
            // we only expect two messages after reset: the advertisement and
            // the unsolicited initialize response
            self.delay_source.delay_ms(self.config.reset_settle_ms);
            let handled = self.handle_all_messages(self.config.packet_wait_ms);
            trace!(
                "startup drained {} (advert {}, init {})",
                handled,
                self.advert_received,
                self.init_received
            );
        }
        self.verify_product_id()?;
        Ok(())
    }

    /// Tell the sensor to reset, then drain whatever it sends on startup.
    ///
    /// Normally applications should not need to call this directly,
    /// as it is called during `init`.
    pub fn soft_reset(&mut self) -> Result<(), DriverError<SE>> {
        trace!("soft_reset");
        self.send_packet(Channel::Executable, &build_soft_reset())?;

        // the hub has been seen to reset twice if pushed too quickly
        for _ in 0..2 {
            self.delay_source.delay_ms(self.config.reset_settle_ms);
            self.handle_all_messages(self.config.packet_wait_ms);
        }
        Ok(())
    }

    /// Ask the hub why it last reset
    pub fn reset_reason(&mut self) -> Result<u8, DriverError<SE>> {
        self.request_product_id()?;
        self.product_id
            .map(|pid| pid.reset_cause)
            .ok_or(DriverError::NoDataAvailable)
    }

    /// Verify that the sensor answers the product id request
    fn verify_product_id(&mut self) -> Result<(), DriverError<SE>> {
        trace!("request PID...");
        self.request_product_id()?;
        match self.product_id {
            Some(pid) => {
                debug!(
                    "BNO085 sw {}.{}.{} part {} build {}",
                    pid.sw_version_major,
                    pid.sw_version_minor,
                    pid.sw_version_patch,
                    pid.sw_part_number,
                    pid.sw_build_number
                );
                Ok(())
            }
            None => Err(DriverError::InvalidChipId(0)),
        }
    }

    /// Send a product id request and process incoming messages until the
    /// response arrives or no more data comes
    fn request_product_id(&mut self) -> Result<(), DriverError<SE>> {
        self.product_id = None;
        self.send_packet(Channel::Control, &build_product_id_request())?;
        while self.product_id.is_none() {
            trace!("read PID");
            if self.handle_one_message(self.config.packet_wait_ms) < 1 {
                break;
            }
        }
        Ok(())
    }

    /// Poll for one packet without waiting.
    ///
    /// Returns the id of the report that was decoded, or 0 if nothing
    /// was pending or the packet carried no reading or hub response.
    pub fn get_readings(&mut self) -> u8 {
        let packet = match self.receive_packet_with_timeout(0) {
            Ok(Some(packet)) => packet,
            Ok(None) => return 0,
            Err(e) => {
                warn!("get_readings {:?}", e);
                return 0;
            }
        };
        match self.handle_packet(&packet) {
            Some(Report::ResetComplete | Report::Advertisement | Report::ErrorList(_)) | None => 0,
            Some(report) => report.report_id(),
        }
    }

    /// Whether a poll decoded a new reading or hub response
    pub fn data_available(&mut self) -> bool {
        self.get_readings() != 0
    }

    /// Handle up to `max_count` messages, waiting up to `timeout_ms` for each
    pub fn handle_messages(&mut self, timeout_ms: u32, max_count: u32) -> u32 {
        let mut total_handled: u32 = 0;
        while total_handled < max_count {
            let handled_count = self.handle_one_message(timeout_ms);
            if handled_count == 0 {
                break;
            }
            total_handled += handled_count;
        }
        total_handled
    }

    /// Handle messages until none arrives within `timeout_ms`
    pub fn handle_all_messages(&mut self, timeout_ms: u32) -> u32 {
        let mut total_handled: u32 = 0;
        loop {
            let handled_count = self.handle_one_message(timeout_ms);
            if handled_count == 0 {
                break;
            }
            total_handled += handled_count;
        }
        total_handled
    }

    /// Handle one message and return the count of messages handled (0 or 1)
    pub fn handle_one_message(&mut self, max_ms: u32) -> u32 {
        match self.receive_packet_with_timeout(max_ms) {
            Ok(Some(packet)) => {
                self.handle_packet(&packet);
                1
            }
            Ok(None) => 0,
            Err(e) => {
                trace!("handle1 err {:?}", e);
                0
            }
        }
    }

    /// Decode a packet and fold it into the driver state
    fn handle_packet(&mut self, packet: &Packet) -> Option<Report> {
        let report = decode(packet)?;
        match &report {
            Report::Input(input) => self.sensor_data.apply(input),
            Report::CommandResponse(resp) => {
                if matches!(
                    resp.command,
                    COMMAND_ME_CALIBRATE | COMMAND_DCD | COMMAND_TARE
                ) {
                    self.calibration_status = resp.status();
                }
                if resp.command == SH2_STARTUP_INIT_UNSOLICITED || resp.command == SH2_INIT_SYSTEM
                {
                    self.init_received = true;
                }
            }
            Report::ProductId(pid) => self.product_id = Some(*pid),
            Report::FeatureEnabled(report_id) => {
                self.report_enabled[usize::from(*report_id)] = true;
            }
            Report::FrsRead(_) => {}
            Report::ResetComplete => self.device_reset = true,
            Report::Advertisement => self.advert_received = true,
            Report::ErrorList(codes) => self.last_error_list = codes.clone(),
        }
        Some(report)
    }

    /// Enable a sensor report with the specified update interval.
    ///
    /// Returns true once the hub confirms the report is enabled.
    pub fn enable_report(
        &mut self,
        report_id: u8,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report_with_config(report_id, interval_us, 0)
    }

    /// Enable a report, passing a sensor specific configuration word
    pub fn enable_report_with_config(
        &mut self,
        report_id: u8,
        interval_us: u32,
        specific_config: u32,
    ) -> Result<bool, DriverError<SE>> {
        trace!("enable_report 0x{:X}", report_id);

        let cmd_body = build_set_feature(report_id, interval_us, specific_config);
        self.report_enabled[usize::from(report_id)] = false;
        self.send_packet(Channel::Control, &cmd_body)?;

        for _ in 0..self.config.response_timeout_ms {
            if self.report_enabled[usize::from(report_id)] {
                break;
            }
            self.handle_one_message(1);
        }
        let enabled = self.report_enabled[usize::from(report_id)];
        trace!("Report {:x} is enabled: {}", report_id, enabled);
        Ok(enabled)
    }

    /// Enable reporting of rotation vector (fused quaternion).
    ///
    /// Note that the maximum valid update rate is 1 kHz, based on the max
    /// update rate of the sensor's gyros.
    pub fn enable_rotation_vector(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_ROTATION_VECTOR, interval_us)
    }

    /// Rotation vector without the magnetometer
    pub fn enable_game_rotation_vector(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_GAME_ROTATION_VECTOR, interval_us)
    }

    pub fn enable_ar_vr_stabilized_rotation_vector(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(
            SENSOR_REPORTID_AR_VR_STABILIZED_ROTATION_VECTOR,
            interval_us,
        )
    }

    pub fn enable_ar_vr_stabilized_game_rotation_vector(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(
            SENSOR_REPORTID_AR_VR_STABILIZED_GAME_ROTATION_VECTOR,
            interval_us,
        )
    }

    /// Quaternion and fast gyro on the gyro channel
    pub fn enable_gyro_integrated_rotation_vector(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(
            SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR,
            interval_us,
        )
    }

    pub fn enable_accelerometer(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_ACCELEROMETER, interval_us)
    }

    /// Enable reporting of linear acceleration vector.
    pub fn enable_linear_accel(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_LINEAR_ACCELERATION, interval_us)
    }

    /// Enable reporting of calibrated gyroscope data.
    pub fn enable_gyro(&mut self, interval_us: u32) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_GYROSCOPE, interval_us)
    }

    pub fn enable_magnetometer(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_MAGNETIC_FIELD, interval_us)
    }

    pub fn enable_step_counter(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_STEP_COUNTER, interval_us)
    }

    pub fn enable_stability_classifier(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_STABILITY_CLASSIFIER, interval_us)
    }

    /// `activities_to_enable` is a bitmask of the activity states to track
    pub fn enable_activity_classifier(
        &mut self,
        interval_us: u32,
        activities_to_enable: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report_with_config(
            SENSOR_REPORTID_PERSONAL_ACTIVITY_CLASSIFIER,
            interval_us,
            activities_to_enable,
        )
    }

    pub fn enable_raw_accelerometer(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_RAW_ACCELEROMETER, interval_us)
    }

    pub fn enable_raw_gyro(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_RAW_GYROSCOPE, interval_us)
    }

    pub fn enable_raw_magnetometer(
        &mut self,
        interval_us: u32,
    ) -> Result<bool, DriverError<SE>> {
        self.enable_report(SENSOR_REPORTID_RAW_MAGNETOMETER, interval_us)
    }

    /// Start (or with [`CalibrationTarget::Stop`] end) motion engine
    /// calibration. The result arrives later as a command response; poll
    /// [`Self::calibration_complete`].
    pub fn calibrate(&mut self, target: CalibrationTarget) -> Result<(), DriverError<SE>> {
        trace!("calibrate {}", target);
        let body = self.commands.calibrate(target);
        self.send_command(&body)
    }

    pub fn calibrate_accelerometer(&mut self) -> Result<(), DriverError<SE>> {
        self.calibrate(CalibrationTarget::Accelerometer)
    }

    pub fn calibrate_gyro(&mut self) -> Result<(), DriverError<SE>> {
        self.calibrate(CalibrationTarget::Gyroscope)
    }

    pub fn calibrate_magnetometer(&mut self) -> Result<(), DriverError<SE>> {
        self.calibrate(CalibrationTarget::Magnetometer)
    }

    pub fn calibrate_planar_accelerometer(&mut self) -> Result<(), DriverError<SE>> {
        self.calibrate(CalibrationTarget::PlanarAccelerometer)
    }

    pub fn calibrate_all(&mut self) -> Result<(), DriverError<SE>> {
        self.calibrate(CalibrationTarget::All)
    }

    pub fn end_calibration(&mut self) -> Result<(), DriverError<SE>> {
        self.calibrate(CalibrationTarget::Stop)
    }

    pub fn request_calibration_status(&mut self) -> Result<(), DriverError<SE>> {
        let body = self.commands.request_calibration_status();
        self.send_command(&body)
    }

    /// Save the current dynamic calibration data to flash
    pub fn save_calibration(&mut self) -> Result<(), DriverError<SE>> {
        let body = self.commands.save_calibration();
        self.send_command(&body)
    }

    /// Tare the given axes against the current orientation of `basis`
    pub fn tare_now(&mut self, axes: TareAxes, basis: TareBasis) -> Result<(), DriverError<SE>> {
        let body = self.commands.tare_now(axes, basis);
        self.send_command(&body)
    }

    pub fn tare_all_axes(&mut self, basis: TareBasis) -> Result<(), DriverError<SE>> {
        self.tare_now(TareAxes::All, basis)
    }

    pub fn tare_z_axis(&mut self, basis: TareBasis) -> Result<(), DriverError<SE>> {
        self.tare_now(TareAxes::Z, basis)
    }

    /// Keep the current tare across resets
    pub fn persist_tare(&mut self) -> Result<(), DriverError<SE>> {
        let body = self.commands.persist_tare();
        self.send_command(&body)
    }

    /// Mark the calibration status pending, then send a command request
    fn send_command(&mut self, body: &[u8]) -> Result<(), DriverError<SE>> {
        self.calibration_status = CALIBRATION_PENDING;
        self.send_packet(Channel::Control, body)
    }

    /// Read `words_to_read` words from FRS record `record_id`, starting at
    /// word `start_location`. The words are available from
    /// [`Self::metadata`] afterwards.
    ///
    /// Every packet received meanwhile is handled as usual.
    pub fn read_frs_data(
        &mut self,
        record_id: u16,
        start_location: u16,
        words_to_read: u16,
    ) -> Result<FrsReadOutcome, DriverError<SE>> {
        self.metadata.clear();
        let request = build_frs_read_request(record_id, start_location, words_to_read);
        self.send_packet(Channel::Control, &request)?;

        let mut reader = FrsReader::new(record_id);
        let outcome = loop {
            let Some(packet) = self.receive_packet_with_timeout(self.config.frs_retry_limit)?
            else {
                debug!("frs read of 0x{:04X} timed out", record_id);
                break FrsReadOutcome::TimedOut;
            };
            if let Some(Report::FrsRead(response)) = self.handle_packet(&packet) {
                if let Some(outcome) = reader.accept(&response) {
                    break outcome;
                }
            }
        };
        self.metadata = reader.into_metadata();
        Ok(outcome)
    }

    /// Read a single word of an FRS record, 0 on any failure
    pub fn read_frs_word(&mut self, record_id: u16, word_number: u16) -> u32 {
        match self.read_frs_data(record_id, word_number, 1) {
            Ok(FrsReadOutcome::Complete | FrsReadOutcome::Truncated) => {
                self.metadata.first().copied().unwrap_or(0)
            }
            Ok(FrsReadOutcome::TimedOut) => 0,
            Err(e) => {
                warn!("frs read of 0x{:04X} failed: {:?}", record_id, e);
                0
            }
        }
    }

    /// Q point used for the sensor's data, low half of metadata word 7
    pub fn get_q1(&mut self, record_id: u16) -> u16 {
        (self.read_frs_word(record_id, 7) & 0xFFFF) as u16
    }

    /// Q point used for the sensor's bias, high half of metadata word 7
    pub fn get_q2(&mut self, record_id: u16) -> u16 {
        (self.read_frs_word(record_id, 7) >> 16) as u16
    }

    /// Q point used for change sensitivity, high half of metadata word 8
    pub fn get_q3(&mut self, record_id: u16) -> u16 {
        (self.read_frs_word(record_id, 8) >> 16) as u16
    }

    /// Sensor resolution, metadata word 2 scaled by Q1
    pub fn get_resolution(&mut self, record_id: u16) -> f32 {
        let q = q_point(self.get_q1(record_id));
        q32_to_f32(self.read_frs_word(record_id, 2) as i32, q)
    }

    /// Sensor range, metadata word 1 scaled by Q1
    pub fn get_range(&mut self, record_id: u16) -> f32 {
        let q = q_point(self.get_q1(record_id));
        q32_to_f32(self.read_frs_word(record_id, 1) as i32, q)
    }

    /// Send packet on a channel
    fn send_packet(&mut self, channel: Channel, body_data: &[u8]) -> Result<(), DriverError<SE>> {
        self.shtp
            .send(&mut self.sensor_interface, channel, body_data)
    }

    /// Read one packet, waiting up to `max_ms` for the hub to signal it
    fn receive_packet_with_timeout(
        &mut self,
        max_ms: u32,
    ) -> Result<Option<Packet>, DriverError<SE>> {
        self.shtp
            .receive_with_timeout(&mut self.sensor_interface, &mut self.delay_source, max_ms)
    }
}

fn q_point(q: u16) -> u8 {
    u8::try_from(q).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        FRS_RECORDID_ACCELEROMETER, SHUB_BASE_TIMESTAMP, SHUB_COMMAND_RESP, SHUB_FRS_READ_REQ,
        SHUB_FRS_READ_RESP, SHUB_GET_FEATURE_RESP, SHUB_PROD_ID_REQ, SHUB_PROD_ID_RESP,
        SHUB_REPORT_SET_FEATURE_CMD,
    };
    use crate::interface::mock::{FakeDelay, MockError, MockInterface};

    type TestDriver = BNO085<MockInterface, FakeDelay>;

    fn driver(iface: MockInterface) -> TestDriver {
        BNO085::new(iface, FakeDelay::default(), DriverConfig::default())
    }

    fn product_id_response() -> Vec<u8> {
        vec![
            SHUB_PROD_ID_RESP,
            0x04,
            3,
            7,
            0x4C,
            0x7B,
            0x96,
            0x00,
            0x2A,
            0x01,
            0,
            0,
            0x02,
            0,
            0,
            0,
        ]
    }

    fn command_response(command: u8, r0: u8) -> Vec<u8> {
        let mut payload = vec![SHUB_COMMAND_RESP, 0, command, 0, 0, r0];
        payload.extend_from_slice(&[0; 10]);
        payload
    }

    fn frs_response(status: u8, words: &[u32], record_id: u16) -> Vec<u8> {
        let mut payload = vec![0u8; 16];
        payload[0] = SHUB_FRS_READ_RESP;
        payload[1] = ((words.len() as u8) << 4) | status;
        for (n, word) in words.iter().enumerate() {
            payload[4 + 4 * n..8 + 4 * n].copy_from_slice(&word.to_le_bytes());
        }
        payload[12..14].copy_from_slice(&record_id.to_le_bytes());
        payload
    }

    fn accel_report(x: i16) -> Vec<u8> {
        let mut payload = vec![SHUB_BASE_TIMESTAMP, 10, 0, 0, 0];
        payload.extend_from_slice(&[SENSOR_REPORTID_ACCELEROMETER, 0, 0x03, 0]);
        for v in [x, 0, 0] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        payload
    }

    /// Answers product id requests like a live hub
    fn answer_product_id(iface: &mut MockInterface) {
        iface.respond_with(|packet| {
            if packet[2] == Channel::Control as u8 && packet[4] == SHUB_PROD_ID_REQ {
                vec![(Channel::Control as u8, product_id_response())]
            } else {
                Vec::new()
            }
        });
    }

    #[test]
    fn test_init_after_hardware_reset() {
        let mut iface = MockInterface::default();
        iface.push(0, &[0, 0, 1, 0x80, 6, 1, 2, 3]);
        iface.push(1, &[1]);
        iface.push(2, &command_response(SH2_STARTUP_INIT_UNSOLICITED, 0));
        answer_product_id(&mut iface);

        let mut imu = driver(iface);
        imu.init().unwrap();
        assert!(imu.device_reset());
        assert!(imu.advert_received);
        assert!(imu.init_received);
        let pid = imu.product_id().unwrap();
        assert_eq!(pid.reset_cause, 4);
        assert_eq!(pid.sw_version_major, 3);
        assert_eq!(pid.sw_version_patch, 2);

        let iface = imu.free();
        assert_eq!(iface.written, vec![vec![6, 0, 2, 0, SHUB_PROD_ID_REQ, 0]]);
    }

    #[test]
    fn test_init_with_soft_reset() {
        let mut iface = MockInterface {
            soft_reset: true,
            ..Default::default()
        };
        iface.respond_with(|packet| match (packet[2], packet[4]) {
            (1, 1) => vec![(0, vec![0, 0, 1, 0x80]), (1, vec![1])],
            (2, SHUB_PROD_ID_REQ) => vec![(2, product_id_response())],
            _ => Vec::new(),
        });

        let mut imu = driver(iface);
        imu.init().unwrap();
        assert!(imu.device_reset());
        assert!(imu.product_id().is_some());
        let iface = imu.free();
        assert_eq!(iface.written[0], vec![5, 0, 1, 0, 1]);
    }

    #[test]
    fn test_init_without_product_id() {
        let mut imu = driver(MockInterface::default());
        assert!(matches!(imu.init(), Err(DriverError::InvalidChipId(0))));
    }

    #[test]
    fn test_init_write_failure() {
        let iface = MockInterface {
            fail_writes: true,
            ..Default::default()
        };
        let mut imu = driver(iface);
        assert!(matches!(
            imu.init(),
            Err(DriverError::CommError(MockError))
        ));
    }

    #[test]
    fn test_reset_reason() {
        let mut iface = MockInterface::default();
        answer_product_id(&mut iface);
        let mut imu = driver(iface);
        assert_eq!(imu.reset_reason().unwrap(), 4);

        let mut imu = driver(MockInterface::default());
        assert!(matches!(
            imu.reset_reason(),
            Err(DriverError::NoDataAvailable)
        ));
    }

    #[test]
    fn test_get_readings_accelerometer() {
        let mut iface = MockInterface::default();
        iface.push(3, &accel_report(512));
        let mut imu = driver(iface);

        assert_eq!(imu.get_readings(), SENSOR_REPORTID_ACCELEROMETER);
        assert_eq!(imu.sensor_data().accelerometer(), [2.0, 0.0, 0.0]);
        assert_eq!(imu.sensor_data().accelerometer_accuracy(), 3);
        assert_eq!(imu.sensor_data().timestamp(), 10);

        // nothing pending
        assert_eq!(imu.get_readings(), 0);
        assert!(!imu.data_available());
    }

    #[test]
    fn test_get_readings_gyro_channel() {
        let mut iface = MockInterface::default();
        let payload: Vec<u8> = [0i16, 0, 0, 1 << 14, 10, 20, 30]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        iface.push(5, &payload);
        let mut imu = driver(iface);
        assert_eq!(
            imu.get_readings(),
            SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR
        );
        assert_eq!(imu.sensor_data().quaternion(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_get_readings_ignores_malformed() {
        let mut iface = MockInterface::default();
        iface.push(3, &[SHUB_BASE_TIMESTAMP, 0, 0]);
        iface.push(9, &[1, 2, 3]);
        iface.push(1, &[1]);
        let mut imu = driver(iface);
        assert_eq!(imu.get_readings(), 0);
        assert_eq!(imu.get_readings(), 0);
        // reset complete is tracked but is not a reading
        assert_eq!(imu.get_readings(), 0);
        assert!(imu.device_reset());
        assert_eq!(imu.sensor_data(), &SensorData::new());
    }

    #[test]
    fn test_read_failure_leaves_store_untouched() {
        let mut iface = MockInterface::default();
        iface.push(3, &accel_report(512));
        iface.fail_reads_after = Some(0);
        let mut imu = driver(iface);

        assert_eq!(imu.get_readings(), 0);
        assert_eq!(imu.sensor_data(), &SensorData::new());
        assert_eq!(imu.handle_one_message(5), 0);
        assert_eq!(imu.sensor_data(), &SensorData::new());

        // the bus recovers and the queued report is still there
        imu.sensor_interface.fail_reads_after = None;
        assert_eq!(imu.get_readings(), SENSOR_REPORTID_ACCELEROMETER);
    }

    #[test]
    fn test_calibration_pending_until_response() {
        let mut imu = driver(MockInterface::default());
        assert!(imu.calibration_complete());

        imu.calibrate_all().unwrap();
        assert!(!imu.calibration_complete());
        assert_eq!(imu.calibration_status(), 1);

        imu.sensor_interface
            .push(2, &command_response(COMMAND_ME_CALIBRATE, 0));
        assert_eq!(imu.get_readings(), SHUB_COMMAND_RESP);
        assert!(imu.calibration_complete());

        let iface = imu.free();
        assert_eq!(
            iface.written[0],
            vec![16, 0, 2, 0, 0xF2, 0, 7, 1, 1, 1, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_save_and_tare_mark_pending() {
        let mut imu = driver(MockInterface::default());
        imu.save_calibration().unwrap();
        assert!(!imu.calibration_complete());

        imu.sensor_interface.push(2, &command_response(COMMAND_DCD, 0));
        imu.get_readings();
        assert!(imu.calibration_complete());

        imu.tare_z_axis(TareBasis::GameRotationVector).unwrap();
        assert!(!imu.calibration_complete());
        imu.sensor_interface.push(2, &command_response(COMMAND_TARE, 5));
        imu.get_readings();
        assert_eq!(imu.calibration_status(), 5);

        // command sequence numbers keep counting across command kinds
        let iface = imu.free();
        assert_eq!(iface.written[0][5], 0);
        assert_eq!(iface.written[1][5], 1);
        // and so do the Control channel sequence numbers
        assert_eq!(iface.written[1][3], 1);
    }

    #[test]
    fn test_request_calibration_status() {
        let mut imu = driver(MockInterface::default());
        imu.request_calibration_status().unwrap();
        assert_eq!(imu.calibration_status(), 1);
        let iface = imu.free();
        assert_eq!(iface.written[0][4..], [0xF2u8, 0, 7, 0, 0, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_other_command_response_keeps_status() {
        let mut imu = driver(MockInterface::default());
        imu.calibrate_gyro().unwrap();
        imu.sensor_interface.push(2, &command_response(0x84, 0));
        imu.get_readings();
        assert!(!imu.calibration_complete());
        assert!(imu.init_received);
    }

    #[test]
    fn test_enable_report_confirmed() {
        let mut iface = MockInterface::default();
        iface.respond_with(|packet| {
            if packet[4] == SHUB_REPORT_SET_FEATURE_CMD {
                vec![(2, vec![SHUB_GET_FEATURE_RESP, packet[5], 0, 0])]
            } else {
                Vec::new()
            }
        });
        let mut imu = driver(iface);
        assert!(imu.enable_rotation_vector(10_000).unwrap());
        assert!(imu.is_report_enabled(SENSOR_REPORTID_ROTATION_VECTOR));
        assert!(!imu.is_report_enabled(SENSOR_REPORTID_ACCELEROMETER));

        let iface = imu.free();
        assert_eq!(
            iface.written[0][4..],
            [0xFDu8, 0x05, 0, 0, 0, 0x10, 0x27, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_enable_report_unconfirmed() {
        let mut imu = driver(MockInterface::default());
        assert!(!imu.enable_accelerometer(50_000).unwrap());
        assert_eq!(imu.delay_source.elapsed_ms, 2000);
    }

    #[test]
    fn test_enable_report_sub_millisecond_interval() {
        let mut imu = driver(MockInterface::default());
        imu.enable_gyro_integrated_rotation_vector(2500).unwrap();
        let iface = imu.free();
        let body = &iface.written[0][4..];
        assert_eq!(body[1], SENSOR_REPORTID_GYRO_INTEGRATED_ROTATION_VECTOR);
        assert_eq!(body[5..9], [0xC4u8, 0x09, 0, 0]);
    }

    #[test]
    fn test_enable_activity_classifier_mask() {
        let mut imu = driver(MockInterface::default());
        imu.enable_activity_classifier(1_000_000, 0x1F).unwrap();
        let iface = imu.free();
        let body = &iface.written[0][4..];
        assert_eq!(body[1], SENSOR_REPORTID_PERSONAL_ACTIVITY_CLASSIFIER);
        assert_eq!(body[13..], [0x1Fu8, 0, 0, 0]);
    }

    #[test]
    fn test_read_frs_data() {
        let mut iface = MockInterface::default();
        iface.respond_with(|packet| {
            if packet[4] != SHUB_FRS_READ_REQ {
                return Vec::new();
            }
            vec![
                (2, frs_response(0, &[1, 2], FRS_RECORDID_ACCELEROMETER)),
                (3, accel_report(256)),
                (2, frs_response(0, &[99], 0xE306)),
                (2, frs_response(3, &[3], FRS_RECORDID_ACCELEROMETER)),
            ]
        });
        let mut imu = driver(iface);
        let outcome = imu
            .read_frs_data(FRS_RECORDID_ACCELEROMETER, 0, 3)
            .unwrap();
        assert_eq!(outcome, FrsReadOutcome::Complete);
        assert_eq!(imu.metadata(), &[1, 2, 3]);
        // reports arriving during the exchange still land in the store
        assert_eq!(imu.sensor_data().accelerometer(), [1.0, 0.0, 0.0]);

        let iface = imu.free();
        assert_eq!(iface.written[0][4..], [0xF4u8, 0, 0, 0, 0x02, 0xE3, 3, 0]);
    }

    #[test]
    fn test_read_frs_timeout() {
        let mut imu = driver(MockInterface::default());
        assert_eq!(
            imu.read_frs_data(FRS_RECORDID_ACCELEROMETER, 0, 1).unwrap(),
            FrsReadOutcome::TimedOut
        );
        assert_eq!(imu.delay_source.elapsed_ms, 100);
        assert_eq!(imu.read_frs_word(FRS_RECORDID_ACCELEROMETER, 7), 0);
    }

    #[test]
    fn test_frs_metadata_lookups() {
        let mut iface = MockInterface::default();
        iface.respond_with(|packet| {
            if packet[4] != SHUB_FRS_READ_REQ {
                return Vec::new();
            }
            let word = match packet[6] {
                1 => 0x0000_1380, // range
                2 => 0x0000_0001, // resolution
                7 => 0x000A_0009, // Q2 10, Q1 9
                8 => 0x000B_0000, // Q3 11
                _ => 0,
            };
            vec![(2, frs_response(3, &[word], FRS_RECORDID_ACCELEROMETER))]
        });
        let mut imu = driver(iface);
        let record = FRS_RECORDID_ACCELEROMETER;
        assert_eq!(imu.get_q1(record), 9);
        assert_eq!(imu.get_q2(record), 10);
        assert_eq!(imu.get_q3(record), 11);
        assert_eq!(imu.get_range(record), 9.75);
        assert_eq!(imu.get_resolution(record), 1.0 / 512.0);
    }

    #[test]
    fn test_error_list_recorded() {
        let mut iface = MockInterface::default();
        iface.push(0, &[1, 9]);
        let mut imu = driver(iface);
        assert_eq!(imu.handle_all_messages(1), 1);
        assert_eq!(imu.last_error_list(), &[9]);
    }

    #[test]
    fn test_handle_messages_limit() {
        let mut iface = MockInterface::default();
        for x in 0..5 {
            iface.push(3, &accel_report(x));
        }
        let mut imu = driver(iface);
        assert_eq!(imu.handle_messages(1, 3), 3);
        assert_eq!(imu.handle_all_messages(1), 2);
        assert_eq!(imu.sensor_data().accelerometer()[0], 4.0 / 256.0);
    }
}
