// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use super::delay::DelayMs;
use super::{Error, SensorInterface};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use log::{debug, trace};

/// Milliseconds to wait for HINTN after the reset pulse
const RESET_WAKE_MS: u32 = 200;

/// Encapsulates all the lines required to operate this sensor
/// - SPI: the bus device, chip select handled by the device
/// - HINTN: Hardware Interrupt. Sensor uses this to indicate it had data available for read
/// - RSTN: Reset the device
pub struct SpiControlLines<SPI, IN, RSTN> {
    pub spi: SPI,
    pub hintn: IN,
    pub reset: RSTN,
}

/// This combines the SPI peripheral and associated control pins
pub struct SpiInterface<SPI, IN, RSTN> {
    spi: SPI,
    hintn: IN,
    reset: RSTN,
    received_packet_count: usize,
}

impl<SPI, IN, RSTN, PinE> SpiInterface<SPI, IN, RSTN>
where
    SPI: SpiDevice,
    IN: InputPin<Error = PinE>,
    RSTN: OutputPin<Error = PinE>,
{
    pub fn new(lines: SpiControlLines<SPI, IN, RSTN>) -> Self {
        Self {
            spi: lines.spi,
            hintn: lines.hintn,
            reset: lines.reset,
            received_packet_count: 0,
        }
    }

    /// Number of read transactions performed since construction
    pub fn received_packet_count(&self) -> usize {
        self.received_packet_count
    }

    /// Is the sensor indicating it has data available
    /// "In SPI and I2C mode the HOST_INTN signal is used by the BNO080 to
    /// indicate to the application processor that the BNO080 needs attention."
    fn hintn_signaled(&mut self) -> bool {
        self.hintn.is_low().unwrap_or(false)
    }

    /// Wait for sensor to be ready.
    /// After reset this can take around 120 ms
    /// Return true if the sensor is awake, false if it doesn't wake up
    fn wait_for_sensor_awake(&mut self, delay_source: &mut impl DelayMs, max_ms: u32) -> bool {
        for _ in 0..max_ms {
            if self.hintn_signaled() {
                return true;
            }
            delay_source.delay_ms(1);
        }

        false
    }
}

impl<SPI, IN, RSTN, PinE> SensorInterface for SpiInterface<SPI, IN, RSTN>
where
    SPI: SpiDevice,
    IN: InputPin<Error = PinE>,
    RSTN: OutputPin<Error = PinE>,
{
    type SensorError = Error<SPI::Error, PinE>;

    fn setup(&mut self, delay_source: &mut impl DelayMs) -> Result<(), Self::SensorError> {
        // Note: This assumes that WAK/PS0 is strapped high, which selects SPI
        self.reset.set_high().map_err(Error::Pin)?;

        trace!("reset cycle...");
        self.reset.set_low().map_err(Error::Pin)?;
        delay_source.delay_ms(2);
        self.reset.set_high().map_err(Error::Pin)?;

        // wait for sensor to set hintn pin after reset
        if !self.wait_for_sensor_awake(delay_source, RESET_WAKE_MS) {
            debug!("sensor not ready");
            return Err(Error::SensorUnresponsive);
        }

        Ok(())
    }

    fn requires_soft_reset(&self) -> bool {
        false
    }

    fn data_ready(&mut self) -> bool {
        self.hintn_signaled()
    }

    /// The hub restarts the packet on every chip select, so a whole packet
    /// must be clocked out in one transaction.
    fn max_read_len(&self) -> usize {
        usize::from(u16::MAX)
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<(), Self::SensorError> {
        self.spi.write(packet).map_err(Error::Comm)
    }

    fn read_transaction(&mut self, recv_buf: &mut [u8]) -> Result<(), Self::SensorError> {
        recv_buf.fill(0);
        self.spi.read(recv_buf).map_err(Error::Comm)?;
        self.received_packet_count += 1;
        Ok(())
    }
}
