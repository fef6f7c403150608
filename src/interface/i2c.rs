// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use super::delay::DelayMs;
use super::{Error, SensorInterface};
use crate::constants::PACKET_HEADER_LENGTH;
use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal::i2c::I2c;
use log::trace;
use std::convert::Infallible;

/// Default 7-bit address of the hub (SA0 pulled high)
pub const DEFAULT_I2C_ADDRESS: u8 = 0x4B;
/// Many I2C controllers cap a single read at 32 bytes
pub const DEFAULT_I2C_READ_LIMIT: usize = 32;

/// Stand-in for boards that do not wire the hub's INT line.
///
/// Always reads as asserted, so every poll results in a bus read and an
/// empty header signals that nothing is pending.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl ErrorType for NoInterrupt {
    type Error = Infallible;
}

impl InputPin for NoInterrupt {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(true)
    }
}

/// The hub on an I2C bus, with an optional INT line
pub struct I2cInterface<I2C, INT = NoInterrupt> {
    i2c: I2C,
    int: INT,
    address: u8,
    read_limit: usize,
}

impl<I2C: I2c> I2cInterface<I2C, NoInterrupt> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self::with_interrupt(i2c, NoInterrupt, address)
    }
}

impl<I2C, INT> I2cInterface<I2C, INT>
where
    I2C: I2c,
    INT: InputPin,
{
    pub fn with_interrupt(i2c: I2C, int: INT, address: u8) -> Self {
        Self {
            i2c,
            int,
            address,
            read_limit: DEFAULT_I2C_READ_LIMIT,
        }
    }

    /// Set the largest read, header included, the controller can do in
    /// one transaction. Anything smaller than a header plus one byte is
    /// raised to that.
    pub fn with_read_limit(mut self, read_limit: usize) -> Self {
        self.read_limit = read_limit.max(PACKET_HEADER_LENGTH + 1);
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give back the bus and the interrupt line
    pub fn free(self) -> (I2C, INT) {
        (self.i2c, self.int)
    }
}

impl<I2C, INT> SensorInterface for I2cInterface<I2C, INT>
where
    I2C: I2c,
    INT: InputPin,
{
    type SensorError = Error<I2C::Error, INT::Error>;

    /// Nothing to sequence on the pins; the driver follows up with a soft
    /// reset over the bus.
    fn setup(&mut self, _delay_source: &mut impl DelayMs) -> Result<(), Self::SensorError> {
        trace!("i2c setup at 0x{:02X}", self.address);
        Ok(())
    }

    fn requires_soft_reset(&self) -> bool {
        true
    }

    fn data_ready(&mut self) -> bool {
        self.int.is_low().unwrap_or(true)
    }

    fn max_read_len(&self) -> usize {
        self.read_limit
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<(), Self::SensorError> {
        self.i2c.write(self.address, packet).map_err(Error::Comm)
    }

    fn read_transaction(&mut self, recv_buf: &mut [u8]) -> Result<(), Self::SensorError> {
        let len = recv_buf.len().min(self.read_limit);
        self.i2c
            .read(self.address, &mut recv_buf[..len])
            .map_err(Error::Comm)
    }
}
