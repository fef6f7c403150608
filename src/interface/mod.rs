// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bus transports for the sensor hub.
//!
//! A transport moves one block of bytes per bus transaction and knows how to
//! bring the hub out of reset. It has no notion of SHTP channels or reports;
//! that lives in [`crate::shtp`].

pub mod delay;
pub mod gpio;
pub mod i2c;
#[cfg(test)]
pub(crate) mod mock;
pub mod spi;
pub mod spidev;

pub use i2c::{I2cInterface, NoInterrupt, DEFAULT_I2C_ADDRESS, DEFAULT_I2C_READ_LIMIT};
pub use spi::{SpiControlLines, SpiInterface};

use delay::DelayMs;

/// Errors raised by a transport
#[derive(Debug, thiserror::Error)]
pub enum Error<CommE, PinE> {
    /// Sensor communication error
    #[error("sensor communication error: {0:?}")]
    Comm(CommE),
    /// Pin setting error
    #[error("pin error: {0:?}")]
    Pin(PinE),

    /// The sensor is not responding
    #[error("the sensor is not responding")]
    SensorUnresponsive,
}

pub trait SensorInterface {
    type SensorError;

    /// Give the sensor a chance to set up the interface
    fn setup(&mut self, delay_source: &mut impl DelayMs) -> Result<(), Self::SensorError>;

    /// Whether the hub must be sent a soft reset after `setup`
    fn requires_soft_reset(&self) -> bool;

    /// Whether the hub has signaled that a packet is waiting.
    ///
    /// Transports without a ready line always report true and rely on a
    /// zero-length header to mean "nothing pending".
    fn data_ready(&mut self) -> bool;

    /// Largest number of bytes, header included, one read transaction may
    /// return
    fn max_read_len(&self) -> usize;

    /// Write one complete packet, header included
    fn write_packet(&mut self, packet: &[u8]) -> Result<(), Self::SensorError>;

    /// Perform one read transaction filling `recv_buf`.
    ///
    /// Every transaction starts with the 4-byte SHTP header of the packet
    /// being read, followed by the next cargo bytes.
    fn read_transaction(&mut self, recv_buf: &mut [u8]) -> Result<(), Self::SensorError>;
}
