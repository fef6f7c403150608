// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::interface::{spidev::SPI_MAX_SPEED_HZ, DEFAULT_I2C_ADDRESS, DEFAULT_I2C_READ_LIMIT};

/// Bus settings, timeouts and retry ceilings for a [`crate::BNO085`].
///
/// All waits are counted in 1 ms steps of the driver's delay source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// 7-bit I2C address (default: 0x4B)
    pub i2c_address: u8,
    /// Largest single I2C read the controller supports, header included
    /// (default: 32)
    pub i2c_read_limit: usize,
    /// SPI clock, capped at 3 MHz (default: 3 MHz)
    pub spi_speed_hz: u32,
    /// How long message handling waits for the hub to signal a packet
    /// (default: 150 ms)
    pub packet_wait_ms: u32,
    /// 1 ms waits allowed per packet during an FRS read (default: 100)
    pub frs_retry_limit: u32,
    /// Pause after a reset before draining the startup packets
    /// (default: 50 ms)
    pub reset_settle_ms: u32,
    /// How long to wait for the hub to confirm a feature (default: 2000 ms)
    pub response_timeout_ms: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            i2c_address: DEFAULT_I2C_ADDRESS,
            i2c_read_limit: DEFAULT_I2C_READ_LIMIT,
            spi_speed_hz: SPI_MAX_SPEED_HZ,
            packet_wait_ms: 150,
            frs_retry_limit: 100,
            reset_settle_ms: 50,
            response_timeout_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.i2c_address, 0x4B);
        assert_eq!(config.i2c_read_limit, 32);
        assert_eq!(config.frs_retry_limit, 100);
        assert_eq!(config.spi_speed_hz, 3_000_000);
    }
}
