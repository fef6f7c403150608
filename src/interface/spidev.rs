// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! `embedded-hal` SPI device backed by a Linux spidev node.

use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::{io, path::Path};

/// The BNO085 SPI clock must not exceed 3 MHz
pub const SPI_MAX_SPEED_HZ: u32 = 3_000_000;

/// Error raised by a spidev ioctl
#[derive(Debug, thiserror::Error)]
#[error("spidev error: {0}")]
pub struct SpidevError(#[from] io::Error);

impl spi::Error for SpidevError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct SpiDevice {
    spi: Spidev,
}

impl SpiDevice {
    /// Open the spidev node at `path`. The hub uses CPOL = 1, CPHA = 1
    /// (mode 3), MSB first; `speed_hz` is capped at [`SPI_MAX_SPEED_HZ`].
    pub fn new<P: AsRef<Path>>(path: P, speed_hz: u32) -> io::Result<SpiDevice> {
        let mut spi = Spidev::open(path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz.min(SPI_MAX_SPEED_HZ))
            .mode(SpiModeFlags::SPI_MODE_3)
            .lsb_first(false)
            .build();
        spi.configure(&options)?;

        Ok(SpiDevice { spi })
    }
}

impl ErrorType for SpiDevice {
    type Error = SpidevError;
}

impl spi::SpiDevice for SpiDevice {
    /// All operations run inside one chip-select assertion.
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut transfers: Vec<SpidevTransfer> = operations
            .iter_mut()
            .map(|op| match op {
                Operation::Read(buf) => SpidevTransfer::read(buf),
                Operation::Write(buf) => SpidevTransfer::write(buf),
                Operation::Transfer(read, write) => SpidevTransfer::read_write(write, read),
                Operation::TransferInPlace(buf) => SpidevTransfer::read_write_in_place(buf),
                Operation::DelayNs(ns) => {
                    let us = ns.div_ceil(1000).min(u32::from(u16::MAX));
                    SpidevTransfer::delay(us as u16)
                }
            })
            .collect();
        self.spi.transfer_multiple(&mut transfers)?;
        Ok(())
    }
}
