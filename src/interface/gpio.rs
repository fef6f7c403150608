// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Linux GPIO character-device lines for the HINTN, RSTN and WAKE pins.

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use gpiod::{Chip, Input, Lines, Options, Output};
use std::io;

/// Error raised by a gpiod line request or value access
#[derive(Debug, thiserror::Error)]
#[error("gpio line error: {0}")]
pub struct GpioError(#[from] io::Error);

impl digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct GpiodOut {
    output: Lines<Output>,
}

impl GpiodOut {
    /// Request `pin` on `chip` as an output, initially high (RSTN and WAKE
    /// are active low).
    pub fn new(chip: &Chip, pin: u32) -> io::Result<GpiodOut> {
        let opts = Options::output([pin])
            .values([true])
            .consumer("bno085-out");

        Ok(GpiodOut {
            output: chip.request_lines(opts)?,
        })
    }
}

impl ErrorType for GpiodOut {
    type Error = GpioError;
}

impl OutputPin for GpiodOut {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.output.set_values([false])?;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.output.set_values([true])?;
        Ok(())
    }
}

pub struct GpiodIn {
    input: Lines<Input>,
}

impl GpiodIn {
    pub fn new(chip: &Chip, pin: u32) -> io::Result<GpiodIn> {
        let opts = Options::input([pin]).consumer("bno085-in");

        Ok(GpiodIn {
            input: chip.request_lines(opts)?,
        })
    }
}

impl ErrorType for GpiodIn {
    type Error = GpioError;
}

impl InputPin for GpiodIn {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let values = self.input.get_values([false])?;
        Ok(values[0])
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        let values = self.input.get_values([false])?;
        Ok(!values[0])
    }
}

/// Find a GPIO line by its symbolic name across every chip on the system.
///
/// Returns the chip path and line offset.
pub fn find_line(name: &str) -> io::Result<(String, u32)> {
    for entry in gpiod::Chip::list_devices()? {
        let chip = gpiod::Chip::new(&entry)?;
        for i in 0..chip.num_lines() {
            let info = chip.line_info(i)?;
            log::trace!("--- {} ---", info.name);
            if info.name == name {
                return Ok((entry.display().to_string(), i));
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!("Did not find gpio line \"{}\"", name),
    ))
}
