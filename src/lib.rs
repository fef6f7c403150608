// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host driver for the BNO085 9-axis IMU.
//!
//! The hub speaks SHTP over SPI or I2C. [`BNO085`] frames requests, decodes
//! the packets the hub sends back and keeps the latest value of every
//! enabled sensor in a [`SensorData`] store.
//!
//! ```no_run
//! use bno085::{DriverConfig, BNO085};
//!
//! let mut imu =
//!     BNO085::new_spi_from_symbol("/dev/spidev1.0", "IMU_INT", "IMU_RST", DriverConfig::default())?;
//! imu.init().map_err(|e| std::io::Error::other(e.to_string()))?;
//! imu.enable_rotation_vector(10_000)
//!     .map_err(|e| std::io::Error::other(e.to_string()))?;
//! loop {
//!     imu.handle_messages(20, 10);
//!     println!("yaw {:.1}", imu.sensor_data().yaw().to_degrees());
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod driver;
pub mod frs;
pub mod interface;
pub mod reports;
pub mod sensor_data;
pub mod shtp;

pub use commands::{CalibrationTarget, TareAxes, TareBasis};
pub use config::DriverConfig;
pub use constants::*;
pub use driver::{DriverError, SpiLinuxInterface, BNO085};
pub use frs::FrsReadOutcome;
pub use interface::Error;
pub use reports::{InputReport, ProductId, Report, SensorReading};
pub use sensor_data::SensorData;
pub use shtp::{Channel, Packet};
