// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use bno085::{
    interface::delay::{DelayMs, TimerMs},
    DriverConfig, SpiLinuxInterface, BNO085,
};
use clap::Parser;
use log::{info, warn};

/// Stream orientation from a BNO085 on a Linux SPI bus
#[derive(Parser, Debug)]
#[command(name = "bno085", version, long_about = None)]
struct Args {
    /// SPI device node
    #[arg(short, long, default_value = "/dev/spidev1.0")]
    spidev: String,

    /// Name of the HINTN (interrupt) GPIO line
    #[arg(long, default_value = "IMU_INT")]
    hintn: String,

    /// Name of the reset GPIO line
    #[arg(long, default_value = "IMU_RST")]
    reset: String,

    /// GPIO chip holding both lines; when set, --hintn-pin and --reset-pin
    /// are used instead of line names
    #[arg(long)]
    gpiochip: Option<String>,

    #[arg(long, default_value_t = 2)]
    hintn_pin: u32,

    #[arg(long, default_value_t = 0)]
    reset_pin: u32,

    /// Report interval in milliseconds
    #[arg(short, long, default_value_t = 50)]
    interval: u16,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn open(args: &Args) -> std::io::Result<BNO085<SpiLinuxInterface>> {
    let config = DriverConfig::default();
    match &args.gpiochip {
        Some(chip) => BNO085::new_spi(
            &args.spidev,
            chip,
            args.hintn_pin,
            chip,
            args.reset_pin,
            config,
        ),
        None => BNO085::new_spi_from_symbol(&args.spidev, &args.hintn, &args.reset, config),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut imu = open(&args)?;
    imu.init()?;
    if let Some(pid) = imu.product_id() {
        info!(
            "BNO085 firmware {}.{}.{} (reset cause {})",
            pid.sw_version_major, pid.sw_version_minor, pid.sw_version_patch, pid.reset_cause
        );
    }

    if !imu.enable_rotation_vector(u32::from(args.interval) * 1000)? {
        warn!("rotation vector not confirmed by the hub");
    }

    let mut delay = TimerMs;
    loop {
        imu.handle_messages(u32::from(args.interval) * 2, 10);
        let data = imu.sensor_data();
        println!(
            "roll {:7.2} pitch {:7.2} yaw {:7.2} (accuracy {:.3} rad)",
            data.roll().to_degrees(),
            data.pitch().to_degrees(),
            data.yaw().to_degrees(),
            data.quat_radian_accuracy()
        );
        delay.delay_ms(u32::from(args.interval));
    }
}
