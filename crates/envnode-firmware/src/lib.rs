//! ESP32-S3 firmware-specific modules for envnode
//!
//! Everything here touches esp-hal types and only builds for the device:
//! peripheral drivers, bus setup, the SD card sink and RTT telemetry.

#![no_std]

pub mod async_i2c_bus;
pub mod config;
pub mod drivers;
pub mod hardware;
pub mod sleep;
pub mod storage;
pub mod telemetry;
pub mod voltage;
