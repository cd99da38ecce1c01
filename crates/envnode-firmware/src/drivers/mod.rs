//! Register-level drivers for the node's I2C peripherals
//!
//! Each driver owns an [`crate::async_i2c_bus::AsyncI2cDevice`] and implements
//! one of the engine's capability traits.

pub mod bme280;
pub mod ccs811;
pub mod pcf8523;

use embedded_hal_async::i2c::{Error, ErrorKind};
use envnode_core::sensors::SensorError;

pub(crate) fn bus_error<E: Error>(sensor: &'static str, error: E) -> SensorError {
    let details = match error.kind() {
        ErrorKind::Bus => "bus error",
        ErrorKind::ArbitrationLoss => "arbitration lost",
        ErrorKind::NoAcknowledge(_) => "no acknowledge",
        ErrorKind::Overrun => "overrun",
        _ => "unknown error",
    };
    SensorError::Bus { sensor, details }
}

pub(crate) const fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}
