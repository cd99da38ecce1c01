//! Sensor capability traits
//!
//! The engine talks to peripherals only through these traits. Concrete
//! drivers live in the firmware crate; the simulator and tests provide their
//! own implementations.

mod gas;

pub use gas::*;

use thiserror_no_std::Error;

/// Errors a sensor driver may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },

    #[error("{sensor} {operation} failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },

    #[error("{sensor} timed out while trying to {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },

    #[error("{sensor} bus error: {details}")]
    Bus {
        sensor: &'static str,
        details: &'static str,
    },
}

/// Temperature / humidity / pressure sensor (BME280 class).
///
/// Temperature is in °C, humidity in %RH and pressure in Pa.
pub trait TemperatureSensor {
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    fn read_temperature(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    fn read_humidity(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    fn read_pressure(&mut self) -> impl Future<Output = Result<f32, SensorError>>;
}

/// Raw supply-voltage ADC channel.
///
/// A single conversion; oversampling is done by [`crate::voltage::sample_voltage`].
pub trait VoltageSource {
    fn read_raw(&mut self) -> u16;
}
