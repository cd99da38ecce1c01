//! Metal-oxide gas sensor contract (CCS811 class)

use serde::{Deserialize, Serialize};

use super::SensorError;

/// Result of bringing the gas sensor out of reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GasInitStatus {
    Success = 0,
    IdError = 1,
    I2cError = 2,
    InternalError = 3,
    GenericError = 4,
}

impl GasInitStatus {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Measurement cadence of the gas sensor's heater.
///
/// `Idle` keeps the heater off, so no measurements happen until calibration
/// switches the sensor into an active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum DriveMode {
    Idle = 0,
    EverySecond = 1,
    EveryTenSeconds = 2,
    EveryMinute = 3,
    Pulse250Ms = 4,
}

impl DriveMode {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasResults {
    /// Equivalent CO2 in ppm
    pub co2: u16,
    /// Total volatile organic compounds in ppb
    pub tvoc: u16,
}

/// Human readable text for a gas status code, as printed by the collector
pub const fn describe_status(code: u8) -> &'static str {
    match code {
        0 => "OK",
        1 => "invalid ID",
        2 => "I2C error",
        3 => "internal error",
        4 => "generic error",
        _ => "unknown error or sensor is off",
    }
}

pub trait GasSensor {
    /// Start the sensor's application firmware. Must be called with the
    /// reset line released.
    fn init(&mut self) -> impl Future<Output = GasInitStatus>;

    fn set_drive_mode(&mut self, mode: DriveMode) -> impl Future<Output = Result<(), SensorError>>;

    /// Push ambient conditions used for on-chip compensation.
    fn set_environmental_data(
        &mut self,
        humidity: f32,
        temperature: f32,
    ) -> impl Future<Output = Result<(), SensorError>>;

    fn data_available(&mut self) -> impl Future<Output = bool>;

    fn read_results(&mut self) -> impl Future<Output = Result<GasResults, SensorError>>;

    /// `true` when the sensor's status register flags an error
    fn check_status_error(&mut self) -> impl Future<Output = bool>;

    /// Raw error register; `0xFF` when the register could not be read
    fn status_register(&mut self) -> impl Future<Output = u8>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_status_codes() {
        assert_eq!(describe_status(GasInitStatus::Success.code()), "OK");
        assert_eq!(describe_status(GasInitStatus::IdError.code()), "invalid ID");
        assert_eq!(describe_status(GasInitStatus::I2cError.code()), "I2C error");
        assert_eq!(describe_status(GasInitStatus::InternalError.code()), "internal error");
        assert_eq!(describe_status(GasInitStatus::GenericError.code()), "generic error");
        assert_eq!(describe_status(255), "unknown error or sensor is off");
    }

    #[test]
    fn test_drive_mode_codes() {
        assert_eq!(DriveMode::Idle.code(), 0);
        assert_eq!(DriveMode::EveryTenSeconds.code(), 2);
        assert_eq!(DriveMode::Pulse250Ms.code(), 4);
    }
}
