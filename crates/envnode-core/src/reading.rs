//! One sample of the node's environment
//!
//! A [`Reading`] lives for a single cycle: it is assembled by
//! [`crate::acquisition::ReadingAcquirer`], encoded, handed to the sinks and
//! dropped.

use core::fmt::{self, Display};

use crate::frame::FrameFormat;
use crate::hardware::HardwareAvailability;
use crate::sensors::describe_status;
use crate::time_source::{GpsStatus, WallClock};

/// CO2/TVOC value reported when no measurement is available
pub const GAS_SENTINEL: i32 = -1;

/// Gas status of a healthy sensor
pub const GAS_STATUS_OK: u8 = 0;

/// Gas status reported while the gas sensor is not (yet) available
pub const GAS_STATUS_ABSENT: u8 = 255;

/// Gas sensor portion of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasValues {
    /// Equivalent CO2 in ppm, or [`GAS_SENTINEL`]
    pub co2: i32,
    /// TVOC in ppb, or [`GAS_SENTINEL`]
    pub tvoc: i32,
    pub status: u8,
}

impl GasValues {
    /// Values carried while the gas sensor is not available.
    pub const ABSENT: Self = Self {
        co2: GAS_SENTINEL,
        tvoc: GAS_SENTINEL,
        status: GAS_STATUS_ABSENT,
    };

    pub const fn is_absent(&self) -> bool {
        self.co2 == GAS_SENTINEL && self.tvoc == GAS_SENTINEL && self.status == GAS_STATUS_ABSENT
    }
}

impl Default for GasValues {
    fn default() -> Self {
        Self::ABSENT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: WallClock,
    /// Seconds since boot
    pub uptime: u32,
    /// Availability mask at sample time
    pub hardware: HardwareAvailability,
    /// Calibration-adjusted temperature in °C
    pub temperature: f32,
    /// Temperature as the sensor reported it, 0.0 after a failed read. Not
    /// part of the wire frame.
    pub raw_temperature: f32,
    /// Self-heating bias subtracted from `temperature`, 0.0 until calibrated
    pub calibration_offset: f32,
    pub calibrated: bool,
    /// Relative humidity in %
    pub humidity: f32,
    /// Pressure in Pa
    pub pressure: f32,
    pub gas: GasValues,
    /// Supply voltage scaled to one byte
    pub voltage: u8,
    /// Present on GPS-timed nodes only
    pub gps: Option<GpsStatus>,
}

impl Reading {
    pub const fn frame_format(&self) -> FrameFormat {
        match self.gps {
            Some(_) => FrameFormat::Gps,
            None => FrameFormat::Rtc,
        }
    }
}

struct GasValue(i32, &'static str);

impl Display for GasValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == GAS_SENTINEL {
            f.write_str("not recorded")
        } else {
            write!(f, "{} {}", self.0, self.1)
        }
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

impl Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Recorded: {}", self.timestamp)?;
        writeln!(f, "Hardware: {}", self.hardware)?;
        writeln!(f, "Uptime: {}s", self.uptime)?;
        writeln!(f, "Temperature: {:.2}°C", self.temperature)?;
        writeln!(f, "Temperature calibration: {:.2}°C", self.calibration_offset)?;
        writeln!(f, "Temperature calibrated? {}", yes_no(self.calibrated))?;
        writeln!(f, "Humidity: {:.2}", self.humidity)?;
        writeln!(f, "Barometric pressure: {:.4} kPa", self.pressure / 1000.0)?;
        writeln!(f, "CCS811 status: {}", describe_status(self.gas.status))?;
        writeln!(f, "CO2: {}", GasValue(self.gas.co2, "ppm"))?;
        writeln!(f, "TVOC: {}", GasValue(self.gas.tvoc, "ppb"))?;
        write!(f, "Voltage: {:.1}V", f32::from(self.voltage) / 100.0)?;

        if let Some(gps) = self.gps {
            write!(f, "\nSats: {} (fix? {})", gps.satellites, yes_no(gps.fix))?;
        }
        Ok(())
    }
}
