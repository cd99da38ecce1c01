//! Peripheral availability tracking
//!
//! Every sampling decision branches on these flags rather than on whether a
//! driver happens to exist. The bit positions are part of the frame and CSV
//! contract, so downstream tools decode them with the same table.

use core::fmt::{self, Display};

use log::warn;

/// One peripheral kind the node can report as available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Capability {
    /// Temperature / humidity / pressure sensor (BME280)
    TempHumidityPressure = 1,
    /// Gas sensor (CCS811). Only set once calibration completes.
    GasSensor = 2,
    /// Real-time clock
    TimeSource = 4,
    /// SD card
    Storage = 8,
    /// GPS receiver that produced a fix at boot
    GpsFix = 16,
}

impl Capability {
    /// Every capability, in bit order
    pub const ALL: [Capability; 5] = [
        Self::TempHumidityPressure,
        Self::GasSensor,
        Self::TimeSource,
        Self::Storage,
        Self::GpsFix,
    ];

    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Name of the part that provides this capability
    pub const fn label(self) -> &'static str {
        match self {
            Self::TempHumidityPressure => "BME280",
            Self::GasSensor => "CCS811",
            Self::TimeSource => "RTC",
            Self::Storage => "SD",
            Self::GpsFix => "GPS",
        }
    }
}

/// Snapshot of the availability mask, copied into every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareAvailability(u8);

impl HardwareAvailability {
    pub const NONE: Self = Self(0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }
}

impl Display for HardwareAvailability {
    /// Comma separated part names, e.g. `BME280,CCS811,RTC,SD`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for capability in Capability::ALL {
            if !self.contains(capability) {
                continue;
            }
            if !first {
                f.write_str(",")?;
            }
            f.write_str(capability.label())?;
            first = false;
        }

        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// Which peripherals came up, written during boot.
///
/// There is no removal operation: a peripheral that fails mid-run stays
/// "available" and reports the failure through its reading's status fields.
#[derive(Debug, Default)]
pub struct HardwareRegistry {
    flags: HardwareAvailability,
}

impl HardwareRegistry {
    pub const fn new() -> Self {
        Self {
            flags: HardwareAvailability::NONE,
        }
    }

    /// Mark a capability as available.
    ///
    /// Returns `false` (and leaves the mask untouched) if it was already set.
    pub fn mark_available(&mut self, capability: Capability) -> bool {
        if self.flags.contains(capability) {
            warn!("{} marked available twice", capability.label());
            return false;
        }

        self.flags = self.flags.with(capability);
        true
    }

    pub const fn is_available(&self, capability: Capability) -> bool {
        self.flags.contains(capability)
    }

    pub const fn snapshot(&self) -> HardwareAvailability {
        self.flags
    }
}
