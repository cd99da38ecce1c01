//! PCF8523 battery-backed real-time clock

use embedded_hal_async::i2c::I2c;
use envnode_core::hardware::Capability;
use envnode_core::sensors::SensorError;
use envnode_core::time_source::{TimeSource, WallClock};
use log::warn;

use super::{bus_error, from_bcd};

pub const DEFAULT_ADDRESS: u8 = 0x68;

const SENSOR: &str = "PCF8523";

const REG_CONTROL_3: u8 = 0x02;
const REG_SECONDS: u8 = 0x03;

/// Battery switch-over bits; all set is the power-on default of a clock
/// that was never configured.
const PM_MASK: u8 = 0xE0;

pub struct Pcf8523<I> {
    i2c: I,
    address: u8,
    last: WallClock,
}

impl<I: I2c> Pcf8523<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            last: WallClock::EPOCH,
        }
    }

    async fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[register], buf)
            .await
            .map_err(|e| bus_error(SENSOR, e))
    }

    async fn read_time(&mut self) -> Result<WallClock, SensorError> {
        let mut raw = [0u8; 7];
        self.read_registers(REG_SECONDS, &mut raw).await?;

        // raw[4] is the weekday
        let time = WallClock::new(
            2000 + u16::from(from_bcd(raw[6])),
            from_bcd(raw[5] & 0x1F),
            from_bcd(raw[3] & 0x3F),
            from_bcd(raw[2] & 0x3F),
            from_bcd(raw[1] & 0x7F),
            from_bcd(raw[0] & 0x7F),
        );
        if !time.is_valid() {
            return Err(SensorError::ReadFailed {
                sensor: SENSOR,
                operation: "read time",
                details: "registers hold an invalid date",
            });
        }
        Ok(time)
    }
}

impl<I: I2c> TimeSource for Pcf8523<I> {
    async fn init(&mut self) -> Result<(), SensorError> {
        let mut control = [0u8; 1];
        self.read_registers(REG_CONTROL_3, &mut control).await?;
        if control[0] & PM_MASK == PM_MASK {
            return Err(SensorError::InitializationFailed {
                sensor: SENSOR,
                details: "clock was never set",
            });
        }

        self.last = self.read_time().await?;
        Ok(())
    }

    /// The last good time is repeated when a read fails.
    async fn now(&mut self) -> WallClock {
        match self.read_time().await {
            Ok(time) => self.last = time,
            Err(e) => warn!("{e}"),
        }
        self.last
    }

    fn capability(&self) -> Capability {
        Capability::TimeSource
    }
}
