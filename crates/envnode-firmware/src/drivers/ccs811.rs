//! CCS811 metal-oxide gas sensor

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use envnode_core::sensors::{DriveMode, GasInitStatus, GasResults, GasSensor, SensorError};
use log::{debug, warn};

use super::bus_error;

pub const DEFAULT_ADDRESS: u8 = 0x5B;

const SENSOR: &str = "CCS811";
const HW_ID: u8 = 0x81;

const REG_STATUS: u8 = 0x00;
const REG_MEAS_MODE: u8 = 0x01;
const REG_ALG_RESULT_DATA: u8 = 0x02;
const REG_ENV_DATA: u8 = 0x05;
const REG_HW_ID: u8 = 0x20;
const REG_ERROR_ID: u8 = 0xE0;
const REG_APP_START: u8 = 0xF4;
const REG_SW_RESET: u8 = 0xFF;

const SW_RESET_SEQUENCE: [u8; 4] = [0x11, 0xE5, 0x72, 0x8A];

const STATUS_ERROR: u8 = 1 << 0;
const STATUS_DATA_READY: u8 = 1 << 3;
const STATUS_APP_VALID: u8 = 1 << 4;

const DRIVE_MODE_MASK: u8 = 0b0111_0000;

/// Reported by [`GasSensor::status_register`] when the error register
/// itself cannot be read.
pub const UNREADABLE_ERROR_ID: u8 = 0xFF;

pub struct Ccs811<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Ccs811<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
        }
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.read_registers(register, &mut buf).await?;
        Ok(buf[0])
    }

    async fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[register], buf)
            .await
            .map_err(|e| bus_error(SENSOR, e))
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, bytes)
            .await
            .map_err(|e| bus_error(SENSOR, e))
    }

    async fn status(&mut self) -> Result<u8, SensorError> {
        self.read_register(REG_STATUS).await
    }

    async fn start(&mut self) -> Result<GasInitStatus, SensorError> {
        let mut reset = [0u8; 5];
        reset[0] = REG_SW_RESET;
        reset[1..].copy_from_slice(&SW_RESET_SEQUENCE);
        self.write(&reset).await?;
        // Boot mode needs up to 2 ms after a reset
        self.delay.delay_ms(2).await;

        if self.read_register(REG_HW_ID).await? != HW_ID {
            return Ok(GasInitStatus::IdError);
        }

        let status = self.status().await?;
        if status & STATUS_ERROR != 0 || status & STATUS_APP_VALID == 0 {
            return Ok(GasInitStatus::InternalError);
        }

        self.write(&[REG_APP_START]).await?;
        self.delay.delay_ms(1).await;

        if self.status().await? & STATUS_ERROR != 0 {
            return Ok(GasInitStatus::InternalError);
        }
        Ok(GasInitStatus::Success)
    }
}

impl<I: I2c, D: DelayNs> GasSensor for Ccs811<I, D> {
    async fn init(&mut self) -> GasInitStatus {
        match self.start().await {
            Ok(status) => status,
            Err(e) => {
                warn!("{e}");
                GasInitStatus::I2cError
            }
        }
    }

    async fn set_drive_mode(&mut self, mode: DriveMode) -> Result<(), SensorError> {
        let current = self.read_register(REG_MEAS_MODE).await?;
        let value = (current & !DRIVE_MODE_MASK) | (mode.code() << 4);
        self.write(&[REG_MEAS_MODE, value]).await?;
        debug!("{SENSOR} drive mode {:?}", mode);
        Ok(())
    }

    async fn set_environmental_data(&mut self, humidity: f32, temperature: f32) -> Result<(), SensorError> {
        if !(0.0..=100.0).contains(&humidity) || !(-25.0..=50.0).contains(&temperature) {
            return Err(SensorError::ReadFailed {
                sensor: SENSOR,
                operation: "set environmental data",
                details: "value out of range",
            });
        }

        // Both fields are unsigned 1/512 steps; temperature is offset by 25 C
        let rh = (humidity * 1000.0) as u32;
        let t = ((temperature * 1000.0) as i32 + 25_000) as u32;
        let env = [
            REG_ENV_DATA,
            ((rh + 250) / 500) as u8,
            0,
            ((t + 250) / 500) as u8,
            0,
        ];
        self.write(&env).await
    }

    async fn data_available(&mut self) -> bool {
        match self.status().await {
            Ok(status) => status & STATUS_DATA_READY != 0,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    async fn read_results(&mut self) -> Result<GasResults, SensorError> {
        let mut raw = [0u8; 4];
        self.read_registers(REG_ALG_RESULT_DATA, &mut raw).await?;
        Ok(GasResults {
            co2: u16::from_be_bytes([raw[0], raw[1]]),
            tvoc: u16::from_be_bytes([raw[2], raw[3]]),
        })
    }

    async fn check_status_error(&mut self) -> bool {
        match self.status().await {
            Ok(status) => status & STATUS_ERROR != 0,
            Err(e) => {
                warn!("{e}");
                true
            }
        }
    }

    async fn status_register(&mut self) -> u8 {
        self.read_register(REG_ERROR_ID)
            .await
            .unwrap_or(UNREADABLE_ERROR_ID)
    }
}
