//! BME280 temperature / humidity / pressure sensor
//!
//! The sensor runs in normal mode with 1x oversampling and no IIR filter.
//! Every read takes a fresh burst of all three channels, because humidity and
//! pressure compensation depend on the temperature's `t_fine`.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use envnode_core::sensors::{SensorError, TemperatureSensor};
use log::debug;

use super::bus_error;

pub const DEFAULT_ADDRESS: u8 = 0x77;

const SENSOR: &str = "BME280";
const CHIP_ID: u8 = 0x60;

const REG_CALIB_00: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_CALIB_26: u8 = 0xE1;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

const SOFT_RESET: u8 = 0xB6;
const STATUS_IM_UPDATE: u8 = 0x01;
/// osrs_h = x1
const CTRL_HUM_X1: u8 = 0x01;
/// osrs_t = x1, osrs_p = x1, normal mode
const CTRL_MEAS_NORMAL: u8 = (0b001 << 5) | (0b001 << 2) | 0b11;

/// Factory trimming parameters.
#[derive(Debug, Clone, Copy, Default)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

impl Calibration {
    fn parse(tp: &[u8; 26], h: &[u8; 7]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([tp[i], tp[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([tp[i], tp[i + 1]]);

        Self {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
            h1: tp[25],
            h2: i16::from_le_bytes([h[0], h[1]]),
            h3: h[2],
            h4: (i16::from(h[3] as i8) << 4) | i16::from(h[4] & 0x0F),
            h5: (i16::from(h[5] as i8) << 4) | i16::from(h[4] >> 4),
            h6: h[6] as i8,
        }
    }

    /// Returns `(t_fine, centi-degrees)`.
    fn temperature(&self, adc_t: i32) -> (i32, i32) {
        let t1 = i32::from(self.t1);
        let var1 = (((adc_t >> 3) - (t1 << 1)) * i32::from(self.t2)) >> 11;
        let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * i32::from(self.t3)) >> 14;
        let t_fine = var1 + var2;
        (t_fine, (t_fine * 5 + 128) >> 8)
    }

    /// Pressure in Q24.8 Pa.
    fn pressure(&self, adc_p: i32, t_fine: i32) -> u32 {
        let mut var1 = i64::from(t_fine) - 128_000;
        let mut var2 = var1 * var1 * i64::from(self.p6);
        var2 += (var1 * i64::from(self.p5)) << 17;
        var2 += i64::from(self.p4) << 35;
        var1 = ((var1 * var1 * i64::from(self.p3)) >> 8) + ((var1 * i64::from(self.p2)) << 12);
        var1 = (((1_i64 << 47) + var1) * i64::from(self.p1)) >> 33;
        if var1 == 0 {
            return 0;
        }

        let mut p = 1_048_576 - i64::from(adc_p);
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (i64::from(self.p9) * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (i64::from(self.p8) * p) >> 19;
        p = ((p + var1 + var2) >> 8) + (i64::from(self.p7) << 4);
        p as u32
    }

    /// Relative humidity in Q22.10 %RH.
    fn humidity(&self, adc_h: i32, t_fine: i32) -> u32 {
        let v = t_fine - 76_800;
        let mut h = ((((adc_h << 14) - (i32::from(self.h4) << 20) - (i32::from(self.h5) * v))
            + 16_384)
            >> 15)
            * (((((((v * i32::from(self.h6)) >> 10)
                * (((v * i32::from(self.h3)) >> 11) + 32_768))
                >> 10)
                + 2_097_152)
                * i32::from(self.h2)
                + 8_192)
                >> 14);
        h -= ((((h >> 15) * (h >> 15)) >> 7) * i32::from(self.h1)) >> 4;
        (h.clamp(0, 419_430_400) >> 12) as u32
    }
}

#[derive(Debug, Clone, Copy)]
struct Measurement {
    temperature: f32,
    humidity: f32,
    pressure: f32,
}

pub struct Bme280<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    calibration: Calibration,
}

impl<I: I2c, D: DelayNs> Bme280<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            calibration: Calibration::default(),
        }
    }

    async fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[register], buf)
            .await
            .map_err(|e| bus_error(SENSOR, e))
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(|e| bus_error(SENSOR, e))
    }

    async fn measure(&mut self) -> Result<Measurement, SensorError> {
        let mut raw = [0u8; 8];
        self.read_registers(REG_DATA, &mut raw).await?;

        let adc_p = (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let adc_t = (i32::from(raw[3]) << 12) | (i32::from(raw[4]) << 4) | (i32::from(raw[5]) >> 4);
        let adc_h = (i32::from(raw[6]) << 8) | i32::from(raw[7]);

        // 0x80000 is what the chip reports for a skipped conversion
        if adc_t == 0x80000 {
            return Err(SensorError::ReadFailed {
                sensor: SENSOR,
                operation: "measure",
                details: "no conversion yet",
            });
        }

        let (t_fine, centi) = self.calibration.temperature(adc_t);
        Ok(Measurement {
            temperature: centi as f32 / 100.0,
            humidity: self.calibration.humidity(adc_h, t_fine) as f32 / 1024.0,
            pressure: self.calibration.pressure(adc_p, t_fine) as f32 / 256.0,
        })
    }
}

impl<I: I2c, D: DelayNs> TemperatureSensor for Bme280<I, D> {
    async fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.read_registers(REG_CHIP_ID, &mut id).await?;
        if id[0] != CHIP_ID {
            return Err(SensorError::InitializationFailed {
                sensor: SENSOR,
                details: "unexpected chip id",
            });
        }

        self.write_register(REG_RESET, SOFT_RESET).await?;
        self.delay.delay_ms(2).await;

        let mut status = [STATUS_IM_UPDATE];
        for _ in 0..10 {
            self.read_registers(REG_STATUS, &mut status).await?;
            if status[0] & STATUS_IM_UPDATE == 0 {
                break;
            }
            self.delay.delay_ms(1).await;
        }
        if status[0] & STATUS_IM_UPDATE != 0 {
            return Err(SensorError::Timeout {
                sensor: SENSOR,
                operation: "load calibration",
            });
        }

        let mut tp = [0u8; 26];
        let mut h = [0u8; 7];
        self.read_registers(REG_CALIB_00, &mut tp).await?;
        self.read_registers(REG_CALIB_26, &mut h).await?;
        self.calibration = Calibration::parse(&tp, &h);
        debug!("{SENSOR} calibration: {:?}", self.calibration);

        // ctrl_hum only takes effect after a ctrl_meas write
        self.write_register(REG_CTRL_HUM, CTRL_HUM_X1).await?;
        self.write_register(REG_CONFIG, 0x00).await?;
        self.write_register(REG_CTRL_MEAS, CTRL_MEAS_NORMAL).await?;

        // First conversion at 1x oversampling is under 10 ms
        self.delay.delay_ms(10).await;
        Ok(())
    }

    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.measure().await?.temperature)
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        Ok(self.measure().await?.humidity)
    }

    async fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(self.measure().await?.pressure)
    }
}
