//! One sampling pass over whatever peripherals are present

use embedded_hal_async::delay::DelayNs;
use log::warn;

use crate::hardware::Capability;
use crate::node::NodeContext;
use crate::reading::{GAS_SENTINEL, GAS_STATUS_OK, GasValues, Reading};
use crate::sensors::{GasSensor, TemperatureSensor, VoltageSource};
use crate::time_source::TimeSource;
use crate::voltage::{VoltageScale, sample_voltage};

/// The node's peripherals, grouped so the engine can borrow them together.
pub struct Sensors<C, T, G, V> {
    pub clock: C,
    pub climate: T,
    pub gas: G,
    pub voltage: V,
}

/// Assembles [`Reading`]s.
///
/// Gas values persist between passes: a cycle in which the sensor has no new
/// result repeats the previous CO2/TVOC pair.
#[derive(Debug, Clone)]
pub struct ReadingAcquirer {
    previous_gas: GasValues,
    voltage_scale: VoltageScale,
}

struct Climate {
    raw_temperature: f32,
    temperature: f32,
    humidity: f32,
    pressure: f32,
}

impl ReadingAcquirer {
    pub const fn new(voltage_scale: VoltageScale) -> Self {
        Self {
            previous_gas: GasValues::ABSENT,
            voltage_scale,
        }
    }

    pub const fn previous_gas(&self) -> GasValues {
        self.previous_gas
    }

    pub async fn sample<C, T, G, V, D>(
        &mut self,
        ctx: &NodeContext,
        sensors: &mut Sensors<C, T, G, V>,
        delay: &mut D,
    ) -> Reading
    where
        C: TimeSource,
        T: TemperatureSensor,
        G: GasSensor,
        V: VoltageSource,
        D: DelayNs,
    {
        let timestamp = sensors.clock.now().await;
        let uptime = ctx.uptime_at(timestamp.to_unix_seconds().unwrap_or(0));
        let hardware = ctx.hardware.snapshot();
        let gps = sensors.clock.gps_status();
        let voltage = sample_voltage(&mut sensors.voltage, delay, self.voltage_scale).await;

        let calibrated = ctx.calibration.is_calibrated();
        let calibration_offset = ctx.calibration.offset();

        embassy_futures::yield_now().await;

        let climate = if hardware.contains(Capability::TempHumidityPressure) {
            Some(read_climate(&mut sensors.climate, calibration_offset).await)
        } else {
            None
        };

        embassy_futures::yield_now().await;

        let gas = if hardware.contains(Capability::GasSensor) {
            self.read_gas(&mut sensors.gas, climate.as_ref()).await
        } else {
            GasValues::ABSENT
        };
        self.previous_gas = gas;

        let climate = climate.unwrap_or(Climate {
            raw_temperature: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
        });

        Reading {
            timestamp,
            uptime,
            hardware,
            temperature: climate.temperature,
            raw_temperature: climate.raw_temperature,
            calibration_offset,
            calibrated,
            humidity: climate.humidity,
            pressure: climate.pressure,
            gas,
            voltage,
            gps,
        }
    }

    async fn read_gas<G: GasSensor>(&self, gas: &mut G, climate: Option<&Climate>) -> GasValues {
        // Compensation input must reach the sensor before this cycle's result is consumed
        if let Some(climate) = climate {
            if let Err(e) = gas
                .set_environmental_data(climate.humidity, climate.temperature)
                .await
            {
                warn!("{e}");
            }
        }

        let mut values = self.previous_gas;
        if gas.data_available().await {
            match gas.read_results().await {
                Ok(results) => {
                    values.co2 = i32::from(results.co2);
                    values.tvoc = i32::from(results.tvoc);
                }
                Err(e) => warn!("{e}"),
            }
        }

        if gas.check_status_error().await {
            values.status = gas.status_register().await;
            values.co2 = GAS_SENTINEL;
            values.tvoc = GAS_SENTINEL;
        } else {
            values.status = GAS_STATUS_OK;
        }

        values
    }
}

/// A failed read leaves that quantity at 0.0.
async fn read_climate<T: TemperatureSensor>(sensor: &mut T, offset: f32) -> Climate {
    let (raw_temperature, temperature) = match sensor.read_temperature().await {
        Ok(raw) => (raw, raw - offset),
        Err(e) => {
            warn!("{e}");
            (0.0, 0.0)
        }
    };
    let humidity = sensor.read_humidity().await.unwrap_or_else(|e| {
        warn!("{e}");
        0.0
    });
    let pressure = sensor.read_pressure().await.unwrap_or_else(|e| {
        warn!("{e}");
        0.0
    });

    Climate {
        raw_temperature,
        temperature,
        humidity,
        pressure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationController;
    use crate::mock::{Call, CallLog, MockAdc, MockClimate, MockClock, MockGas, RecordingDelay};
    use crate::reading::GAS_STATUS_ABSENT;
    use crate::sensors::{DriveMode, GasResults};
    use crate::time_source::WallClock;
    use embassy_futures::block_on;

    const STARTUP: u32 = 1_623_760_000;

    type MockSensors = Sensors<MockClock, MockClimate, MockGas, MockAdc>;

    fn setup(log: &CallLog) -> (NodeContext, MockSensors, RecordingDelay) {
        let mut calibration = CalibrationController::new(1200, DriveMode::EveryTenSeconds);
        calibration.capture_cold_start(22.0);
        calibration.arm();
        let mut ctx = NodeContext::new(STARTUP, calibration);
        ctx.hardware.mark_available(Capability::TimeSource);
        ctx.hardware.mark_available(Capability::TempHumidityPressure);

        let sensors = Sensors {
            clock: MockClock::at(log, STARTUP + 245),
            climate: MockClimate::new(log, 26.5),
            gas: MockGas::new(log),
            voltage: MockAdc::constant(log, 935),
        };
        (ctx, sensors, RecordingDelay::new(log))
    }

    fn calibrate(ctx: &mut NodeContext, sensors: &mut MockSensors) {
        let NodeContext {
            hardware,
            calibration,
            ..
        } = ctx;
        block_on(calibration.maybe_advance(1200, hardware, &mut sensors.climate, &mut sensors.gas));
    }

    #[test]
    fn test_baseline_fields() {
        let log = CallLog::new();
        let (ctx, mut sensors, mut delay) = setup(&log);
        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);

        let reading = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        assert_eq!(reading.timestamp, WallClock::new(2021, 6, 15, 12, 30, 45));
        assert_eq!(reading.uptime, 245);
        assert_eq!(reading.hardware.bits(), 0b0101);
        assert_eq!(reading.voltage, 187);
        assert_eq!(reading.temperature, 26.5);
        assert_eq!(reading.raw_temperature, 26.5);
        assert_eq!(reading.humidity, 40.0);
        assert_eq!(reading.pressure, 101_000.0);
        assert!(!reading.calibrated);
        assert_eq!(reading.calibration_offset, 0.0);
        assert_eq!(reading.gps, None);
    }

    #[test]
    fn test_gas_sentinels_until_available() {
        let log = CallLog::new();
        let (ctx, mut sensors, mut delay) = setup(&log);
        sensors.gas.ready = true;
        sensors.gas.results = GasResults { co2: 600, tvoc: 40 };
        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);

        for _ in 0..3 {
            let reading = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));
            assert_eq!(reading.gas.co2, -1);
            assert_eq!(reading.gas.tvoc, -1);
            assert_eq!(reading.gas.status, GAS_STATUS_ABSENT);
        }

        let gas_calls = log.count(|c| {
            matches!(
                c,
                Call::EnvData { .. } | Call::DataAvailable | Call::ReadResults | Call::StatusCheck
            )
        });
        assert_eq!(gas_calls, 0);
    }

    #[test]
    fn test_env_push_precedes_gas_read() {
        let log = CallLog::new();
        let (mut ctx, mut sensors, mut delay) = setup(&log);
        calibrate(&mut ctx, &mut sensors);
        sensors.gas.ready = true;
        sensors.gas.results = GasResults { co2: 600, tvoc: 40 };
        log.clear();

        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);
        let reading = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        let env = log.position(|c| matches!(c, Call::EnvData { .. })).unwrap();
        let ready = log.position(|c| *c == Call::DataAvailable).unwrap();
        let read = log.position(|c| *c == Call::ReadResults).unwrap();
        assert!(env < ready && ready < read);

        // Compensation uses the adjusted temperature
        assert_eq!(sensors.gas.env, Some((40.0, 22.0)));
        assert_eq!(reading.temperature, 22.0);
        assert_eq!(reading.raw_temperature, 26.5);
        assert_eq!(reading.calibration_offset, 4.5);
        assert!(reading.calibrated);
        assert_eq!(reading.gas.co2, 600);
        assert_eq!(reading.gas.tvoc, 40);
        assert_eq!(reading.gas.status, 0);
    }

    #[test]
    fn test_no_env_push_without_climate_sensor() {
        let log = CallLog::new();
        let (mut ctx, mut sensors, mut delay) = setup(&log);
        calibrate(&mut ctx, &mut sensors);

        let mut bare = NodeContext::new(STARTUP, ctx.calibration.clone());
        bare.hardware.mark_available(Capability::TimeSource);
        bare.hardware.mark_available(Capability::GasSensor);
        sensors.gas.ready = true;
        log.clear();

        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);
        let reading = block_on(acquirer.sample(&bare, &mut sensors, &mut delay));

        assert_eq!(log.count(|c| matches!(c, Call::EnvData { .. })), 0);
        assert_eq!(log.count(|c| *c == Call::Temperature), 0);
        assert_eq!(reading.temperature, 0.0);
        assert_eq!(reading.humidity, 0.0);
        assert_eq!(reading.gas.status, 0);
    }

    #[test]
    fn test_values_carry_over_when_not_ready() {
        let log = CallLog::new();
        let (mut ctx, mut sensors, mut delay) = setup(&log);
        calibrate(&mut ctx, &mut sensors);
        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);

        sensors.gas.ready = true;
        sensors.gas.results = GasResults { co2: 600, tvoc: 40 };
        let first = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        sensors.gas.ready = false;
        sensors.gas.results = GasResults { co2: 900, tvoc: 90 };
        log.clear();
        let second = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        assert_eq!(log.count(|c| *c == Call::ReadResults), 0);
        assert_eq!((second.gas.co2, second.gas.tvoc), (first.gas.co2, first.gas.tvoc));
        assert_eq!(second.gas.status, 0);
    }

    #[test]
    fn test_status_error_sets_sentinels_and_code() {
        let log = CallLog::new();
        let (mut ctx, mut sensors, mut delay) = setup(&log);
        calibrate(&mut ctx, &mut sensors);
        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);

        sensors.gas.ready = true;
        sensors.gas.results = GasResults { co2: 600, tvoc: 40 };
        sensors.gas.status_error = true;
        sensors.gas.register = 0x02;
        let faulted = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        assert_eq!(faulted.gas.co2, -1);
        assert_eq!(faulted.gas.tvoc, -1);
        assert_eq!(faulted.gas.status, 0x02);

        // Status reflects only the current check
        sensors.gas.status_error = false;
        sensors.gas.ready = false;
        let recovered = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));
        assert_eq!(recovered.gas.status, 0);
        assert_eq!((recovered.gas.co2, recovered.gas.tvoc), (-1, -1));
    }

    #[test]
    fn test_failed_climate_reads_are_zeroed() {
        let log = CallLog::new();
        let (ctx, mut sensors, mut delay) = setup(&log);
        sensors.climate.fail_reads = true;
        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);

        let reading = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        assert_eq!(reading.temperature, 0.0);
        assert_eq!(reading.humidity, 0.0);
        assert_eq!(reading.pressure, 0.0);
        assert_eq!(reading.voltage, 187);
    }

    #[test]
    fn test_failed_read_after_calibration_keeps_raw_at_zero() {
        let log = CallLog::new();
        let (mut ctx, mut sensors, mut delay) = setup(&log);
        calibrate(&mut ctx, &mut sensors);
        sensors.climate.fail_reads = true;
        let mut acquirer = ReadingAcquirer::new(VoltageScale::HalfDivider);

        let reading = block_on(acquirer.sample(&ctx, &mut sensors, &mut delay));

        assert!(reading.calibrated);
        assert_eq!(reading.calibration_offset, 4.5);
        assert_eq!(reading.temperature, 0.0);
        assert_eq!(reading.raw_temperature, 0.0);
    }
}
