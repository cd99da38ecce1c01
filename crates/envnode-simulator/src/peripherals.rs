//! Synthetic peripherals driven by one simulated clock
//!
//! Nothing here sleeps for real unless `time_scale` asks for it: every delay
//! advances [`SimTime`], and all sensors derive their values from it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use envnode_core::hardware::Capability;
use envnode_core::schedule::SleepPrimitive;
use envnode_core::sensors::{
    DriveMode, GasInitStatus, GasResults, GasSensor, SensorError, TemperatureSensor, VoltageSource,
};
use envnode_core::time_source::{FixCell, GpsFix, TimeSource, WallClock};
use log::trace;

use crate::settings::Simulation;

/// Longest stretch one [`SimSleep`] call covers, like a watchdog wake-up
pub const SLEEP_CHUNK_MS: u32 = 8_000;

/// Stands in for the NMEA task: publishes a fix snapshot whenever time moves.
struct GpsFeed {
    cell: &'static FixCell,
    fix_after_secs: u32,
    satellites: u8,
}

struct Inner {
    start_unix: u32,
    elapsed_us: Cell<u64>,
    time_scale: f64,
    gps: Option<GpsFeed>,
}

/// Shared simulated time since power-on.
#[derive(Clone)]
pub struct SimTime(Rc<Inner>);

impl SimTime {
    pub fn new(start_unix: u32, time_scale: f64) -> Self {
        Self(Rc::new(Inner {
            start_unix,
            elapsed_us: Cell::new(0),
            time_scale,
            gps: None,
        }))
    }

    /// Time that also feeds `cell` the way a receiver would: no valid fix
    /// for the first `fix_after_secs`, satellites trickling in meanwhile.
    pub fn with_gps(start_unix: u32, time_scale: f64, cell: &'static FixCell, fix_after_secs: u32, satellites: u8) -> Self {
        let time = Self(Rc::new(Inner {
            start_unix,
            elapsed_us: Cell::new(0),
            time_scale,
            gps: Some(GpsFeed {
                cell,
                fix_after_secs,
                satellites,
            }),
        }));
        time.publish_fix();
        time
    }

    pub fn elapsed_secs(&self) -> u32 {
        u32::try_from(self.0.elapsed_us.get() / 1_000_000).unwrap_or(u32::MAX)
    }

    pub fn unix_seconds(&self) -> u32 {
        self.0.start_unix.saturating_add(self.elapsed_secs())
    }

    pub fn advance_us(&self, us: u64) {
        self.0.elapsed_us.set(self.0.elapsed_us.get() + us);
        if self.0.time_scale > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(us as f64 / 1e6 / self.0.time_scale));
        }
        self.publish_fix();
    }

    fn publish_fix(&self) {
        let Some(feed) = &self.0.gps else {
            return;
        };

        let elapsed = self.elapsed_secs();
        let valid = elapsed >= feed.fix_after_secs;
        let satellites = if valid {
            feed.satellites
        } else {
            let seen = u32::from(feed.satellites) * elapsed / feed.fix_after_secs.max(1);
            u8::try_from(seen).unwrap_or(feed.satellites)
        };

        feed.cell.publish(GpsFix {
            time: WallClock::from_unix_seconds(self.unix_seconds()).unwrap_or(WallClock::EPOCH),
            valid,
            satellites,
        });
    }
}

#[derive(Clone)]
pub struct SimDelay(pub SimTime);

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.advance_us(u64::from(ns).div_ceil(1_000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.0.advance_us(u64::from(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.advance_us(u64::from(ms) * 1_000);
    }
}

pub struct SimSleep(pub SimTime);

impl SleepPrimitive for SimSleep {
    async fn sleep(&mut self, ms: u32) -> u32 {
        let slice = ms.min(SLEEP_CHUNK_MS);
        self.0.advance_us(u64::from(slice) * 1_000);
        slice
    }
}

/// GPIO line that only logs its edges.
pub struct SimPin {
    name: &'static str,
}

impl SimPin {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        trace!("{} low", self.name);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        trace!("{} high", self.name);
        Ok(())
    }
}

/// Battery-backed RTC that was set before power-on.
pub struct SimClock(pub SimTime);

impl TimeSource for SimClock {
    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn now(&mut self) -> WallClock {
        WallClock::from_unix_seconds(self.0.unix_seconds()).unwrap_or(WallClock::EPOCH)
    }

    fn capability(&self) -> Capability {
        Capability::TimeSource
    }
}

/// Temperature sensor that picks up heat from the gas sensor.
///
/// The bias ramps linearly from zero to `heater_bias_c` over
/// `heater_ramp_secs` once the gas sensor leaves reset.
pub struct SimClimate {
    time: SimTime,
    ambient_c: f32,
    heater_bias_c: f32,
    heater_ramp_secs: u32,
    heater_since: Rc<Cell<Option<u32>>>,
}

impl SimClimate {
    pub fn new(time: SimTime, sim: &Simulation, gas: &SimGas) -> Self {
        Self {
            time,
            ambient_c: sim.ambient_c,
            heater_bias_c: sim.heater_bias_c,
            heater_ramp_secs: sim.heater_ramp_secs,
            heater_since: gas.heater_since.clone(),
        }
    }

    fn phase(&self) -> f32 {
        self.time.elapsed_secs() as f32 / 3_600.0 * core::f32::consts::TAU
    }

    pub fn heater_bias(&self) -> f32 {
        let Some(since) = self.heater_since.get() else {
            return 0.0;
        };
        let warm = self.time.elapsed_secs().saturating_sub(since) as f32;
        let ramp = warm / self.heater_ramp_secs.max(1) as f32;
        self.heater_bias_c * ramp.min(1.0)
    }
}

impl TemperatureSensor for SimClimate {
    async fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let drift = 0.3 * self.phase().sin();
        Ok(self.ambient_c + drift + self.heater_bias())
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        Ok(45.0 + 5.0 * self.phase().cos())
    }

    async fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(101_325.0 + 150.0 * self.phase().sin())
    }
}

/// Gas sensor whose heater starts with `init` and which reports results
/// once it has spent `gas_ready_after_secs` in an active drive mode.
pub struct SimGas {
    time: SimTime,
    ready_after_secs: u32,
    active_since: Option<u32>,
    heater_since: Rc<Cell<Option<u32>>>,
    env: Option<(f32, f32)>,
}

impl SimGas {
    pub fn new(time: SimTime, sim: &Simulation) -> Self {
        Self {
            time,
            ready_after_secs: sim.gas_ready_after_secs,
            active_since: None,
            heater_since: Rc::new(Cell::new(None)),
            env: None,
        }
    }
}

impl GasSensor for SimGas {
    async fn init(&mut self) -> GasInitStatus {
        self.heater_since.set(Some(self.time.elapsed_secs()));
        GasInitStatus::Success
    }

    async fn set_drive_mode(&mut self, mode: DriveMode) -> Result<(), SensorError> {
        self.active_since = (mode != DriveMode::Idle).then(|| self.time.elapsed_secs());
        Ok(())
    }

    async fn set_environmental_data(&mut self, humidity: f32, temperature: f32) -> Result<(), SensorError> {
        trace!("gas compensation: {humidity:.1}%RH {temperature:.2}C");
        self.env = Some((humidity, temperature));
        Ok(())
    }

    async fn data_available(&mut self) -> bool {
        self.active_since
            .is_some_and(|since| self.time.elapsed_secs().saturating_sub(since) >= self.ready_after_secs)
    }

    async fn read_results(&mut self) -> Result<GasResults, SensorError> {
        let since = self.active_since.unwrap_or(0);
        let minutes = self.time.elapsed_secs().saturating_sub(since) / 60;
        // Readings drift up slowly, as they do in an occupied room
        let co2 = 400 + (minutes * 3).min(800);
        let humidity = self.env.map_or(45.0, |(h, _)| h);
        Ok(GasResults {
            co2: u16::try_from(co2).unwrap_or(u16::MAX),
            tvoc: (humidity / 5.0) as u16 + u16::try_from(minutes.min(50)).unwrap_or(0),
        })
    }

    async fn check_status_error(&mut self) -> bool {
        false
    }

    async fn status_register(&mut self) -> u8 {
        0
    }
}

/// Supply rail with a little conversion noise.
pub struct SimAdc {
    raw: u16,
    step: u16,
}

impl SimAdc {
    pub const fn new(raw: u16) -> Self {
        Self { raw, step: 0 }
    }
}

impl VoltageSource for SimAdc {
    fn read_raw(&mut self) -> u16 {
        self.step = self.step.wrapping_add(1);
        // -2..=+2 counts, averages out over ten conversions
        let noise = (self.step % 5) as i32 - 2;
        (i32::from(self.raw) + noise).clamp(0, 1023) as u16
    }
}
