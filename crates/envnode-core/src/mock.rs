//! Scripted peripherals for unit tests
//!
//! Every double appends to a shared [`CallLog`] so tests can assert on the
//! order in which the engine touches hardware.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::hardware::Capability;
use crate::node::TelemetrySink;
use crate::reading::Reading;
use crate::schedule::SleepPrimitive;
use crate::sensors::{
    DriveMode, GasInitStatus, GasResults, GasSensor, SensorError, TemperatureSensor, VoltageSource,
};
use crate::storage::{StorageError, StorageSink};
use crate::time_source::{GpsStatus, TimeSource, WallClock};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    ClockInit,
    ClockNow,
    ClimateInit,
    Temperature,
    Humidity,
    Pressure,
    GasInit,
    DriveMode(DriveMode),
    EnvData { humidity: f32, temperature: f32 },
    DataAvailable,
    ReadResults,
    StatusCheck,
    StatusRegister,
    AdcRead,
    StorageInit,
    Append { len: usize },
    Pin(bool),
    DelayMs(u32),
    DelayUs(u32),
    DelayNs(u32),
    Sleep { requested: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.borrow().iter().position(|c| pred(c))
    }
}

fn scripted_failure(sensor: &'static str) -> SensorError {
    SensorError::ReadFailed {
        sensor,
        operation: "read",
        details: "scripted failure",
    }
}

pub struct MockClock {
    log: CallLog,
    pub unix: u32,
    pub capability: Capability,
    pub gps: Option<GpsStatus>,
    pub fail_init: bool,
}

impl MockClock {
    pub fn at(log: &CallLog, unix: u32) -> Self {
        Self {
            log: log.clone(),
            unix,
            capability: Capability::TimeSource,
            gps: None,
            fail_init: false,
        }
    }
}

impl TimeSource for MockClock {
    async fn init(&mut self) -> Result<(), SensorError> {
        self.log.push(Call::ClockInit);
        if self.fail_init {
            return Err(SensorError::InitializationFailed {
                sensor: "clock",
                details: "scripted failure",
            });
        }
        Ok(())
    }

    async fn now(&mut self) -> WallClock {
        self.log.push(Call::ClockNow);
        WallClock::from_unix_seconds(self.unix).unwrap_or(WallClock::EPOCH)
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn gps_status(&self) -> Option<GpsStatus> {
        self.gps
    }
}

pub struct MockClimate {
    log: CallLog,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub fail_init: bool,
    pub fail_reads: bool,
}

impl MockClimate {
    pub fn new(log: &CallLog, temperature: f32) -> Self {
        Self {
            log: log.clone(),
            temperature,
            humidity: 40.0,
            pressure: 101_000.0,
            fail_init: false,
            fail_reads: false,
        }
    }

    fn value(&self, value: f32) -> Result<f32, SensorError> {
        if self.fail_reads {
            Err(scripted_failure("climate"))
        } else {
            Ok(value)
        }
    }
}

impl TemperatureSensor for MockClimate {
    async fn init(&mut self) -> Result<(), SensorError> {
        self.log.push(Call::ClimateInit);
        if self.fail_init {
            return Err(SensorError::InitializationFailed {
                sensor: "climate",
                details: "scripted failure",
            });
        }
        Ok(())
    }

    async fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.log.push(Call::Temperature);
        self.value(self.temperature)
    }

    async fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.log.push(Call::Humidity);
        self.value(self.humidity)
    }

    async fn read_pressure(&mut self) -> Result<f32, SensorError> {
        self.log.push(Call::Pressure);
        self.value(self.pressure)
    }
}

pub struct MockGas {
    log: CallLog,
    pub init_status: GasInitStatus,
    pub status_error: bool,
    pub register: u8,
    pub ready: bool,
    pub results: GasResults,
    pub drive_mode: Option<DriveMode>,
    pub fail_drive_mode: bool,
    /// Last (humidity, temperature) pushed
    pub env: Option<(f32, f32)>,
}

impl MockGas {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            init_status: GasInitStatus::Success,
            status_error: false,
            register: 0,
            ready: false,
            results: GasResults::default(),
            drive_mode: None,
            fail_drive_mode: false,
            env: None,
        }
    }
}

impl GasSensor for MockGas {
    async fn init(&mut self) -> GasInitStatus {
        self.log.push(Call::GasInit);
        self.init_status
    }

    async fn set_drive_mode(&mut self, mode: DriveMode) -> Result<(), SensorError> {
        self.log.push(Call::DriveMode(mode));
        if self.fail_drive_mode {
            return Err(scripted_failure("gas"));
        }
        self.drive_mode = Some(mode);
        Ok(())
    }

    async fn set_environmental_data(&mut self, humidity: f32, temperature: f32) -> Result<(), SensorError> {
        self.log.push(Call::EnvData {
            humidity,
            temperature,
        });
        self.env = Some((humidity, temperature));
        Ok(())
    }

    async fn data_available(&mut self) -> bool {
        self.log.push(Call::DataAvailable);
        self.ready
    }

    async fn read_results(&mut self) -> Result<GasResults, SensorError> {
        self.log.push(Call::ReadResults);
        Ok(self.results)
    }

    async fn check_status_error(&mut self) -> bool {
        self.log.push(Call::StatusCheck);
        self.status_error
    }

    async fn status_register(&mut self) -> u8 {
        self.log.push(Call::StatusRegister);
        self.register
    }
}

/// Cycles through a fixed list of conversions.
pub struct MockAdc {
    log: CallLog,
    values: Vec<u16>,
    next: usize,
}

impl MockAdc {
    pub fn sequence(log: &CallLog, values: &[u16]) -> Self {
        Self {
            log: log.clone(),
            values: values.to_vec(),
            next: 0,
        }
    }

    pub fn constant(log: &CallLog, value: u16) -> Self {
        Self {
            log: log.clone(),
            values: vec![value],
            next: 0,
        }
    }
}

impl VoltageSource for MockAdc {
    fn read_raw(&mut self) -> u16 {
        self.log.push(Call::AdcRead);
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}

pub struct MockStorage {
    log: CallLog,
    pub fail_init: bool,
    pub fail_writes: bool,
    pub rows: Vec<(String, Vec<u8>)>,
}

impl MockStorage {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail_init: false,
            fail_writes: false,
            rows: Vec::new(),
        }
    }
}

impl StorageSink for MockStorage {
    async fn init(&mut self) -> Result<(), StorageError> {
        self.log.push(Call::StorageInit);
        if self.fail_init {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }

    async fn append_row(&mut self, path: &str, row: &[u8]) -> Result<(), StorageError> {
        self.log.push(Call::Append { len: row.len() });
        if self.fail_writes {
            return Err(StorageError::Write);
        }
        self.rows.push((String::from(path), row.to_vec()));
        Ok(())
    }
}

/// Delay that returns immediately and records what was asked for.
#[derive(Clone)]
pub struct RecordingDelay {
    log: CallLog,
    total_ns: Rc<Cell<u64>>,
}

impl RecordingDelay {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            total_ns: Rc::new(Cell::new(0)),
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns.get() / 1_000_000
    }

    fn add(&self, ns: u64) {
        self.total_ns.set(self.total_ns.get() + ns);
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.log.push(Call::DelayNs(ns));
        self.add(u64::from(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.log.push(Call::DelayUs(us));
        self.add(u64::from(us) * 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.log.push(Call::DelayMs(ms));
        self.add(u64::from(ms) * 1_000_000);
    }
}

pub struct RecordingPin {
    log: CallLog,
    high: bool,
}

impl RecordingPin {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            high: false,
        }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.push(Call::Pin(false));
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.push(Call::Pin(true));
        self.high = true;
        Ok(())
    }
}

/// Sleep that wakes after at most `chunk_ms`.
pub struct ChunkedSleep {
    log: CallLog,
    chunk_ms: u32,
    total_ms: u64,
}

impl ChunkedSleep {
    pub fn new(log: &CallLog, chunk_ms: u32) -> Self {
        Self {
            log: log.clone(),
            chunk_ms,
            total_ms: 0,
        }
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }
}

impl SleepPrimitive for ChunkedSleep {
    async fn sleep(&mut self, ms: u32) -> u32 {
        self.log.push(Call::Sleep { requested: ms });
        let slept = ms.min(self.chunk_ms);
        self.total_ms += u64::from(slept);
        slept
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub readings: Vec<Reading>,
    pub frames: Vec<Vec<u8>>,
}

impl TelemetrySink for RecordingTelemetry {
    async fn publish(&mut self, reading: &Reading, frame: &[u8]) {
        self.readings.push(*reading);
        self.frames.push(frame.to_vec());
    }
}
