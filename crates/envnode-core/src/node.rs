//! Boot sequence and the per-cycle pipeline
//!
//! ```text
//! boot:  clock ─▶ gas reset low ─▶ climate + cold start ─▶ gas reset high
//!        ─▶ gas start + idle mode ─▶ storage ─▶ SENSORS OK
//! cycle: sample ─▶ calibration check ─▶ encode ─▶ CSV ─▶ telemetry
//! ```
//!
//! All state that outlives a cycle sits in [`NodeContext`]; there are no
//! statics. Boot failures come back as [`FatalFault`]s for the caller to hand
//! to its [`crate::fault::FaultHandler`].

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::acquisition::{ReadingAcquirer, Sensors};
use crate::calibration::{CalibrationController, CalibrationStep};
use crate::config::{NodeConfig, StoragePolicy};
use crate::fault::FatalFault;
use crate::frame::{Frame, encode};
use crate::hardware::{Capability, HardwareRegistry};
use crate::reading::Reading;
use crate::sensors::{DriveMode, GasInitStatus, GasSensor, TemperatureSensor, VoltageSource};
use crate::storage::{StorageSink, format_row, log_file_name};
use crate::time_source::TimeSource;

/// State shared across cycles.
#[derive(Debug)]
pub struct NodeContext {
    pub hardware: HardwareRegistry,
    pub calibration: CalibrationController,
    startup_epoch: u32,
}

impl NodeContext {
    pub fn new(startup_epoch: u32, calibration: CalibrationController) -> Self {
        Self {
            hardware: HardwareRegistry::new(),
            calibration,
            startup_epoch,
        }
    }

    pub const fn startup_epoch(&self) -> u32 {
        self.startup_epoch
    }

    /// Seconds since boot, from wall-clock subtraction.
    ///
    /// A clock that steps backwards past the startup epoch wraps.
    pub const fn uptime_at(&self, unix_seconds: u32) -> u32 {
        unix_seconds.wrapping_sub(self.startup_epoch)
    }
}

/// Consumer of every cycle's output: serial echo, display, radio uplink.
pub trait TelemetrySink {
    fn publish(&mut self, reading: &Reading, frame: &[u8]) -> impl Future<Output = ()>;
}

impl TelemetrySink for () {
    async fn publish(&mut self, _reading: &Reading, _frame: &[u8]) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub reading: Reading,
    pub frame: Frame,
    pub calibration: CalibrationStep,
    /// Row reached the storage medium
    pub persisted: bool,
}

pub struct Node<C, T, G, V, S, D> {
    config: NodeConfig,
    ctx: NodeContext,
    sensors: Sensors<C, T, G, V>,
    storage: S,
    delay: D,
    acquirer: ReadingAcquirer,
}

impl<C, T, G, V, S, D> Node<C, T, G, V, S, D>
where
    C: TimeSource,
    T: TemperatureSensor,
    G: GasSensor,
    V: VoltageSource,
    S: StorageSink,
    D: DelayNs,
{
    /// Bring every peripheral up in order.
    ///
    /// The gas sensor is held in reset while the cold-start temperature is
    /// taken, so its heater cannot bias the baseline.
    pub async fn boot<R: OutputPin>(
        config: NodeConfig,
        mut sensors: Sensors<C, T, G, V>,
        mut storage: S,
        gas_reset: &mut R,
        mut delay: D,
    ) -> Result<Self, FatalFault> {
        let mut hardware = HardwareRegistry::new();
        let mut calibration =
            CalibrationController::new(config.warm_up_threshold_secs, config.active_drive_mode);

        if let Err(e) = sensors.clock.init().await {
            error!("{e}");
            return Err(FatalFault::TimeSource);
        }
        let startup_epoch = sensors.clock.unix_seconds().await;
        hardware.mark_available(sensors.clock.capability());
        info!(
            "{} OK, startup at {}",
            sensors.clock.capability().label(),
            startup_epoch
        );

        if gas_reset.set_low().is_err() {
            warn!("gas sensor reset line did not go low");
        }

        if let Err(e) = sensors.climate.init().await {
            error!("{e}");
            return Err(FatalFault::TempHumidityPressure);
        }
        let cold_start = match sensors.climate.read_temperature().await {
            Ok(t) => t,
            Err(e) => {
                error!("{e}");
                return Err(FatalFault::TempHumidityPressure);
            }
        };
        calibration.capture_cold_start(cold_start);
        hardware.mark_available(Capability::TempHumidityPressure);
        info!("BME280 OK, cold start {:.2}C", cold_start);

        if gas_reset.set_high().is_err() {
            warn!("gas sensor reset line did not go high");
        }

        let status = sensors.gas.init().await;
        if status != GasInitStatus::Success {
            error!("CCS811 start failed: {:?}", status);
            return Err(FatalFault::GasSensor {
                status: status.code(),
            });
        }
        delay.delay_ms(config.gas_init_settle_ms).await;
        if let Err(e) = sensors.gas.set_drive_mode(DriveMode::Idle).await {
            warn!("{e}");
        }
        calibration.arm();
        info!(
            "CCS811 OK, calibrating after {}s",
            config.warm_up_threshold_secs
        );

        match config.variant.storage_policy() {
            StoragePolicy::Absent => {}
            StoragePolicy::Required => {
                if let Err(e) = storage.init().await {
                    error!("{e}");
                    return Err(FatalFault::Storage);
                }
                hardware.mark_available(Capability::Storage);
            }
            StoragePolicy::Optional => match storage.init().await {
                Ok(()) => {
                    hardware.mark_available(Capability::Storage);
                }
                Err(e) => warn!("{e}, continuing without storage"),
            },
        }

        let mut ctx = NodeContext::new(startup_epoch, calibration);
        ctx.hardware = hardware;

        info!("SENSORS OK");
        info!("hardware: {}", ctx.hardware.snapshot());

        Ok(Self {
            config,
            ctx,
            sensors,
            storage,
            delay,
            acquirer: ReadingAcquirer::new(config.voltage_scale),
        })
    }

    /// One full `sample → calibrate → encode → persist → publish` pass.
    ///
    /// Run-time faults never end the cycle early.
    pub async fn run_cycle<M: TelemetrySink>(&mut self, telemetry: &mut M) -> CycleReport {
        let reading = self
            .acquirer
            .sample(&self.ctx, &mut self.sensors, &mut self.delay)
            .await;

        embassy_futures::yield_now().await;

        let calibration = self
            .ctx
            .calibration
            .maybe_advance(
                reading.uptime,
                &mut self.ctx.hardware,
                &mut self.sensors.climate,
                &mut self.sensors.gas,
            )
            .await;

        let frame = encode(&reading);
        let persisted = self.persist(&reading).await;
        telemetry.publish(&reading, frame.as_bytes()).await;

        CycleReport {
            reading,
            frame,
            calibration,
            persisted,
        }
    }

    async fn persist(&mut self, reading: &Reading) -> bool {
        let row = match format_row(reading) {
            Ok(row) => row,
            Err(e) => {
                warn!("{e}");
                return false;
            }
        };
        debug!("{}", row.trim_end());

        if !self.ctx.hardware.is_available(Capability::Storage) {
            return false;
        }

        let result = match log_file_name(&reading.timestamp) {
            Ok(path) => self.storage.append_row(&path, row.as_bytes()).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("WR FAILED: {e}");
                false
            }
        }
    }

    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub const fn context(&self) -> &NodeContext {
        &self.ctx
    }

    pub fn sensors_mut(&mut self) -> &mut Sensors<C, T, G, V> {
        &mut self.sensors
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
