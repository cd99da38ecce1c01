//! Gas sensor thermal compensation
//!
//! The gas sensor's heater warms the co-located temperature sensor. The
//! controller records the temperature before the heater starts, waits out the
//! sensor's burn-in, and then fixes the difference as a permanent offset that
//! every later reading subtracts.
//!
//! ```text
//! Uninitialized ──cold start read──▶ ColdStartCaptured ──gas init ok──▶ Pending
//!                                                                          │
//!                        uptime ≥ threshold and status register clean      │
//!                                                                          ▼
//!                                                                Calibrated(offset)
//! ```
//!
//! `Calibrated` is terminal until power is lost.

use log::{info, warn};

use crate::hardware::{Capability, HardwareRegistry};
use crate::sensors::{DriveMode, GasSensor, TemperatureSensor, describe_status};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    Uninitialized,
    ColdStartCaptured { cold_start: f32 },
    /// Gas sensor is up and burning in
    Pending { cold_start: f32 },
    Calibrated { cold_start: f32, offset: f32 },
}

/// Outcome of one [`CalibrationController::maybe_advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// The gas sensor never came up; nothing to calibrate
    Inactive,
    WarmingUp { remaining_secs: u32 },
    /// Status register flagged an error; retried next cycle
    SensorFault { status: u8 },
    /// Temperature read failed; retried next cycle
    TemperatureUnavailable,
    /// Switching to the active drive mode failed; retried next cycle
    DriveModeFailed,
    /// Transition taken during this call
    Calibrated { offset: f32 },
    AlreadyCalibrated,
}

#[derive(Debug, Clone)]
pub struct CalibrationController {
    state: CalibrationState,
    warm_up_threshold_secs: u32,
    active_mode: DriveMode,
}

impl CalibrationController {
    pub const fn new(warm_up_threshold_secs: u32, active_mode: DriveMode) -> Self {
        Self {
            state: CalibrationState::Uninitialized,
            warm_up_threshold_secs,
            active_mode,
        }
    }

    pub const fn state(&self) -> CalibrationState {
        self.state
    }

    pub const fn warm_up_threshold_secs(&self) -> u32 {
        self.warm_up_threshold_secs
    }

    /// Record the pre-heat temperature. Only the first capture counts.
    pub fn capture_cold_start(&mut self, temperature: f32) -> bool {
        match self.state {
            CalibrationState::Uninitialized => {
                self.state = CalibrationState::ColdStartCaptured {
                    cold_start: temperature,
                };
                true
            }
            _ => false,
        }
    }

    /// The gas sensor started; begin waiting for burn-in.
    pub fn arm(&mut self) -> bool {
        match self.state {
            CalibrationState::ColdStartCaptured { cold_start } => {
                self.state = CalibrationState::Pending { cold_start };
                true
            }
            _ => false,
        }
    }

    pub const fn cold_start_temperature(&self) -> Option<f32> {
        match self.state {
            CalibrationState::Uninitialized => None,
            CalibrationState::ColdStartCaptured { cold_start }
            | CalibrationState::Pending { cold_start }
            | CalibrationState::Calibrated { cold_start, .. } => Some(cold_start),
        }
    }

    /// Offset subtracted from temperature readings, 0.0 until calibrated
    pub const fn offset(&self) -> f32 {
        match self.state {
            CalibrationState::Calibrated { offset, .. } => offset,
            _ => 0.0,
        }
    }

    pub const fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated { .. })
    }

    /// Attempt the `Pending → Calibrated` transition.
    ///
    /// Called once per cycle. Below the warm-up threshold no peripheral is
    /// touched. Past it, a clean status register, a temperature read and the
    /// drive mode switch must all succeed in this call; any failure leaves the
    /// controller `Pending` for the next cycle.
    pub async fn maybe_advance<C, G>(
        &mut self,
        uptime: u32,
        hardware: &mut HardwareRegistry,
        climate: &mut C,
        gas: &mut G,
    ) -> CalibrationStep
    where
        C: TemperatureSensor,
        G: GasSensor,
    {
        let cold_start = match self.state {
            CalibrationState::Calibrated { .. } => return CalibrationStep::AlreadyCalibrated,
            CalibrationState::Pending { cold_start } => cold_start,
            _ => return CalibrationStep::Inactive,
        };

        if uptime < self.warm_up_threshold_secs {
            return CalibrationStep::WarmingUp {
                remaining_secs: self.warm_up_threshold_secs - uptime,
            };
        }

        if gas.check_status_error().await {
            let status = gas.status_register().await;
            warn!("CCS811 status error {}: {}", status, describe_status(status));
            return CalibrationStep::SensorFault { status };
        }

        let current = match climate.read_temperature().await {
            Ok(t) => t,
            Err(e) => {
                warn!("calibration temperature read failed: {e}");
                return CalibrationStep::TemperatureUnavailable;
            }
        };

        if let Err(e) = gas.set_drive_mode(self.active_mode).await {
            warn!("calibration drive mode switch failed: {e}");
            return CalibrationStep::DriveModeFailed;
        }

        let offset = current - cold_start;
        self.state = CalibrationState::Calibrated { cold_start, offset };
        hardware.mark_available(Capability::GasSensor);
        info!(
            "gas sensor calibrated at {}s: offset {:.2}C (cold start {:.2}C)",
            uptime, offset, cold_start
        );

        CalibrationStep::Calibrated { offset }
    }
}
