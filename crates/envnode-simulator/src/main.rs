//! Desktop simulator for the envnode sensor node.
//!
//! Boots the real engine from `envnode-core` against synthetic peripherals
//! and runs a configurable number of cycles on simulated time. The gas
//! sensor's heater warms the temperature sensor, so the calibration offset
//! can be watched converging on `heater_bias_c`.
//!
//! Settings come from `configs/default.toml`, or from the file named by
//! `ENVNODE_SIM_CONFIG`. `RUST_LOG` overrides the configured log level.

mod peripherals;
mod settings;
mod sinks;

use std::process::ExitCode;

use embassy_futures::block_on;
use envnode_core::acquisition::Sensors;
use envnode_core::calibration::CalibrationStep;
use envnode_core::config::NodeVariant;
use envnode_core::fault::FatalFault;
use envnode_core::node::{CycleReport, Node};
use envnode_core::schedule::idle_between_cycles;
use envnode_core::storage::{NoStorage, StorageSink};
use envnode_core::time_source::{FixCell, GpsClock, TimeSource};
use log::{error, info};

use peripherals::{SimAdc, SimClimate, SimClock, SimDelay, SimGas, SimPin, SimSleep, SimTime};
use settings::Settings;
use sinks::{ConsoleTelemetry, FileStorage};

/// Written by the simulated receiver, read by the GPS clock
static GPS_FIX: FixCell = FixCell::new();

#[derive(Debug, Default)]
struct Summary {
    cycles: u32,
    rows_written: u32,
    /// Uptime of the cycle in which calibration completed
    calibrated_at: Option<u32>,
    last: Option<CycleReport>,
}

async fn simulate(settings: &Settings, fix: &'static FixCell) -> Result<Summary, FatalFault> {
    let sim = &settings.simulation;

    if settings.node.variant == NodeVariant::Gps {
        let time = SimTime::with_gps(
            sim.start_unix,
            sim.time_scale,
            fix,
            sim.fix_after_secs,
            sim.satellites,
        );
        let clock = GpsClock::new(fix, SimDelay(time.clone()), settings.node.fix_report_interval_ms);
        run(settings, time, clock, NoStorage).await
    } else {
        let time = SimTime::new(sim.start_unix, sim.time_scale);
        let storage = FileStorage::new(&sim.output_dir);
        run(settings, time.clone(), SimClock(time), storage).await
    }
}

async fn run<C, S>(settings: &Settings, time: SimTime, clock: C, storage: S) -> Result<Summary, FatalFault>
where
    C: TimeSource,
    S: StorageSink,
{
    let sim = &settings.simulation;
    let config = settings.node;

    let gas = SimGas::new(time.clone(), sim);
    let sensors = Sensors {
        clock,
        climate: SimClimate::new(time.clone(), sim, &gas),
        gas,
        voltage: SimAdc::new(sim.adc_raw),
    };

    let mut gas_reset = SimPin::new("gas reset");
    let mut node = Node::boot(config, sensors, storage, &mut gas_reset, SimDelay(time.clone())).await?;

    let mut telemetry = ConsoleTelemetry {
        show_summary: config.variant == NodeVariant::RtcDisplay,
        published: 0,
    };
    let mut led = SimPin::new("status led");
    let mut delay = SimDelay(time.clone());
    let mut sleeper = SimSleep(time);

    let mut summary = Summary::default();
    for _ in 0..sim.cycles {
        let report = node.run_cycle(&mut telemetry).await;

        summary.cycles += 1;
        if report.persisted {
            summary.rows_written += 1;
        }
        if let CalibrationStep::Calibrated { offset } = report.calibration {
            info!("calibrated at uptime {}s, offset {offset:.2}C", report.reading.uptime);
            summary.calibrated_at = Some(report.reading.uptime);
        }
        summary.last = Some(report);

        idle_between_cycles(
            config.power,
            config.cycle_period_ms,
            &mut led,
            &mut delay,
            &mut sleeper,
        )
        .await;
    }

    Ok(summary)
}

fn main() -> ExitCode {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.logger.level.as_str()),
    )
    .init();

    info!("Starting envnode simulator");
    info!("{:?}", settings.node);

    match block_on(simulate(&settings, &GPS_FIX)) {
        Ok(summary) => {
            info!(
                "{} cycles, {} rows written, calibrated: {}",
                summary.cycles,
                summary.rows_written,
                summary
                    .calibrated_at
                    .map_or("no".to_string(), |uptime| format!("at {uptime}s")),
            );
            ExitCode::SUCCESS
        }
        Err(fault) => {
            error!("FATAL: {fault}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envnode_core::config::NodeConfig;
    use envnode_core::frame::{GPS_FRAME_LEN, RTC_FRAME_LEN};
    use std::fs;

    fn settings(node: NodeConfig, cycles: u32, dir: &str) -> Settings {
        let mut settings = Settings::parse(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/configs/default.toml"
        )))
        .unwrap();
        settings.node = node;
        settings.simulation.cycles = cycles;
        settings.simulation.output_dir = std::env::temp_dir()
            .join(format!("envnode-{dir}-{}", std::process::id()))
            .to_string_lossy()
            .to_string();
        settings
    }

    #[test]
    fn test_rtc_node_calibrates_and_logs() {
        let mut node = NodeConfig::rtc();
        node.warm_up_threshold_secs = 120;
        let settings = settings(node, 5, "rtc");
        static FIX: FixCell = FixCell::new();

        let summary = block_on(simulate(&settings, &FIX)).unwrap();

        assert_eq!(summary.cycles, 5);
        assert_eq!(summary.rows_written, 5);
        let calibrated_at = summary.calibrated_at.unwrap();
        assert!((120..180).contains(&calibrated_at));

        let last = summary.last.unwrap();
        assert!(last.reading.calibrated);
        assert_eq!(last.frame.size(), RTC_FRAME_LEN);

        let files: Vec<_> = fs::read_dir(&settings.simulation.output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, ["env_20210615.csv"]);
        fs::remove_dir_all(&settings.simulation.output_dir).unwrap();
    }

    #[test]
    fn test_gps_node_waits_for_fix_and_skips_storage() {
        let settings = settings(NodeConfig::gps(), 2, "gps");
        static FIX: FixCell = FixCell::new();

        let summary = block_on(simulate(&settings, &FIX)).unwrap();

        assert_eq!(summary.rows_written, 0);
        let last = summary.last.unwrap();
        assert_eq!(last.frame.size(), GPS_FRAME_LEN);
        let gps = last.reading.gps.unwrap();
        assert!(gps.fix);
        assert_eq!(gps.satellites, settings.simulation.satellites);
        assert!(!fs::exists(&settings.simulation.output_dir).unwrap());
    }
}
