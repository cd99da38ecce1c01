use std::error::Error;
use std::path::PathBuf;
use std::{env, fs, io};

use envnode_core::config::NodeConfig;
use serde::{Deserialize, Serialize};

/// Replaces the compiled-in settings file when set
pub const CONFIG_ENV: &str = "ENVNODE_SIM_CONFIG";

const DEFAULT_CONFIG: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/configs/default.toml"
));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

/// Behaviour of the synthetic peripherals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Sampling cycles to run before exiting
    pub cycles: u32,
    /// Wall-clock time at power-on
    pub start_unix: u32,
    /// Where CSV files land, relative to the working directory
    pub output_dir: String,
    /// Simulated seconds per real second; 0 disables real sleeping
    pub time_scale: f64,
    pub ambient_c: f32,
    /// Steady-state temperature error once the gas sensor heater is warm
    pub heater_bias_c: f32,
    pub heater_ramp_secs: u32,
    /// Seconds in an active drive mode before results are ready
    pub gas_ready_after_secs: u32,
    pub fix_after_secs: u32,
    pub satellites: u8,
    pub adc_raw: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub node: NodeConfig,
    pub simulation: Simulation,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let mut settings = match env::var(CONFIG_ENV) {
            Ok(path) => Self::parse(&fs::read_to_string(path)?)?,
            Err(_) => Self::parse(DEFAULT_CONFIG)?,
        };

        settings.simulation.output_dir = Self::normalize_path(&settings.simulation.output_dir)?
            .to_string_lossy()
            .to_string();

        Ok(settings)
    }

    pub fn parse(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    fn normalize_path(path: &str) -> io::Result<PathBuf> {
        let path_buf = PathBuf::from(path);

        Ok(if path_buf.is_absolute() {
            path_buf
        } else {
            env::current_dir()?.join(path_buf)
        })
    }
}
