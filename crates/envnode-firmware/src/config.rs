//! Compiled-in node settings
//!
//! The board preset is picked by cargo feature; `build.rs` forwards
//! overrides from the environment or `.env`.

use envnode_core::config::{NodeConfig, PowerProfile};
use log::{info, warn};

#[cfg(feature = "variant-rtc-display")]
const PRESET: NodeConfig = NodeConfig::rtc_display();
#[cfg(not(feature = "variant-rtc-display"))]
const PRESET: NodeConfig = NodeConfig::rtc();

/// Build-time overrides, as forwarded by `build.rs`
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides<'a> {
    pub warm_up_secs: Option<&'a str>,
    pub cycle_ms: Option<&'a str>,
    pub power: Option<&'a str>,
}

impl Overrides<'static> {
    pub const fn from_build_env() -> Self {
        Self {
            warm_up_secs: option_env!("ENVNODE_WARM_UP_SECS"),
            cycle_ms: option_env!("ENVNODE_CYCLE_MS"),
            power: option_env!("ENVNODE_POWER"),
        }
    }
}

fn parse_power(value: &str) -> Option<PowerProfile> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("external") => Some(PowerProfile::External),
        v if v.eq_ignore_ascii_case("battery") => Some(PowerProfile::Battery),
        _ => None,
    }
}

/// Apply `overrides` to `config`. Values that do not parse are logged and
/// skipped.
pub fn overlay(mut config: NodeConfig, overrides: &Overrides<'_>) -> NodeConfig {
    if let Some(raw) = overrides.warm_up_secs {
        match raw.trim().parse() {
            Ok(secs) => config.warm_up_threshold_secs = secs,
            Err(_) => warn!("ENVNODE_WARM_UP_SECS={raw} is not a number of seconds"),
        }
    }

    if let Some(raw) = overrides.cycle_ms {
        match raw.trim().parse() {
            Ok(ms) => config.cycle_period_ms = ms,
            Err(_) => warn!("ENVNODE_CYCLE_MS={raw} is not a number of milliseconds"),
        }
    }

    if let Some(raw) = overrides.power {
        match parse_power(raw) {
            Some(power) => config.power = power,
            None => warn!("ENVNODE_POWER={raw} is neither `external` nor `battery`"),
        }
    }

    config
}

pub fn node_config() -> NodeConfig {
    let config = overlay(PRESET, &Overrides::from_build_env());
    info!(
        "{:?} node: warm-up {}s, cycle {}ms, {:?} power",
        config.variant, config.warm_up_threshold_secs, config.cycle_period_ms, config.power
    );
    config
}
