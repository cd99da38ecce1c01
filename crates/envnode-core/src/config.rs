//! Node configuration
//!
//! One [`NodeConfig`] describes a hardware variant. The firmware starts from
//! a preset and overlays build-time values. The simulator deserializes the
//! same struct from its settings file: the `variant` key picks the preset and
//! any other key present overrides it.

use serde::{Deserialize, Serialize};

use crate::sensors::DriveMode;
use crate::voltage::VoltageScale;

/// Which board the firmware runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeVariant {
    /// RTC-timed logger writing CSV to SD
    Rtc,
    /// GPS-timed telemetry node without storage, emits 41-byte frames
    Gps,
    /// RTC-timed node with a local display; SD card is optional
    RtcDisplay,
}

/// How boot treats the storage peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePolicy {
    /// Boot fails when the card cannot be mounted
    Required,
    /// Mount is attempted; failure only leaves `Storage` unset
    Optional,
    /// The board has no card slot
    Absent,
}

impl NodeVariant {
    pub const fn storage_policy(self) -> StoragePolicy {
        match self {
            Self::Rtc => StoragePolicy::Required,
            Self::Gps => StoragePolicy::Absent,
            Self::RtcDisplay => StoragePolicy::Optional,
        }
    }
}

/// How the node idles between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerProfile {
    /// USB/bench power: blink the status LED while waiting
    External,
    /// Battery/solar: low-power sleep
    Battery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NodeConfigOverrides")]
pub struct NodeConfig {
    pub variant: NodeVariant,
    /// Uptime the gas sensor needs before calibration is attempted
    pub warm_up_threshold_secs: u32,
    pub cycle_period_ms: u32,
    /// Drive mode set once calibration succeeds
    pub active_drive_mode: DriveMode,
    pub voltage_scale: VoltageScale,
    pub power: PowerProfile,
    /// Pause after a successful gas sensor start before its mode is set
    pub gas_init_settle_ms: u32,
    /// Satellite count log interval while waiting for a GPS fix
    pub fix_report_interval_ms: u32,
}

impl NodeConfig {
    /// RTC logger with SD card
    pub const fn rtc() -> Self {
        Self {
            variant: NodeVariant::Rtc,
            warm_up_threshold_secs: 1200,
            cycle_period_ms: 60_000,
            active_drive_mode: DriveMode::EveryTenSeconds,
            voltage_scale: VoltageScale::HalfDivider,
            power: PowerProfile::Battery,
            gas_init_settle_ms: 100,
            fix_report_interval_ms: 1000,
        }
    }

    /// GPS-timed telemetry node
    pub const fn gps() -> Self {
        Self {
            variant: NodeVariant::Gps,
            voltage_scale: VoltageScale::SolarGain,
            ..Self::rtc()
        }
    }

    /// RTC node with a display, bench powered
    pub const fn rtc_display() -> Self {
        Self {
            variant: NodeVariant::RtcDisplay,
            warm_up_threshold_secs: 120,
            power: PowerProfile::External,
            ..Self::rtc()
        }
    }

    pub const fn for_variant(variant: NodeVariant) -> Self {
        match variant {
            NodeVariant::Rtc => Self::rtc(),
            NodeVariant::Gps => Self::gps(),
            NodeVariant::RtcDisplay => Self::rtc_display(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::rtc()
    }
}

/// A settings table as written; absent keys come from the variant preset.
#[derive(Debug, Default, Deserialize)]
struct NodeConfigOverrides {
    variant: Option<NodeVariant>,
    warm_up_threshold_secs: Option<u32>,
    cycle_period_ms: Option<u32>,
    active_drive_mode: Option<DriveMode>,
    voltage_scale: Option<VoltageScale>,
    power: Option<PowerProfile>,
    gas_init_settle_ms: Option<u32>,
    fix_report_interval_ms: Option<u32>,
}

impl From<NodeConfigOverrides> for NodeConfig {
    fn from(o: NodeConfigOverrides) -> Self {
        let preset = Self::for_variant(o.variant.unwrap_or(NodeVariant::Rtc));
        Self {
            variant: preset.variant,
            warm_up_threshold_secs: o.warm_up_threshold_secs.unwrap_or(preset.warm_up_threshold_secs),
            cycle_period_ms: o.cycle_period_ms.unwrap_or(preset.cycle_period_ms),
            active_drive_mode: o.active_drive_mode.unwrap_or(preset.active_drive_mode),
            voltage_scale: o.voltage_scale.unwrap_or(preset.voltage_scale),
            power: o.power.unwrap_or(preset.power),
            gas_init_settle_ms: o.gas_init_settle_ms.unwrap_or(preset.gas_init_settle_ms),
            fix_report_interval_ms: o.fix_report_interval_ms.unwrap_or(preset.fix_report_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ_in_warm_up() {
        assert_eq!(NodeConfig::rtc().warm_up_threshold_secs, 1200);
        assert_eq!(NodeConfig::gps().warm_up_threshold_secs, 1200);
        assert_eq!(NodeConfig::rtc_display().warm_up_threshold_secs, 120);
    }

    #[test]
    fn test_presets_keep_shared_defaults() {
        let display = NodeConfig::rtc_display();
        assert_eq!(display.active_drive_mode, DriveMode::EveryTenSeconds);
        assert_eq!(display.gas_init_settle_ms, 100);
        assert_eq!(display.voltage_scale, VoltageScale::HalfDivider);

        assert_eq!(NodeConfig::gps().voltage_scale, VoltageScale::SolarGain);
    }

    #[test]
    fn test_storage_policy_per_variant() {
        assert_eq!(NodeVariant::Rtc.storage_policy(), StoragePolicy::Required);
        assert_eq!(NodeVariant::Gps.storage_policy(), StoragePolicy::Absent);
        assert_eq!(NodeVariant::RtcDisplay.storage_policy(), StoragePolicy::Optional);
    }

    #[test]
    fn test_for_variant_matches_presets() {
        assert_eq!(NodeConfig::for_variant(NodeVariant::Gps), NodeConfig::gps());
        assert_eq!(NodeConfig::default(), NodeConfig::rtc());
    }

    #[test]
    fn test_missing_keys_come_from_variant_preset() {
        let gps = NodeConfigOverrides {
            variant: Some(NodeVariant::Gps),
            ..Default::default()
        };
        assert_eq!(NodeConfig::from(gps), NodeConfig::gps());

        let display = NodeConfigOverrides {
            variant: Some(NodeVariant::RtcDisplay),
            power: Some(PowerProfile::Battery),
            ..Default::default()
        };
        let config = NodeConfig::from(display);
        assert_eq!(config.warm_up_threshold_secs, 120);
        assert_eq!(config.power, PowerProfile::Battery);

        assert_eq!(NodeConfig::from(NodeConfigOverrides::default()), NodeConfig::rtc());
    }
}
