//! Supply voltage sampling
//!
//! The ADC is read [`OVERSAMPLE_COUNT`] times with a short settling delay in
//! between; the integer average is then scaled to one byte. The scale depends
//! on the divider fitted to the board.

use embedded_hal_async::delay::DelayNs;
use serde::{Deserialize, Serialize};

use crate::sensors::VoltageSource;

pub const OVERSAMPLE_COUNT: u32 = 10;

/// Settling delay after each conversion
pub const SAMPLE_SPACING_US: u32 = 11;

/// Conversion from the averaged ADC count to the reported byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoltageScale {
    /// RTC boards: `avg * 2 / 10`
    HalfDivider,
    /// GPS / solar boards: `avg * 3.7`
    SolarGain,
}

impl VoltageScale {
    /// Scale an averaged count. Results above 255 saturate.
    pub fn scale(self, average: u16) -> u8 {
        match self {
            Self::HalfDivider => {
                let scaled = u32::from(average) * 2 / 10;
                u8::try_from(scaled).unwrap_or(u8::MAX)
            }
            // float to int casts saturate
            Self::SolarGain => (f32::from(average) * 3.7) as u8,
        }
    }
}

/// Integer average of [`OVERSAMPLE_COUNT`] conversions.
pub async fn average_raw<V: VoltageSource, D: DelayNs>(adc: &mut V, delay: &mut D) -> u16 {
    let mut sum: u32 = 0;
    for _ in 0..OVERSAMPLE_COUNT {
        sum += u32::from(adc.read_raw());
        delay.delay_us(SAMPLE_SPACING_US).await;
    }

    // The average of u16 values always fits in u16
    (sum / OVERSAMPLE_COUNT) as u16
}

pub async fn sample_voltage<V: VoltageSource, D: DelayNs>(
    adc: &mut V,
    delay: &mut D,
    scale: VoltageScale,
) -> u8 {
    scale.scale(average_raw(adc, delay).await)
}
