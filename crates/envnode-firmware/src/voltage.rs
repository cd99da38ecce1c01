//! Supply voltage on ADC1

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO1};
use envnode_core::sensors::VoltageSource;

/// The voltage scales expect 10-bit counts; the S3 converts at 12 bits.
const RESOLUTION_SHIFT: u16 = 2;

pub struct AdcVoltage<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO1<'d>, ADC1<'d>>,
}

impl<'d> AdcVoltage<'d> {
    pub fn new(adc1: ADC1<'d>, pin: GPIO1<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(pin, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
        }
    }
}

impl VoltageSource for AdcVoltage<'_> {
    fn read_raw(&mut self) -> u16 {
        // read_oneshot only fails with WouldBlock while a conversion runs
        nb::block!(self.adc.read_oneshot(&mut self.pin)).unwrap_or(0) >> RESOLUTION_SHIFT
    }
}
