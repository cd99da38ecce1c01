//! Boot-time fatal faults
//!
//! A peripheral the node cannot run without fails to come up at boot: the
//! engine returns a [`FatalFault`] and the caller hands it to a
//! [`FaultHandler`]. The stock handler blinks SOS on the status LED forever.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::error;
use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FatalFault {
    #[error("time source failed to initialize")]
    TimeSource,

    #[error("temperature/humidity/pressure sensor failed to initialize")]
    TempHumidityPressure,

    #[error("gas sensor failed to start (status {status})")]
    GasSensor { status: u8 },

    #[error("storage failed to initialize")]
    Storage,
}

/// Receives the fault that stopped boot. Never completes.
pub trait FaultHandler {
    fn handle(&mut self, fault: FatalFault) -> impl Future<Output = Infallible>;
}

const SHORT_MS: u32 = 100;
const LONG_MS: u32 = 300;
const LETTER_GAP_MS: u32 = 300;
const WORD_GAP_MS: u32 = 500;

/// Morse SOS on an LED.
pub struct SosSignal<P, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> SosSignal<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    async fn letter(&mut self, on_ms: u32) {
        for _ in 0..3 {
            self.pin.set_high().ok();
            self.delay.delay_ms(on_ms).await;
            self.pin.set_low().ok();
            self.delay.delay_ms(on_ms).await;
        }
    }

    /// One `... --- ...` sequence followed by the word gap, 4.1 s in total.
    pub async fn blink_once(&mut self) {
        self.letter(SHORT_MS).await;
        self.delay.delay_ms(LETTER_GAP_MS).await;
        self.letter(LONG_MS).await;
        self.delay.delay_ms(LETTER_GAP_MS).await;
        self.letter(SHORT_MS).await;
        self.delay.delay_ms(WORD_GAP_MS).await;
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

pub struct SosFaultHandler<P, D> {
    signal: SosSignal<P, D>,
}

impl<P: OutputPin, D: DelayNs> SosFaultHandler<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            signal: SosSignal::new(pin, delay),
        }
    }
}

impl<P: OutputPin, D: DelayNs> FaultHandler for SosFaultHandler<P, D> {
    async fn handle(&mut self, fault: FatalFault) -> Infallible {
        error!("FATAL: {fault}");
        loop {
            self.signal.blink_once().await;
        }
    }
}
