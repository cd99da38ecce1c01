//! Idling between sampling cycles

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::debug;

use crate::config::PowerProfile;

/// Number of status blinks on external power
pub const BLINK_COUNT: u32 = 5;

/// LED low and high phase of one status blink
pub const BLINK_PHASE_MS: u32 = 500;

/// Low-power sleep that may wake early.
pub trait SleepPrimitive {
    /// Sleep for at most `ms`; returns the milliseconds actually slept.
    fn sleep(&mut self, ms: u32) -> impl Future<Output = u32>;
}

/// Wait out the rest of a cycle.
///
/// On external power the status LED blinks [`BLINK_COUNT`] times and the
/// remainder is a plain delay. On battery the LED is held low and the sleep
/// primitive is re-entered until the full period has elapsed.
pub async fn idle_between_cycles<P, D, S>(
    power: PowerProfile,
    period_ms: u32,
    led: &mut P,
    delay: &mut D,
    sleeper: &mut S,
) where
    P: OutputPin,
    D: DelayNs,
    S: SleepPrimitive,
{
    match power {
        PowerProfile::External => {
            for _ in 0..BLINK_COUNT {
                led.set_low().ok();
                delay.delay_ms(BLINK_PHASE_MS).await;
                led.set_high().ok();
                delay.delay_ms(BLINK_PHASE_MS).await;
            }
            delay
                .delay_ms(period_ms.saturating_sub(BLINK_COUNT * 2 * BLINK_PHASE_MS))
                .await;
        }
        PowerProfile::Battery => {
            led.set_low().ok();
            let mut remaining = period_ms;
            while remaining > 0 {
                // A wake that reports no progress still counts, so the loop ends
                let slept = sleeper.sleep(remaining).await.max(1);
                remaining = remaining.saturating_sub(slept);
            }
            led.set_high().ok();
            debug!("woke after {period_ms} ms");
        }
    }
}
