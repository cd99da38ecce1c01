//! Cycle sleep on the embassy timer

use embassy_time::Timer;
use envnode_core::schedule::SleepPrimitive;

/// Longest single sleep, matching the 8 s watchdog period battery boards
/// used between wake-ups.
pub const MAX_SLEEP_MS: u32 = 8_000;

#[derive(Debug, Default, Clone, Copy)]
pub struct TimerSleep;

impl SleepPrimitive for TimerSleep {
    async fn sleep(&mut self, ms: u32) -> u32 {
        let slice = ms.min(MAX_SLEEP_MS);
        Timer::after_millis(u64::from(slice)).await;
        slice
    }
}
