use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_async::delay::DelayNs;
use log::info;

use super::{GpsStatus, TimeSource, WallClock};
use crate::hardware::Capability;
use crate::sensors::SensorError;

/// How often the boot wait re-checks the fix feed
const FIX_POLL_INTERVAL_MS: u32 = 50;

/// One parsed position/time report from the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsFix {
    pub time: WallClock,
    pub valid: bool,
    pub satellites: u8,
}

/// Latest fix published by the NMEA task.
///
/// The parser is the only writer; the sampling loop only takes copies, so a
/// cycle never observes a half-written fix.
pub struct FixCell {
    inner: Mutex<CriticalSectionRawMutex, Cell<Option<GpsFix>>>,
}

impl FixCell {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(None)),
        }
    }

    pub fn publish(&self, fix: GpsFix) {
        self.inner.lock(|cell| cell.set(Some(fix)));
    }

    pub fn latest(&self) -> Option<GpsFix> {
        self.inner.lock(|cell| cell.get())
    }
}

impl Default for FixCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Time source backed by the last GPS fix.
pub struct GpsClock<'a, D> {
    feed: &'a FixCell,
    delay: D,
    report_interval_ms: u32,
}

impl<'a, D: DelayNs> GpsClock<'a, D> {
    pub fn new(feed: &'a FixCell, delay: D, report_interval_ms: u32) -> Self {
        Self {
            feed,
            delay,
            report_interval_ms,
        }
    }

    /// Block until the feed carries a valid fix, logging the satellite count
    /// every `report_interval_ms` while waiting. There is no timeout.
    pub async fn wait_for_fix(&mut self) -> GpsFix {
        let mut since_report = self.report_interval_ms;

        info!("GPS: no fix");
        loop {
            let latest = self.feed.latest();
            if let Some(fix) = latest.filter(|fix| fix.valid) {
                info!("GPS: fix, {} satellites", fix.satellites);
                return fix;
            }

            if since_report >= self.report_interval_ms {
                info!("SATS: {}", latest.map_or(0, |fix| fix.satellites));
                since_report = 0;
            }

            embassy_futures::yield_now().await;
            self.delay.delay_ms(FIX_POLL_INTERVAL_MS).await;
            since_report = since_report.saturating_add(FIX_POLL_INTERVAL_MS);
        }
    }
}

impl<D: DelayNs> TimeSource for GpsClock<'_, D> {
    async fn init(&mut self) -> Result<(), SensorError> {
        self.wait_for_fix().await;
        Ok(())
    }

    /// Time of the last fix the receiver reported, valid or not.
    async fn now(&mut self) -> WallClock {
        self.feed.latest().map_or(WallClock::EPOCH, |fix| fix.time)
    }

    fn capability(&self) -> Capability {
        Capability::GpsFix
    }

    fn gps_status(&self) -> Option<GpsStatus> {
        let fix = self.feed.latest().unwrap_or_default();
        Some(GpsStatus {
            fix: fix.valid,
            satellites: fix.satellites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationController;
    use crate::mock::{CallLog, RecordingDelay};
    use crate::node::NodeContext;
    use crate::sensors::DriveMode;
    use embassy_futures::block_on;

    fn fix_at(seconds: u32, valid: bool, satellites: u8) -> GpsFix {
        GpsFix {
            time: WallClock::from_unix_seconds(seconds).unwrap(),
            valid,
            satellites,
        }
    }

    #[test]
    fn test_fix_cell_keeps_latest() {
        let cell = FixCell::new();
        assert_eq!(cell.latest(), None);

        cell.publish(fix_at(100, false, 2));
        cell.publish(fix_at(101, true, 7));

        assert_eq!(cell.latest(), Some(fix_at(101, true, 7)));
    }

    /// Delay that publishes a valid fix once enough time has passed
    struct FixAfter<'a> {
        cell: &'a FixCell,
        at_ms: u32,
        elapsed_ms: u32,
        polls: u32,
    }

    impl DelayNs for FixAfter<'_> {
        async fn delay_ns(&mut self, ns: u32) {
            self.elapsed_ms += ns / 1_000_000;
            self.polls += 1;
            if self.elapsed_ms >= self.at_ms {
                self.cell.publish(fix_at(1_600_000_003, true, 6));
            }
        }
    }

    #[test]
    fn test_wait_for_fix_polls_until_valid() {
        let cell = FixCell::new();
        cell.publish(fix_at(1_600_000_000, false, 3));

        let delay = FixAfter {
            cell: &cell,
            at_ms: 2_500,
            elapsed_ms: 0,
            polls: 0,
        };
        let mut clock = GpsClock::new(&cell, delay, 1_000);

        let fix = block_on(clock.wait_for_fix());

        assert!(fix.valid);
        assert_eq!(clock.delay.elapsed_ms, 2_500);
        assert_eq!(clock.delay.polls, 2_500 / FIX_POLL_INTERVAL_MS);
        assert_eq!(clock.gps_status(), Some(GpsStatus { fix: true, satellites: 6 }));
        assert_eq!(block_on(clock.unix_seconds()), 1_600_000_003);
    }

    #[test]
    fn test_uptime_follows_fix_time_including_jumps() {
        let cell = FixCell::new();
        cell.publish(fix_at(1_000_000, true, 8));
        let mut clock = GpsClock::new(&cell, RecordingDelay::new(&CallLog::new()), 1_000);

        block_on(clock.init()).unwrap();
        let ctx = NodeContext::new(
            block_on(clock.unix_seconds()),
            CalibrationController::new(1_200, DriveMode::EveryTenSeconds),
        );

        cell.publish(fix_at(1_000_060, true, 8));
        assert_eq!(ctx.uptime_at(block_on(clock.unix_seconds())), 60);

        // Re-acquired fix steps the clock backwards: uptime wraps, it is not
        // clamped or smoothed.
        cell.publish(fix_at(999_990, true, 5));
        assert_eq!(ctx.uptime_at(block_on(clock.unix_seconds())), u32::MAX - 9);
    }
}
