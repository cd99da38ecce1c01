//! Wall clock and uptime sources
//!
//! A node is timed either by a battery-backed RTC (driver in the firmware
//! crate) or by the last fix reported by a GPS receiver ([`GpsClock`]).
//! Uptime is never read from a hardware tick counter: it is derived from the
//! wall clock as `unix_seconds() - startup_epoch`, see
//! [`crate::node::NodeContext::uptime_at`].

mod gps;

pub use gps::*;

use core::fmt::{self, Display};

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::hardware::Capability;
use crate::sensors::SensorError;

/// Calendar time with one second resolution, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WallClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallClock {
    pub const EPOCH: Self = Self {
        year: 1970,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// `true` if this is a real calendar date representable as u32 unix time
    pub fn is_valid(&self) -> bool {
        self.to_unix_seconds().is_some()
    }

    /// Seconds since 1970-01-01T00:00:00Z, or `None` for an impossible date
    /// or one outside the u32 range.
    pub fn to_unix_seconds(&self) -> Option<u32> {
        let month = Month::try_from(self.month).ok()?;
        let date = Date::from_calendar_date(i32::from(self.year), month, self.day).ok()?;
        let time = Time::from_hms(self.hour, self.minute, self.second).ok()?;
        let timestamp = PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp();

        u32::try_from(timestamp).ok()
    }

    pub fn from_unix_seconds(seconds: u32) -> Option<Self> {
        let dt = OffsetDateTime::from_unix_timestamp(i64::from(seconds)).ok()?;

        Some(Self {
            year: u16::try_from(dt.year()).ok()?,
            month: u8::from(dt.month()),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        })
    }
}

impl Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Fix quality carried by readings on GPS-timed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsStatus {
    pub fix: bool,
    pub satellites: u8,
}

/// Source of wall-clock time for the node.
pub trait TimeSource {
    /// Bring the clock up. For a GPS clock this blocks until the first fix.
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    fn now(&mut self) -> impl Future<Output = WallClock>;

    /// Current unix time. Invalid clock contents read as 0.
    fn unix_seconds(&mut self) -> impl Future<Output = u32> {
        async move { self.now().await.to_unix_seconds().unwrap_or(0) }
    }

    /// The availability bit this clock sets once initialized.
    fn capability(&self) -> Capability;

    fn gps_status(&self) -> Option<GpsStatus> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_unix_conversion() {
        let clock = WallClock::new(2021, 6, 15, 12, 30, 45);
        assert_eq!(clock.to_unix_seconds(), Some(1_623_760_245));
        assert_eq!(WallClock::from_unix_seconds(1_623_760_245), Some(clock));

        assert_eq!(WallClock::EPOCH.to_unix_seconds(), Some(0));
        assert_eq!(WallClock::from_unix_seconds(0), Some(WallClock::EPOCH));
    }

    #[test]
    fn test_invalid_dates_rejected() {
        assert!(!WallClock::new(2021, 2, 30, 0, 0, 0).is_valid());
        assert!(!WallClock::new(2021, 13, 1, 0, 0, 0).is_valid());
        assert!(!WallClock::new(2021, 1, 1, 24, 0, 0).is_valid());
        assert!(!WallClock::new(1969, 12, 31, 23, 59, 59).is_valid());
        assert!(!WallClock::default().is_valid());
        assert!(WallClock::new(2024, 2, 29, 23, 59, 59).is_valid());
    }

    #[test]
    fn test_display() {
        let clock = WallClock::new(2022, 3, 7, 5, 4, 9);
        assert_eq!(clock.to_string(), "2022-03-07 05:04:09");
    }
}
