//! Text summary for the display variant's character screen

use core::fmt::{self, Write};

use heapless::String;

use crate::reading::Reading;

/// Characters per display line
pub const LINE_WIDTH: usize = 10;

pub const LINE_COUNT: usize = 6;

pub type Line = String<LINE_WIDTH>;

/// Writes into a [`Line`], dropping whatever does not fit.
struct Clipped<'a>(&'a mut Line);

impl Write for Clipped<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

fn line(args: fmt::Arguments<'_>) -> Line {
    let mut out = Line::new();
    // Clipped never reports an error
    let _ = Clipped(&mut out).write_fmt(args);
    out
}

/// Six lines: date/time, temperature and humidity, pressure, CO2, TVOC and
/// the hardware mask.
pub fn summary_lines(reading: &Reading) -> [Line; LINE_COUNT] {
    let ts = &reading.timestamp;
    [
        line(format_args!(
            "{:02}{:02} {:02}:{:02}",
            ts.month, ts.day, ts.hour, ts.minute
        )),
        line(format_args!(
            "{:.1}C {:.0}%H",
            reading.temperature, reading.humidity
        )),
        line(format_args!("{:.1} KPA", reading.pressure / 1000.0)),
        line(format_args!("CO2: {}", reading.gas.co2)),
        line(format_args!("TVOC: {}", reading.gas.tvoc)),
        line(format_args!("HW: {}", reading.hardware.bits())),
    ]
}
