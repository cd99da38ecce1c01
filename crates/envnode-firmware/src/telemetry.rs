//! Per-cycle output over RTT

use core::fmt::Write;

use envnode_core::display::summary_lines;
use envnode_core::frame::GPS_FRAME_LEN;
use envnode_core::node::TelemetrySink;
use envnode_core::reading::Reading;
use heapless::String;
use log::{debug, info};

/// Logs each reading and the hex of its frame. With `show_summary` the six
/// display lines are logged as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct RttTelemetry {
    pub show_summary: bool,
}

impl RttTelemetry {
    pub const fn new(show_summary: bool) -> Self {
        Self { show_summary }
    }
}

impl TelemetrySink for RttTelemetry {
    async fn publish(&mut self, reading: &Reading, frame: &[u8]) {
        info!("{reading}");

        let mut hex = String::<{ 2 * GPS_FRAME_LEN }>::new();
        for byte in frame {
            // Capacity covers the largest frame
            let _ = write!(hex, "{byte:02x}");
        }
        debug!("frame: {hex}");

        if self.show_summary {
            for line in summary_lines(reading) {
                info!("| {:<10} |", line.as_str());
            }
        }
    }
}
