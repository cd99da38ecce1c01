//! Fixed-width binary frames
//!
//! Binary format (little-endian, no padding between fields):
//! - year: 2 bytes (u16)
//! - month, day, hour, minute, second: 1 byte each
//! - hw: 1 byte (availability mask)
//! - uptime: 4 bytes (u32)
//! - temp, calOffset, humidity, pressure: 4 bytes each (f32)
//! - co2, tvoc: 4 bytes each (i32)
//! - voltage, gasStatus, calibrated: 1 byte each
//! - GPS frames only: gpsFix, satellites: 1 byte each
//!
//! The downstream collector unpacks RTC frames with `<HBBBBBBIffffiiBBB`.
//! Frames are written field by field; the in-memory layout of [`Reading`]
//! never reaches the wire.

use thiserror_no_std::Error;

use crate::hardware::HardwareAvailability;
use crate::reading::{GasValues, Reading};
use crate::time_source::{GpsStatus, WallClock};

/// Size of a frame from an RTC-timed node
pub const RTC_FRAME_LEN: usize = 39;

/// Size of a frame from a GPS-timed node
pub const GPS_FRAME_LEN: usize = 41;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Rtc,
    Gps,
}

impl FrameFormat {
    pub const fn size(self) -> usize {
        match self {
            Self::Rtc => RTC_FRAME_LEN,
            Self::Gps => GPS_FRAME_LEN,
        }
    }

    pub const fn from_len(len: usize) -> Option<Self> {
        match len {
            RTC_FRAME_LEN => Some(Self::Rtc),
            GPS_FRAME_LEN => Some(Self::Gps),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is {actual} bytes, expected 39 or 41")]
    InvalidLength { actual: usize },

    #[error("frame carries an impossible timestamp")]
    InvalidTimestamp,
}

/// An encoded reading. Only the first `size()` bytes are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; GPS_FRAME_LEN],
    format: FrameFormat,
}

impl Frame {
    pub const fn format(&self) -> FrameFormat {
        self.format
    }

    pub const fn size(&self) -> usize {
        self.format.size()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.size()]
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

struct FrameWriter {
    buf: [u8; GPS_FRAME_LEN],
    offset: usize,
}

impl FrameWriter {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
    }
}

struct FrameReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl FrameReader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }
}

/// Serialize a reading. GPS readings produce 41-byte frames, all others 39.
pub fn encode(reading: &Reading) -> Frame {
    let format = reading.frame_format();
    let mut w = FrameWriter {
        buf: [0u8; GPS_FRAME_LEN],
        offset: 0,
    };

    let ts = &reading.timestamp;
    w.put(&ts.year.to_le_bytes());
    w.put(&[ts.month, ts.day, ts.hour, ts.minute, ts.second]);
    w.put(&[reading.hardware.bits()]);
    w.put(&reading.uptime.to_le_bytes());
    w.put(&reading.temperature.to_le_bytes());
    w.put(&reading.calibration_offset.to_le_bytes());
    w.put(&reading.humidity.to_le_bytes());
    w.put(&reading.pressure.to_le_bytes());
    w.put(&reading.gas.co2.to_le_bytes());
    w.put(&reading.gas.tvoc.to_le_bytes());
    w.put(&[reading.voltage, reading.gas.status, u8::from(reading.calibrated)]);

    if let Some(gps) = reading.gps {
        w.put(&[u8::from(gps.fix), gps.satellites]);
    }

    debug_assert_eq!(w.offset, format.size());
    Frame { buf: w.buf, format }
}

/// Parse a frame. The variant is inferred from the length.
///
/// The raw temperature is not transmitted; it is rebuilt by adding the
/// offset back onto calibrated readings.
pub fn decode(bytes: &[u8]) -> Result<Reading, FrameError> {
    let format =
        FrameFormat::from_len(bytes.len()).ok_or(FrameError::InvalidLength { actual: bytes.len() })?;
    let mut r = FrameReader { bytes, offset: 0 };

    let year = u16::from_le_bytes(r.take());
    let [month, day, hour, minute, second] = r.take();
    let timestamp = WallClock::new(year, month, day, hour, minute, second);
    if !timestamp.is_valid() {
        return Err(FrameError::InvalidTimestamp);
    }

    let hardware = HardwareAvailability::from_bits(r.u8());
    let uptime = u32::from_le_bytes(r.take());
    let temperature = f32::from_le_bytes(r.take());
    let calibration_offset = f32::from_le_bytes(r.take());
    let humidity = f32::from_le_bytes(r.take());
    let pressure = f32::from_le_bytes(r.take());
    let co2 = i32::from_le_bytes(r.take());
    let tvoc = i32::from_le_bytes(r.take());
    let [voltage, status, calibrated] = r.take();

    let gps = match format {
        FrameFormat::Rtc => None,
        FrameFormat::Gps => {
            let [fix, satellites] = r.take();
            Some(GpsStatus {
                fix: fix != 0,
                satellites,
            })
        }
    };

    let calibrated = calibrated != 0;
    let raw_temperature = if calibrated {
        temperature + calibration_offset
    } else {
        temperature
    };

    Ok(Reading {
        timestamp,
        uptime,
        hardware,
        temperature,
        raw_temperature,
        calibration_offset,
        calibrated,
        humidity,
        pressure,
        gas: GasValues { co2, tvoc, status },
        voltage,
        gps,
    })
}
