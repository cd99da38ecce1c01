//! CSV log format
//!
//! Columns, in order:
//! `year,month,day,hour,minute,second,uptime,hw,temp,calOffset,cal,humidity,pressure,gasStatus,co2,tvoc`
//! Date and time fields are zero padded, floats carry six decimals, and each
//! row ends in `\r\n`.

use core::fmt::Write;

use heapless::String;

use super::StorageError;
use crate::reading::Reading;
use crate::time_source::WallClock;

pub const FILE_NAME_CAPACITY: usize = 16;
pub const ROW_CAPACITY: usize = 320;

/// `env_YYYYMMDD.csv` for the day `clock` falls on
pub fn log_file_name(clock: &WallClock) -> Result<String<FILE_NAME_CAPACITY>, StorageError> {
    let mut name = String::new();
    write!(
        name,
        "env_{:04}{:02}{:02}.csv",
        clock.year, clock.month, clock.day
    )
    .map_err(|_| StorageError::PathTooLong)?;
    Ok(name)
}

pub fn format_row(reading: &Reading) -> Result<String<ROW_CAPACITY>, StorageError> {
    let ts = &reading.timestamp;
    let mut row = String::new();
    write!(
        row,
        "{:04},{:02},{:02},{:02},{:02},{:02},{},{},{:.6},{:.6},{},{:.6},{:.6},{},{},{}\r\n",
        ts.year,
        ts.month,
        ts.day,
        ts.hour,
        ts.minute,
        ts.second,
        reading.uptime,
        reading.hardware.bits(),
        reading.temperature,
        reading.calibration_offset,
        u8::from(reading.calibrated),
        reading.humidity,
        reading.pressure,
        reading.gas.status,
        reading.gas.co2,
        reading.gas.tvoc,
    )
    .map_err(|_| StorageError::RowTooLong)?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::GasValues;
    use crate::reading::tests::sample_reading;

    #[test]
    fn test_file_name_per_day() {
        let name = log_file_name(&WallClock::new(2021, 6, 5, 23, 59, 59)).unwrap();
        assert_eq!(name.as_str(), "env_20210605.csv");
    }

    #[test]
    fn test_file_name_overflow() {
        let clock = WallClock::new(10_000, 1, 1, 0, 0, 0);
        assert_eq!(log_file_name(&clock), Err(StorageError::PathTooLong));
    }

    #[test]
    fn test_row_layout() {
        let row = format_row(&sample_reading()).unwrap();
        assert_eq!(
            row.as_str(),
            "2021,06,15,12,30,45,3600,15,21.500000,4.500000,1,45.250000,101325.000000,0,415,12\r\n"
        );
    }

    #[test]
    fn test_row_with_sentinels() {
        let mut reading = sample_reading();
        reading.calibrated = false;
        reading.calibration_offset = 0.0;
        reading.gas = GasValues::ABSENT;

        let row = format_row(&reading).unwrap();
        assert!(row.ends_with(",0.000000,0,45.250000,101325.000000,255,-1,-1\r\n"));
        assert_eq!(row.split(',').count(), 16);
    }
}
