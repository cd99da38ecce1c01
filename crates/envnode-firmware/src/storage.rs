//! SD card log storage
//!
//! `embedded-sdmmc` is blocking; writes happen once per cycle, so the SPI
//! transfers run on the executor thread.

use core::fmt::Write;

use embedded_sdmmc::{Mode, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager};
use envnode_core::storage::{StorageError, StorageSink};
use heapless::String;
use log::{info, warn};

/// An 8.3 directory entry name
pub type ShortName = String<12>;

/// Map a log path onto an 8.3 name: the last eight characters of the stem
/// and the first three of the extension, upper-cased.
///
/// `env_20210615.csv` becomes `20210615.CSV`.
pub fn short_name(path: &str) -> Result<ShortName, StorageError> {
    if !path.is_ascii() {
        return Err(StorageError::PathTooLong);
    }
    let (stem, ext) = path.rsplit_once('.').unwrap_or((path, ""));
    let stem = &stem[stem.len().saturating_sub(8)..];
    let ext = &ext[..ext.len().min(3)];
    if stem.is_empty() {
        return Err(StorageError::PathTooLong);
    }

    let mut name = ShortName::new();
    for c in stem.chars() {
        name.push(c.to_ascii_uppercase())
            .map_err(|_| StorageError::PathTooLong)?;
    }
    if !ext.is_empty() {
        write!(name, ".").map_err(|_| StorageError::PathTooLong)?;
        for c in ext.chars() {
            name.push(c.to_ascii_uppercase())
                .map_err(|_| StorageError::PathTooLong)?;
        }
    }
    Ok(name)
}

/// FAT timestamp source. The log file names carry the date, so directory
/// entries get a constant stamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 30,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdCardSink<S, D, T = FixedTime>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdCardSink<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(sd_card, ts),
        }
    }

    fn mount(&self) -> Result<(), embedded_sdmmc::Error<SdCardError>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        root_dir.close()?;
        volume0.close()?;
        Ok(())
    }

    fn append(&self, name: &str, row: &[u8]) -> Result<(), StorageError> {
        let volume0 = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(|_| StorageError::Unavailable)?;
        let root_dir = volume0.open_root_dir().map_err(|_| StorageError::Open)?;
        let file = root_dir
            .open_file_in_dir(name, Mode::ReadWriteCreateOrAppend)
            .map_err(|_| StorageError::Open)?;

        file.write(row).map_err(|_| StorageError::Write)?;

        file.close().map_err(|_| StorageError::Write)?;
        root_dir.close().map_err(|_| StorageError::Open)?;
        volume0.close().map_err(|_| StorageError::Unavailable)?;
        Ok(())
    }
}

impl<S, D, T> StorageSink for SdCardSink<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    async fn init(&mut self) -> Result<(), StorageError> {
        match self.volume_mgr.device(|sd| sd.num_bytes()) {
            Ok(bytes) => info!("SD card: {} MiB", bytes / (1024 * 1024)),
            Err(e) => {
                warn!("SD card did not respond: {:?}", e);
                return Err(StorageError::Unavailable);
            }
        }

        self.mount().map_err(|e| {
            warn!("SD card mount failed: {:?}", e);
            StorageError::Unavailable
        })
    }

    async fn append_row(&mut self, path: &str, row: &[u8]) -> Result<(), StorageError> {
        let name = short_name(path)?;
        self.append(&name, row)
    }
}
