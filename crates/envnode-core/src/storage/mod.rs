//! Persistence of readings
//!
//! Readings are appended as CSV rows to one file per calendar day. The sink
//! only moves bytes; the row and file name formats live in [`csv`].

pub mod csv;

pub use csv::{format_row, log_file_name};

use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,

    #[error("failed to open log file")]
    Open,

    #[error("failed to write log file")]
    Write,

    #[error("log file path does not fit")]
    PathTooLong,

    #[error("CSV row does not fit")]
    RowTooLong,
}

/// Append-only destination for CSV rows (SD card, host directory).
pub trait StorageSink {
    /// Mount the medium.
    fn init(&mut self) -> impl Future<Output = Result<(), StorageError>>;

    /// Append `row` to the file at `path`, creating it if needed.
    fn append_row(&mut self, path: &str, row: &[u8]) -> impl Future<Output = Result<(), StorageError>>;
}

/// Sink for boards without a card slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStorage;

impl StorageSink for NoStorage {
    async fn init(&mut self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn append_row(&mut self, _path: &str, _row: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// `None` stands for a medium whose bus could not be brought up.
impl<S: StorageSink> StorageSink for Option<S> {
    async fn init(&mut self) -> Result<(), StorageError> {
        match self {
            Some(sink) => sink.init().await,
            None => Err(StorageError::Unavailable),
        }
    }

    async fn append_row(&mut self, path: &str, row: &[u8]) -> Result<(), StorageError> {
        match self {
            Some(sink) => sink.append_row(path, row).await,
            None => Err(StorageError::Unavailable),
        }
    }
}
