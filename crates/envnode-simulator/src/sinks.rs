//! Host-side outputs: CSV files in a directory and console telemetry

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use envnode_core::display::summary_lines;
use envnode_core::node::TelemetrySink;
use envnode_core::reading::Reading;
use envnode_core::storage::{StorageError, StorageSink};
use log::{debug, warn};

/// Appends rows to files under `dir`, standing in for the SD card.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StorageSink for FileStorage {
    async fn init(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            warn!("cannot create {}: {e}", self.dir.display());
            StorageError::Unavailable
        })
    }

    async fn append_row(&mut self, path: &str, row: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(path))
            .map_err(|_| StorageError::Open)?;
        file.write_all(row).map_err(|_| StorageError::Write)
    }
}

/// Prints every reading; the display variant also gets the screen summary.
#[derive(Debug, Default)]
pub struct ConsoleTelemetry {
    pub show_summary: bool,
    pub published: u32,
}

impl TelemetrySink for ConsoleTelemetry {
    async fn publish(&mut self, reading: &Reading, frame: &[u8]) {
        self.published += 1;
        println!("--- cycle {} ---\n{reading}", self.published);

        let hex: String = frame.iter().map(|b| format!("{b:02x}")).collect();
        debug!("frame ({} bytes): {hex}", frame.len());

        if self.show_summary {
            println!("+------------+");
            for line in summary_lines(reading) {
                println!("| {:<10} |", line.as_str());
            }
            println!("+------------+");
        }
    }
}
