//! # Telemetry Logger
//!
//! Appends received robot messages to JSONL files with rotation.
//!
//! Files are named `telemetry_<n>.jsonl` with `n` increasing. A new file
//! is started after `max_records_per_file` records; only the newest
//! `max_files_to_keep` files are retained.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, RobotLinkError};
use crate::radio::protocol::{Message, MessageType, RobotId};

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// One line of a telemetry file
#[derive(Debug, Serialize)]
pub struct TelemetryRecord<'a> {
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    pub robot: RobotId,
    pub message_type: MessageType,
    pub message: &'a Message,
}

/// Rotating JSONL telemetry writer
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    next_index: u64,
    records_in_file: usize,
    total_records: u64,
}

impl TelemetryLogger {
    /// Create a logger writing into `dir`
    ///
    /// The directory is created if missing. Numbering continues after the
    /// highest existing `telemetry_<n>.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns error if either limit is zero or the directory cannot be created
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        if max_records_per_file == 0 || max_files_to_keep == 0 {
            return Err(RobotLinkError::Telemetry(
                "max_records_per_file and max_files_to_keep must be greater than 0".to_string(),
            ));
        }

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let next_index = existing_files(&dir)?.last().map_or(0, |(index, _)| index + 1);

        info!("Recording telemetry to {}", dir.display());
        Ok(Self {
            dir,
            max_records_per_file,
            max_files_to_keep,
            writer: None,
            next_index,
            records_in_file: 0,
            total_records: 0,
        })
    }

    /// Append one message received from `robot`
    pub fn record(&mut self, robot: RobotId, message: &Message) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = TelemetryRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            robot,
            message_type: message.message_type(),
            message,
        };

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| RobotLinkError::Telemetry("No telemetry file open".to_string()))?;
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;

        self.records_in_file += 1;
        self.total_records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Records written since creation
    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let path = self.dir.join(file_name(self.next_index));
        let file = File::create(&path)?;
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.next_index += 1;
        self.records_in_file = 0;
        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let files = existing_files(&self.dir)?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for (_, path) in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old telemetry file {}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}

fn file_name(index: u64) -> String {
    format!("{}{}.{}", FILE_PREFIX, index, FILE_EXTENSION)
}

/// Telemetry files in `dir`, oldest first
fn existing_files(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let index = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(FILE_PREFIX))
            .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
            .and_then(|rest| rest.strip_suffix('.'))
            .and_then(|digits| digits.parse::<u64>().ok());
        if let Some(index) = index {
            files.push((index, path));
        }
    }
    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}
