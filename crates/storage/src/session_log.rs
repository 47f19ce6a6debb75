//! Session Log Implementation

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{LogConfig, LogReadError, LogRecord, LogWriteError, LOG_HEADER};

fn header_line() -> String {
    LOG_HEADER.join(",")
}

fn io_error(path: &Path, err: std::io::Error) -> LogWriteError {
    LogWriteError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Create the log with its header if it does not exist yet.
///
/// An existing non-empty file is left untouched whatever its contents.
pub fn ensure_log_initialized(path: &Path) -> Result<(), LogWriteError> {
    let existing = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_error(path, e)),
    };

    match existing {
        Some(len) if len > 0 => {
            debug!("Log {} already exists", path.display());
            return Ok(());
        }
        Some(_) => {
            let mut file = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| io_error(path, e))?;
            writeln!(file, "{}", header_line()).map_err(|e| io_error(path, e))?;
        }
        None => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
            }
            let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(file) => file,
                // Lost a race with another creator; theirs has the header.
                Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
                Err(e) => return Err(io_error(path, e)),
            };
            writeln!(file, "{}", header_line()).map_err(|e| io_error(path, e))?;
        }
    }

    info!("Created log {}", path.display());
    Ok(())
}

/// Check that the first line of the log is the expected header
pub fn validate_header(path: &Path) -> Result<(), LogWriteError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|e| io_error(path, e))?;

    let found = first.trim_end_matches(['\r', '\n']);
    let expected = header_line();
    if found != expected {
        return Err(LogWriteError::SchemaMismatch {
            path: path.to_path_buf(),
            found: found.to_string(),
            expected,
        });
    }
    Ok(())
}

/// Read every record in a log, skipping the header
pub fn read_records(path: &Path) -> Result<Vec<LogRecord>, LogReadError> {
    let file =
        File::open(path).map_err(|e| LogReadError::Io(format!("{}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| LogReadError::Io(e.to_string()))?;
        if idx == 0 || line.is_empty() {
            continue;
        }
        let record = LogRecord::parse_csv_row(&line).map_err(|reason| LogReadError::Malformed {
            line: idx + 1,
            reason,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Append-only writer for one monitoring session
pub struct SessionLogger {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    records_written: u64,
}

impl SessionLogger {
    /// Initialize the log if needed and open it for appending
    pub fn open(config: &LogConfig) -> Result<Self, LogWriteError> {
        let path = config.path.clone();
        ensure_log_initialized(&path)?;
        if config.validate_header {
            validate_header(&path)?;
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        info!("Logging session to {}", path.display());
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            records_written: 0,
        })
    }

    /// Append one record. Each record is flushed before returning.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), LogWriteError> {
        let writer = self.writer.as_mut().ok_or(LogWriteError::Closed)?;
        writeln!(writer, "{}", record.to_csv_row())
            .and_then(|_| writer.flush())
            .map_err(|e| io_error(&self.path, e))?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush and close. Later appends fail with `Closed`.
    pub fn close(&mut self) -> Result<(), LogWriteError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| io_error(&self.path, e))?;
            info!(
                "Closed log {} ({} records this session)",
                self.path.display(),
                self.records_written
            );
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close log: {}", e);
        }
    }
}
