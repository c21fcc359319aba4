//! Event log reader with strict sequential replay
//!
//! The event log is a JSONL file, one event per line, order-significant.
//! Replay rules:
//! - Events are read strictly in file order, starting from the first line.
//! - A malformed line halts the read immediately with its line number.
//! - No skipping, no repair attempts.
//!
//! Blank lines are tolerated (trailing newline at end of file); anything
//! else that fails to parse is an error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::errors::{ApplyError, ApplyResult};
use crate::event::UpdateEvent;

/// Sequential reader over a JSONL event log.
#[derive(Debug)]
pub struct EventLogReader {
    /// Path to the log file, kept for error context
    path: PathBuf,
    reader: BufReader<File>,
    /// 1-based number of the last line read
    line_number: u64,
}

impl EventLogReader {
    /// Opens an event log file for reading.
    pub fn open(path: &Path) -> ApplyResult<Self> {
        let file = File::open(path).map_err(|e| {
            ApplyError::malformed(format!(
                "cannot open event log {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line_number: 0,
        })
    }

    /// Returns the path of the log being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the 1-based number of the last line read.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Reads the next event, or `None` at end of log.
    pub fn next_event(&mut self) -> ApplyResult<Option<UpdateEvent>> {
        loop {
            let mut line = String::new();
            let bytes = self.reader.read_line(&mut line).map_err(|e| {
                ApplyError::malformed(format!(
                    "read failed at {}:{}: {}",
                    self.path.display(),
                    self.line_number + 1,
                    e
                ))
            })?;

            if bytes == 0 {
                return Ok(None);
            }

            self.line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return UpdateEvent::from_json_line(trimmed)
                .map(Some)
                .map_err(|e| self.with_line_context(e));
        }
    }

    /// Reads all remaining events, halting on the first malformed line.
    pub fn read_all(&mut self) -> ApplyResult<Vec<UpdateEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    fn with_line_context(&self, err: ApplyError) -> ApplyError {
        match err {
            ApplyError::MalformedEvent { unique_id, detail } => ApplyError::MalformedEvent {
                unique_id,
                detail: format!(
                    "{}:{}: {}",
                    self.path.display(),
                    self.line_number,
                    detail
                ),
            },
            other => other,
        }
    }
}
