//! Buffered, append-only request log.
//!
//! Records accumulate in memory and are written as one JSON object per line
//! when the buffer reaches capacity, when the periodic flush task fires, when
//! the log is read, and on close. Append, flush and tail are mutually
//! exclusive under a single lock.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::observability::metrics;
use crate::request_log::record::RequestLogRecord;

/// Bytes read from the end of the file by [`LogPipeline::tail`].
pub const TAIL_WINDOW: u64 = 1024 * 1024;

/// Errors surfaced to readers of the log. Writers never see errors.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),
}

struct State {
    buffer: Vec<RequestLogRecord>,
    file: Option<File>,
    closed: bool,
}

/// The request log: an in-memory buffer in front of an append-only file.
pub struct LogPipeline {
    path: PathBuf,
    capacity: usize,
    state: Mutex<State>,
}

impl LogPipeline {
    /// Open (creating if needed) the log file at `path`.
    ///
    /// A file that cannot be opened is reported and the pipeline keeps
    /// running; records flushed without a file are counted as lost.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let file = match open_append(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to open request log file");
                None
            }
        };

        Self {
            path,
            capacity: capacity.max(1),
            state: Mutex::new(State {
                buffer: Vec::with_capacity(capacity.max(1)),
                file,
                closed: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records buffered but not yet written.
    pub fn pending(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Buffer a record, flushing synchronously once the buffer is full.
    pub fn append(&self, record: RequestLogRecord) {
        let mut state = self.lock();
        if state.closed {
            tracing::warn!(path = %record.path, "Request log closed, dropping record");
            return;
        }
        state.buffer.push(record);
        if state.buffer.len() >= self.capacity {
            flush_locked(&mut state);
        }
    }

    /// Write out everything buffered so far.
    pub fn flush(&self) {
        let mut state = self.lock();
        flush_locked(&mut state);
    }

    /// Up to `limit` most recent records, newest first.
    ///
    /// Only the last [`TAIL_WINDOW`] bytes are read; a record cut by the
    /// window boundary and any malformed line are skipped.
    pub fn tail(&self, limit: usize) -> Result<Vec<RequestLogRecord>, LogError> {
        let window = {
            let mut state = self.lock();
            flush_locked(&mut state);
            read_window(&self.path)?
        };

        let text = String::from_utf8_lossy(&window);
        Ok(text
            .split('\n')
            .rev()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .take(limit)
            .collect())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Flush remaining records and release the file. Later calls are no-ops.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        flush_locked(&mut state);
        state.file = None;
        state.closed = true;
        tracing::info!(path = ?self.path, "Request log closed");
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the buffer intact; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn flush_locked(state: &mut State) {
    if state.buffer.is_empty() {
        return;
    }
    let batch = std::mem::take(&mut state.buffer);

    let Some(file) = state.file.as_mut() else {
        tracing::error!(records = batch.len(), "Request log file not open, records lost");
        metrics::record_log_flush(0, batch.len());
        return;
    };

    let mut written = 0;
    let mut failed = 0;
    for record in &batch {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, path = %record.path, "Failed to serialize request log record");
                failed += 1;
                continue;
            }
        };
        line.push(b'\n');
        match file.write_all(&line) {
            Ok(()) => written += 1,
            Err(e) => {
                tracing::error!(error = %e, "Failed to write request log record");
                failed += 1;
            }
        }
    }

    if let Err(e) = file.sync_data() {
        tracing::error!(error = %e, "Failed to sync request log file");
    }

    metrics::record_log_flush(written, failed);
    tracing::debug!(written, failed, "Request log flushed");
}

fn read_window(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len > TAIL_WINDOW {
        file.seek(SeekFrom::End(-(TAIL_WINDOW as i64)))?;
    }
    let mut buf = Vec::with_capacity(len.min(TAIL_WINDOW) as usize);
    file.take(TAIL_WINDOW).read_to_end(&mut buf)?;
    Ok(buf)
}
