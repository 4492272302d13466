//! Output sinks for the record stream.
//!
//! Emission is append-only and at-least-once: a failed run may have emitted
//! some records already, and a retried run emits them again.

use std::io::Write;
use std::sync::Mutex;

use boardsync_core::Record;

use crate::error::SinkError;

pub trait RecordSink: Send + Sync {
    fn emit(&self, record: &Record) -> Result<(), SinkError>;

    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.out.into_inner().map_err(|_| SinkError::Poisoned)
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&self, record: &Record) -> Result<(), SinkError> {
        let line = serde_json::to_string(record)?;
        let mut out = self.out.lock().map_err(|_| SinkError::Poisoned)?;
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.out.lock().map_err(|_| SinkError::Poisoned)?.flush()?;
        Ok(())
    }
}

/// Collects records in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &Record) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}
