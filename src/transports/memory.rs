//! In-memory sink
//!
//! Keeps records in a shared, bounded buffer. Mostly useful in tests and as
//! a no-op transport; the [`MemoryHandle`] lets the host inspect what was written.

use crate::core::{
    registry::{sink_factory, SinkFactory},
    LogRecord, Result, Severity, Sink, SinkOptions,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// Shared view of the records held by one or more memory sinks
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
}

impl MemoryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn last(&self) -> Option<LogRecord> {
        self.records.lock().back().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

/// Records kept by a configured memory sink that sets no `capacity`
pub const DEFAULT_CAPACITY: usize = 10_000;

pub struct MemorySink {
    level: Severity,
    capacity: Option<usize>,
    handle: MemoryHandle,
}

impl MemorySink {
    /// Memory sink accepting every level
    pub fn new() -> Self {
        Self::with_handle(MemoryHandle::new())
    }

    pub fn with_handle(handle: MemoryHandle) -> Self {
        Self {
            level: Severity::Http,
            capacity: None,
            handle,
        }
    }

    /// Build from a `log.memory` block: `level`, `capacity`
    ///
    /// `capacity` defaults to [`DEFAULT_CAPACITY`].
    pub fn from_options(options: &Value, handle: MemoryHandle) -> Result<Self> {
        let options = SinkOptions::new("memory", options);
        Ok(Self {
            level: options.level_or(Severity::Http)?,
            capacity: Some(
                options
                    .u64("capacity")?
                    .map_or(DEFAULT_CAPACITY, |c| c as usize),
            ),
            handle,
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Keep at most `capacity` records, dropping the oldest
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MemorySink {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        if !record.level.passes(self.level) {
            return Ok(());
        }

        let mut records = self.handle.records.lock();
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Ok(());
            }
            while records.len() >= capacity {
                records.pop_front();
            }
        }
        records.push_back(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Factory whose sinks all write into `handle`
pub fn memory_factory(handle: MemoryHandle) -> SinkFactory {
    sink_factory(move |options| {
        Ok(Box::new(MemorySink::from_options(options, handle.clone())?) as Box<dyn Sink>)
    })
}
