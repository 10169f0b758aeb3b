//! Console sink implementation

use crate::core::{
    format::RecordFormat, LogRecord, LoggerError, Result, Severity, Sink, SinkOptions,
};
use serde_json::Value;
use std::io::Write;

/// Stream a console sink writes to by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

pub struct ConsoleSink {
    level: Severity,
    format: RecordFormat,
    target: ConsoleTarget,
    /// Levels routed to stderr regardless of `target`
    stderr_levels: Vec<Severity>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            level: Severity::Info,
            format: RecordFormat {
                colorize: true,
                ..RecordFormat::default()
            },
            target: ConsoleTarget::Stdout,
            stderr_levels: Vec::new(),
        }
    }

    /// Console sink writing everything to stderr
    pub fn stderr() -> Self {
        Self::new().with_target(ConsoleTarget::Stderr)
    }

    /// Build from a `log.stdout` style block.
    ///
    /// Options: `level`, `label`, `colorize`, `timestamp`, `prettyPrint`,
    /// `json`, `stderrLevels`.
    pub fn from_options(options: &Value) -> Result<Self> {
        Self::from_transport_options("stdout", options)
    }

    /// Like [`ConsoleSink::from_options`], reporting bad options against `transport`
    pub fn from_transport_options(transport: &str, options: &Value) -> Result<Self> {
        let opts = SinkOptions::new(transport, options);
        let defaults = Self::new();

        Ok(Self {
            level: opts.level_or(defaults.level)?,
            format: RecordFormat::from_options(&opts, defaults.format),
            target: ConsoleTarget::Stdout,
            stderr_levels: opts.levels("stderrLevels")?,
        })
    }

    #[must_use]
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    fn target_for(&self, level: Severity) -> ConsoleTarget {
        if self.stderr_levels.contains(&level) {
            ConsoleTarget::Stderr
        } else {
            self.target
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        if !record.level.passes(self.level) {
            return Ok(());
        }

        let output = self.format.render(record);
        let written = match self.target_for(record.level) {
            ConsoleTarget::Stdout => writeln!(std::io::stdout().lock(), "{}", output),
            ConsoleTarget::Stderr => writeln!(std::io::stderr().lock(), "{}", output),
        };
        written.map_err(|e| LoggerError::io_operation("writing to console", "write failed", e))
    }

    fn flush(&mut self) -> Result<()> {
        // Flush both streams since stderrLevels may route to either
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}
