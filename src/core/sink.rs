//! Sink trait for log output destinations

use super::{
    error::{LoggerError, Result},
    record::LogRecord,
    severity::Severity,
};
use serde_json::Value;

pub trait Sink: Send {
    /// Write one record. Sinks apply their own level threshold.
    fn write(&mut self, record: &LogRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Kind of sink, e.g. `"stdout"` or `"file"`
    fn name(&self) -> &str;
}

/// Typed read access to a transport's option block
///
/// Option values come from configuration files and command line overrides,
/// so booleans accept `0`/`1` and `"true"`/`"false"` as well as JSON booleans.
#[derive(Debug, Clone, Copy)]
pub struct SinkOptions<'a> {
    transport: &'a str,
    options: &'a Value,
}

impl<'a> SinkOptions<'a> {
    pub fn new(transport: &'a str, options: &'a Value) -> Self {
        Self { transport, options }
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        match self.options.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.raw(key).and_then(Value::as_str)
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or(default).to_string()
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.raw(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !matches!(s.trim(), "" | "0" | "false" | "no" | "off"),
            _ => default,
        }
    }

    pub fn u64(&self, key: &str) -> Result<Option<u64>> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| self.invalid(key, n)),
            Some(Value::String(s)) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| self.invalid(key, s)),
            Some(other) => Err(self.invalid(key, other)),
        }
    }

    /// Threshold from the `level` key; unknown names are configuration errors
    pub fn level_or(&self, default: Severity) -> Result<Severity> {
        match self.str("level") {
            Some(name) => name.parse::<Severity>().map_err(|e| {
                LoggerError::config(self.transport, e.to_string())
            }),
            None => Ok(default),
        }
    }

    /// List of level names from a list or comma separated string
    pub fn levels(&self, key: &str) -> Result<Vec<Severity>> {
        let names: Vec<String> = match self.raw(key) {
            None => return Ok(Vec::new()),
            Some(Value::String(s)) => s.split(',').map(|n| n.trim().to_string()).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(|| self.invalid(key, item)))
                .collect::<Result<_>>()?,
            Some(other) => return Err(self.invalid(key, other)),
        };

        names
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| {
                name.parse::<Severity>()
                    .map_err(|e| LoggerError::config(self.transport, e.to_string()))
            })
            .collect()
    }

    fn invalid(&self, key: &str, value: impl std::fmt::Display) -> LoggerError {
        LoggerError::config(self.transport, format!("invalid value for '{}': {}", key, value))
    }
}
