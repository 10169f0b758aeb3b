//! Rendering of log records for text-oriented sinks
//!
//! Two layouts are supported:
//! - text: `2025-01-08T10:30:45.123Z - warning: [api ( host ) 42] disk low code=5`
//! - JSON: `{"level":"warning","message":"disk low","label":"...","timestamp":"...","code":5}`

use super::{record::LogRecord, sink::SinkOptions};
use chrono::SecondsFormat;
use serde_json::{Map, Value};

/// Per-sink rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFormat {
    pub label: Option<String>,
    pub timestamp: bool,
    pub colorize: bool,
    /// Multi-line metadata in text mode, indented output in JSON mode
    pub pretty_print: bool,
    pub json: bool,
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self {
            label: None,
            timestamp: true,
            colorize: false,
            pretty_print: false,
            json: false,
        }
    }
}

impl RecordFormat {
    /// Read `label`, `timestamp`, `colorize`, `prettyPrint` and `json`
    pub fn from_options(options: &SinkOptions<'_>, defaults: RecordFormat) -> Self {
        Self {
            label: options.str("label").map(str::to_string).or(defaults.label),
            timestamp: options.bool_or("timestamp", defaults.timestamp),
            colorize: options.bool_or("colorize", defaults.colorize),
            pretty_print: options.bool_or("prettyPrint", defaults.pretty_print),
            json: options.bool_or("json", defaults.json),
        }
    }

    pub fn render(&self, record: &LogRecord) -> String {
        if self.json {
            self.render_json(record)
        } else {
            self.render_text(record)
        }
    }

    fn render_text(&self, record: &LogRecord) -> String {
        let mut line = String::with_capacity(record.message.len() + 64);

        if self.timestamp {
            line.push_str(&record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));
            line.push_str(" - ");
        }

        if self.colorize {
            line.push_str(&record.level.paint(record.level.to_str()).to_string());
        } else {
            line.push_str(record.level.to_str());
        }
        line.push_str(": ");

        if let Some(ref label) = self.label {
            line.push('[');
            line.push_str(label);
            line.push_str("] ");
        }

        line.push_str(&record.message);

        if let Some(ref metadata) = record.metadata {
            if !metadata.is_empty() {
                if self.pretty_print {
                    let pretty = serde_json::to_string_pretty(metadata).unwrap_or_default();
                    line.push('\n');
                    line.push_str(&pretty);
                } else {
                    line.push(' ');
                    line.push_str(&format_fields(metadata));
                }
            }
        }

        line
    }

    fn render_json(&self, record: &LogRecord) -> String {
        let mut object = Map::new();
        object.insert("level".to_string(), Value::String(record.level.to_str().to_string()));
        object.insert("message".to_string(), Value::String(record.message.clone()));
        if let Some(ref label) = self.label {
            object.insert("label".to_string(), Value::String(label.clone()));
        }
        if self.timestamp {
            object.insert(
                "timestamp".to_string(),
                Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }

        // Metadata keys never overwrite the fixed fields
        if let Some(ref metadata) = record.metadata {
            for (key, value) in metadata {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let value = Value::Object(object);
        let rendered = if self.pretty_print {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered.unwrap_or_default()
    }
}

/// Format metadata as `key=value` pairs, strings unquoted
pub fn format_fields(metadata: &Map<String, Value>) -> String {
    metadata
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::severity::Severity;
    use serde_json::json;

    fn record() -> LogRecord {
        LogRecord::new(Severity::Warning, "disk %s", vec![json!("low"), json!({"code": 5})])
    }

    #[test]
    fn test_text_layout() {
        let format = RecordFormat {
            label: Some("api".to_string()),
            timestamp: false,
            ..RecordFormat::default()
        };
        assert_eq!(format.render(&record()), "warning: [api] disk low code=5");
    }

    #[test]
    fn test_text_with_timestamp() {
        let rendered = RecordFormat::default().render(&record());
        let (timestamp, rest) = rendered.split_once(" - ").unwrap();
        assert!(timestamp.ends_with('Z'));
        assert_eq!(rest, "warning: disk low code=5");
    }

    #[test]
    fn test_pretty_metadata_is_multiline() {
        let format = RecordFormat {
            timestamp: false,
            pretty_print: true,
            ..RecordFormat::default()
        };
        let rendered = format.render(&record());
        assert!(rendered.starts_with("warning: disk low\n{"));
        assert!(rendered.contains("\"code\": 5"));
    }

    #[test]
    fn test_json_layout() {
        let format = RecordFormat {
            label: Some("api".to_string()),
            json: true,
            ..RecordFormat::default()
        };
        let parsed: Value = serde_json::from_str(&format.render(&record())).unwrap();
        assert_eq!(parsed["level"], "warning");
        assert_eq!(parsed["message"], "disk low");
        assert_eq!(parsed["label"], "api");
        assert_eq!(parsed["code"], 5);
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn test_metadata_cannot_clobber_level() {
        let format = RecordFormat {
            json: true,
            ..RecordFormat::default()
        };
        let record = LogRecord::new(Severity::Info, "x", vec![json!({"level": "emerg"})]);
        let parsed: Value = serde_json::from_str(&format.render(&record)).unwrap();
        assert_eq!(parsed["level"], "info");
    }
}
