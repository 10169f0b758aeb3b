//! Log record structure and printf-style message interpolation

use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;

/// Structured metadata attached to a record
pub type Metadata = Map<String, Value>;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Severity,
    /// Message after placeholder substitution
    pub message: String,
    /// Positional arguments the message was formatted with
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
}

impl LogRecord {
    /// Build a record from a format string and its trailing arguments.
    ///
    /// A trailing JSON object is lifted out as metadata; the remaining
    /// arguments are substituted into `format`.
    pub fn new(level: Severity, format: &str, args: Vec<Value>) -> Self {
        let (args, metadata) = split_metadata(args);
        let message = format_message(format, &args);

        Self {
            level,
            message: sanitize_message(&message),
            args,
            metadata,
            timestamp: Utc::now(),
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        match self.metadata {
            Some(ref mut existing) => existing.extend(metadata),
            None => self.metadata = Some(metadata),
        }
        self
    }

    /// Metadata value by key
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

/// Replace control characters so a record always renders on one line
fn sanitize_message(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Convert any serializable value into a log argument
pub fn to_arg<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Split a trailing object off the argument list as metadata
pub fn split_metadata(mut args: Vec<Value>) -> (Vec<Value>, Option<Metadata>) {
    match args.pop() {
        Some(Value::Object(map)) => (args, Some(map)),
        Some(other) => {
            args.push(other);
            (args, None)
        }
        None => (args, None),
    }
}

/// Interpolate printf-style placeholders.
///
/// Supported: `%s` string, `%d` number, `%i` integer, `%f` float,
/// `%j`/`%o`/`%O` JSON, `%%` literal percent. A placeholder with no argument
/// left is kept verbatim; surplus arguments are appended separated by spaces.
pub fn format_message(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len() + args.len() * 8);
    let mut remaining = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O')) => {
                chars.next();
                match remaining.next() {
                    Some(arg) => out.push_str(&render_placeholder(spec, arg)),
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            _ => out.push('%'),
        }
    }

    for arg in remaining {
        out.push(' ');
        out.push_str(&render_string(arg));
    }

    out
}

fn render_placeholder(spec: char, arg: &Value) -> String {
    match spec {
        's' => render_string(arg),
        'd' => as_number(arg).map_or_else(|| "NaN".to_string(), render_number),
        'i' => as_number(arg).map_or_else(|| "NaN".to_string(), |n| render_number(n.trunc())),
        'f' => as_number(arg).map_or_else(|| "NaN".to_string(), |n| n.to_string()),
        _ => serde_json::to_string(arg).unwrap_or_else(|_| "null".to_string()),
    }
}

fn render_string(arg: &Value) -> String {
    match arg {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(arg: &Value) -> Option<f64> {
    match arg {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
