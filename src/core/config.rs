//! Configuration source consumed by the transport resolver
//!
//! Configuration is a nested key-value tree. Keys are paths whose segments
//! are separated by `:` or `.`, so `log:stdout:level` and `log.stdout.level`
//! address the same value.

use super::error::Result;
use super::registry::TransportDescriptor;
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Environment variable selecting test mode
pub const TEST_MODE_ENV: &str = "LOG_ENV";

/// Key holding the active transport list
pub const LOGGER_KEY: &str = "logger";

/// Abstract key-value store the logger reads its settings from
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<&Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
}

fn split_path(key: &str) -> impl Iterator<Item = &str> {
    key.split([':', '.']).filter(|segment| !segment.is_empty())
}

impl Config {
    /// Empty configuration
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    pub fn from_value(root: Value) -> Self {
        match root {
            Value::Object(_) => Self { root },
            _ => Self::new(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(Self::from_value(serde_json::from_str(text)?))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let root: Value = toml::from_str(text)?;
        Ok(Self::from_value(root))
    }

    /// Built-in defaults for every shipped transport plus the exception sink
    pub fn defaults() -> Self {
        let app = app_name();
        let label = default_label(&app);
        let filename = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(format!("{}.log", app));

        Self::from_value(json!({
            "logger": "stdout",
            "log": {
                "stdout": {
                    "label": label,
                    "prettyPrint": true,
                    "colorize": true,
                    "exitOnError": false,
                    "timestamp": true,
                    "level": "info"
                },
                "stderr": {
                    "label": label,
                    "prettyPrint": true,
                    "colorize": true,
                    "handleExceptions": true,
                    "exitOnError": false,
                    "timestamp": true,
                    "level": "error",
                    "json": false
                },
                "syslog": {
                    "host": "localhost",
                    "port": 514,
                    "app": app,
                    "identity": app,
                    "protocol": "udp4",
                    "type": "BSD",
                    "facility": "local0"
                },
                "file": {
                    "label": label,
                    "dir": ".",
                    "filename": filename.display().to_string(),
                    "prettyPrint": false,
                    "level": "http",
                    "json": false
                }
            }
        }))
    }

    /// Value at a `:`/`.` delimited path
    pub fn get(&self, key: &str) -> Option<&Value> {
        split_path(key).try_fold(&self.root, |node, segment| node.get(segment))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Set a value at `path`, creating intermediate tables as needed
    pub fn set(&mut self, path: &str, value: Value) -> &mut Self {
        let segments: Vec<&str> = split_path(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return self;
        };

        let mut node = &mut self.root;
        for segment in parents {
            node = ensure_table(node)
                .entry(segment.to_string())
                .or_insert(Value::Null);
        }
        ensure_table(node).insert(last.to_string(), value);
        self
    }

    /// Deep-merge `other` over this configuration; values in `other` win
    pub fn merge(&mut self, other: &Config) -> &mut Self {
        merge_values(&mut self.root, &other.root);
        self
    }

    /// Apply command line style overrides.
    ///
    /// `--logger=<name>` / `-l <name>` select transports (repeatable) and
    /// `--log:<transport>:<option>=<value>` sets a transport option.
    /// Unrecognised arguments are ignored.
    pub fn apply_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut loggers: Vec<Value> = Vec::new();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            if let Some(names) = arg
                .strip_prefix("--logger=")
                .or_else(|| arg.strip_prefix("-l="))
            {
                push_names(&mut loggers, names);
            } else if arg == "--logger" || arg == "-l" {
                if let Some(names) = args.next() {
                    push_names(&mut loggers, names.as_ref());
                }
            } else if let Some(rest) = arg.strip_prefix("--log:") {
                if let Some((path, raw)) = rest.split_once('=') {
                    self.set(&format!("log:{}", path), coerce(raw));
                }
            }
        }

        if !loggers.is_empty() {
            self.set(LOGGER_KEY, Value::Array(loggers));
        }
        self
    }

    /// Active transport names, in configured order
    ///
    /// `logger` may be a list or a comma separated string. Empty names are dropped.
    pub fn transport_names(&self) -> Vec<String> {
        let names: Vec<String> = match self.get(LOGGER_KEY) {
            Some(Value::String(list)) => list.split(',').map(|s| s.trim().to_string()).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        names.into_iter().filter(|name| !name.is_empty()).collect()
    }

    /// Pair every active transport name with its `log.<name>` block
    pub fn transport_descriptors(&self) -> Vec<TransportDescriptor> {
        self.transport_names()
            .into_iter()
            .map(|name| {
                let options = self.transport_options(&name);
                TransportDescriptor::new(name, options)
            })
            .collect()
    }

    /// Options block for a transport, or an empty table
    pub fn transport_options(&self, name: &str) -> Value {
        self.get(&format!("log:{}", name))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// True when the environment or the `env` key selects test mode
    pub fn test_mode(&self) -> bool {
        let from_env = std::env::var(TEST_MODE_ENV)
            .map(|v| v.eq_ignore_ascii_case("test"))
            .unwrap_or(false);
        from_env || matches!(self.get("env"), Some(Value::String(env)) if env == "test")
    }
}

/// Append each name of a comma separated `--logger` value
fn push_names(loggers: &mut Vec<Value>, names: &str) {
    loggers.extend(
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Value::String(name.to_string())),
    );
}

impl ConfigSource for Config {
    fn get(&self, key: &str) -> Option<&Value> {
        Config::get(self, key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace a non-table node with an empty table and borrow it as a map
fn ensure_table(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was replaced with a table above"),
    }
}

fn merge_values(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, value) in other_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, other) => *base = other.clone(),
    }
}

/// Turn a raw override string into the most specific JSON value
fn coerce(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

fn app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "app".to_string())
}

fn default_label(app: &str) -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{} ( {} ) {}", app, host, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_with_either_delimiter() {
        let config = Config::defaults();
        assert_eq!(config.get("log:stdout:level"), Some(&json!("info")));
        assert_eq!(config.get("log.stderr.level"), Some(&json!("error")));
        assert_eq!(config.get("log:nope:level"), None);
    }

    #[test]
    fn test_transport_names_from_string() {
        let mut config = Config::new();
        config.set("logger", json!("stdout , file,, syslog"));
        assert_eq!(config.transport_names(), vec!["stdout", "file", "syslog"]);
    }

    #[test]
    fn test_transport_names_from_list() {
        let mut config = Config::new();
        config.set("logger", json!(["memory", "", "stdout"]));
        assert_eq!(config.transport_names(), vec!["memory", "stdout"]);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::defaults();
        config.apply_args([
            "server",
            "--logger=stdout",
            "-l",
            "syslog",
            "--log:stdout:prettyPrint=0",
            "--log:syslog:host=logs.internal",
        ]);

        assert_eq!(config.transport_names(), vec!["stdout", "syslog"]);
        assert_eq!(config.get("log:stdout:prettyPrint"), Some(&json!(0)));
        assert_eq!(config.get("log:syslog:host"), Some(&json!("logs.internal")));
        // untouched defaults survive
        assert_eq!(config.get("log:stdout:level"), Some(&json!("info")));
    }

    #[test]
    fn test_apply_args_splits_comma_lists() {
        let mut config = Config::new();
        config.apply_args(["--logger=stdout, syslog", "-l", "file,memory"]);
        assert_eq!(
            config.transport_names(),
            vec!["stdout", "syslog", "file", "memory"]
        );

        let mut config = Config::new();
        config.apply_args(["--logger=stdout,syslog"]);
        assert_eq!(config.transport_names(), vec!["stdout", "syslog"]);
    }

    #[test]
    fn test_merge_is_deep() {
        let mut base = Config::defaults();
        let overlay = Config::from_json_str(r#"{"log": {"file": {"level": "debug"}}}"#).unwrap();
        base.merge(&overlay);

        assert_eq!(base.get("log:file:level"), Some(&json!("debug")));
        assert_eq!(base.get("log:file:json"), Some(&json!(false)));
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            logger = ["memory"]

            [log.memory]
            level = "warning"
            "#,
        )
        .unwrap();

        assert_eq!(config.transport_names(), vec!["memory"]);
        let descriptors = config.transport_descriptors();
        assert_eq!(descriptors[0].options["level"], json!("warning"));
    }

    #[test]
    fn test_missing_block_is_empty_table() {
        let mut config = Config::new();
        config.set("logger", json!("custom"));
        let descriptors = config.transport_descriptors();
        assert_eq!(descriptors[0].options, json!({}));
    }

    #[test]
    fn test_env_key_selects_test_mode() {
        let mut config = Config::new();
        config.set("env", json!("test"));
        assert!(config.test_mode());
    }
}
