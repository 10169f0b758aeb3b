//! Integration tests for the transport logger
//!
//! These tests verify:
//! - Transport resolution and registry order
//! - Failure isolation and the error channel
//! - Message formatting and metadata
//! - File transport and log injection prevention
//! - Configuration from TOML and command line overrides
//! - Test mode and the exception sink

use parking_lot::Mutex;
use serde_json::json;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use transport_logger::core::{rank_of, DispatchOutcome, LogRecord};
use transport_logger::prelude::*;
use transport_logger::{sink_factory, SinkFactory};

/// Error listener that keeps every event
fn collecting_listener() -> (Arc<Mutex<Vec<TransportErrorEvent>>>, transport_logger::core::ErrorListener) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    (
        events,
        Arc::new(move |event: &TransportErrorEvent| sink.lock().push(event.clone())),
    )
}

/// Sink that counts write attempts and optionally fails every one
struct CountingSink {
    name: &'static str,
    attempts: Arc<AtomicUsize>,
    fail: bool,
}

impl Sink for CountingSink {
    fn write(&mut self, _record: &LogRecord) -> transport_logger::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(LoggerError::write(self.name, "device unplugged"))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn counting_factory(name: &'static str, attempts: Arc<AtomicUsize>, fail: bool) -> SinkFactory {
    sink_factory(move |_options| {
        Ok(Box::new(CountingSink {
            name,
            attempts: Arc::clone(&attempts),
            fail,
        }) as Box<dyn Sink>)
    })
}

#[test]
fn test_unknown_transport_is_skipped() {
    let (events, listener) = collecting_listener();
    let config = Config::from_value(json!({ "logger": ["stdout", "bogus"] }));

    let logger = Logger::builder()
        .config(config)
        .without_default_error_listener()
        .error_listener(listener)
        .test_mode(true)
        .build();

    assert_eq!(logger.sink_names(), vec!["stdout"]);

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "bogus");
    assert!(events[0].stack.starts_with("InvalidLogType"));
    assert_eq!(logger.metrics().resolution_failures(), 1);
}

#[test]
fn test_error_with_metadata_reaches_stdout() {
    let handle = MemoryHandle::new();
    let (events, listener) = collecting_listener();

    let logger = Logger::builder()
        .config(Config::from_value(json!({ "logger": "stdout" })))
        .register("stdout", memory_factory(handle.clone()))
        .without_default_error_listener()
        .error_listener(listener)
        .test_mode(true)
        .build();

    logger.error("disk failure", [json!({ "code": 5 })]);

    let record = handle.last().expect("stdout received nothing");
    assert_eq!(record.level, Severity::Error);
    assert_eq!(record.message, "disk failure");
    assert_eq!(record.metadata, json!({ "code": 5 }).as_object().cloned());
    assert!(events.lock().is_empty());
}

#[test]
fn test_registry_preserves_configured_order() {
    let handle = MemoryHandle::new();
    let config = Config::from_value(json!({ "logger": "memory, stdout, memory" }));

    let logger = Logger::builder()
        .config(config)
        .register("memory", memory_factory(handle.clone()))
        .without_default_error_listener()
        .test_mode(true)
        .build();

    assert_eq!(logger.sink_names(), vec!["memory", "stdout", "memory"]);

    logger.info("twice", []);
    assert_eq!(handle.len(), 2);
}

#[test]
fn test_failing_sink_does_not_stop_fan_out() {
    let first = Arc::new(AtomicUsize::new(0));
    let broken = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));
    let (events, listener) = collecting_listener();

    let logger = Logger::builder()
        .register("first", counting_factory("first", Arc::clone(&first), false))
        .register("broken", counting_factory("broken", Arc::clone(&broken), true))
        .register("last", counting_factory("last", Arc::clone(&last), false))
        .transports(vec![
            TransportDescriptor::named("first"),
            TransportDescriptor::named("broken"),
            TransportDescriptor::named("last"),
        ])
        .without_default_error_listener()
        .error_listener(listener)
        .test_mode(true)
        .build();

    let record = LogRecord::new(Severity::Crit, "replica lost", Vec::new());
    let outcome = logger.log_record(&record);
    assert_eq!(
        outcome,
        DispatchOutcome {
            attempted: 3,
            failed: 1
        }
    );

    logger.crit("again", []);

    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert_eq!(broken.load(Ordering::SeqCst), 2);
    assert_eq!(last.load(Ordering::SeqCst), 2);

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.name == "broken"));
    assert!(events[0].message.contains("device unplugged"));
    assert_eq!(logger.metrics().write_failures(), 2);
}

#[test]
fn test_warning_formats_and_keeps_rank() {
    let handle = MemoryHandle::new();
    let logger = Logger::builder()
        .register("memory", memory_factory(handle.clone()))
        .transport(TransportDescriptor::named("memory"))
        .test_mode(true)
        .build();

    logger.warning("value is %d", [json!(42)]);

    let record = handle.last().expect("nothing logged");
    assert_eq!(record.message, "value is 42");
    assert_eq!(record.level.rank(), rank_of("warning").unwrap());
    assert_eq!(record.level.rank(), 4);
}

#[test]
fn test_unknown_severity_is_returned() {
    let logger = Logger::builder().transports(Vec::new()).test_mode(true).build();

    let err = logger.log("chatty", "hello", []).unwrap_err();
    assert!(matches!(err, LoggerError::UnknownSeverity(_)));
}

#[test]
fn test_no_usable_transport_still_logs_safely() {
    let logger = Logger::builder()
        .config(Config::from_value(json!({ "logger": ["bogus", "phantom"] })))
        .without_default_error_listener()
        .test_mode(true)
        .build();

    assert_eq!(logger.sink_count(), 0);
    logger.emerg("nobody hears this", []);
    assert_eq!(logger.metrics().records_dispatched(), 1);
    assert_eq!(logger.errors().emitted_count(), 2);
}

#[test]
fn test_file_transport_from_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config::from_value(json!({
        "logger": ["file"],
        "log": {
            "file": {
                "dir": temp_dir.path().to_str().unwrap(),
                "filename": "service.log",
                "level": "info",
                "label": "billing"
            }
        }
    }));

    let logger = Logger::builder()
        .config(config)
        .without_default_error_listener()
        .test_mode(true)
        .build();

    logger.info("invoice %s sent", [json!("A-17"), json!({ "amount": 12 })]);
    logger.debug("below the file threshold", []);
    logger.flush();

    let content = fs::read_to_string(temp_dir.path().join("service.log"))
        .expect("Failed to read log file");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("info: [billing] invoice A-17 sent amount=12"));
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config::from_value(json!({
        "logger": "file",
        "log": { "file": { "dir": temp_dir.path().to_str().unwrap(), "filename": "audit.log" } }
    }));
    let logger = Logger::builder().config(config).test_mode(true).build();

    let malicious = "User login\nerror: fake entry injected\ninfo: continuation";
    logger.info(malicious, []);
    logger.flush();

    let content = fs::read_to_string(temp_dir.path().join("audit.log")).unwrap();
    assert!(content.contains("\\n"));
    assert_eq!(content.lines().count(), 1, "Log should be a single line");
}

#[test]
fn test_construction_failure_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, "occupied").unwrap();

    let (events, listener) = collecting_listener();
    let config = Config::from_value(json!({
        "logger": ["file", "stdout"],
        "log": { "file": { "dir": blocker.to_str().unwrap(), "filename": "app.log" } }
    }));

    let logger = Logger::builder()
        .config(config)
        .without_default_error_listener()
        .error_listener(listener)
        .test_mode(true)
        .build();

    assert_eq!(logger.sink_names(), vec!["stdout"]);
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "file");
    assert!(events[0].stack.starts_with("SinkConstructionError"));
    assert_eq!(logger.metrics().construction_failures(), 1);
}

#[test]
fn test_toml_config_and_cli_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::from_toml_str(
        r#"
        logger = "stdout"

        [log.memory]
        level = "debug"
        "#,
    )
    .unwrap();

    let handle = MemoryHandle::new();
    let dir_arg = format!("--log:file:dir={}", temp_dir.path().display());
    let logger = Logger::builder()
        .config(config)
        .args(["--logger=memory", "-l", "file", dir_arg.as_str(), "--log:file:filename=cli.log"])
        .register("memory", memory_factory(handle.clone()))
        .without_default_error_listener()
        .test_mode(true)
        .build();

    assert_eq!(logger.sink_names(), vec!["memory", "file"]);

    logger.debug("kept by memory", []);
    logger.http("dropped by memory", []);
    logger.flush();

    assert_eq!(handle.messages(), vec!["kept by memory"]);
    let content = fs::read_to_string(temp_dir.path().join("cli.log")).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn test_test_mode_from_config_skips_exception_hook() {
    let exceptions = MemorySink::new();
    let handle = exceptions.handle();

    let logger = Logger::builder()
        .config(Config::from_value(json!({ "env": "test" })))
        .transports(Vec::new())
        .exception_sink(Box::new(exceptions))
        .build();

    assert!(!logger.exception_hook_installed());

    logger.handle_exception("worker crashed", &std::backtrace::Backtrace::force_capture());
    let record = handle.last().expect("exception sink unused");
    assert_eq!(record.message, "uncaught exception: worker crashed");
    assert!(record.meta("process").is_some());
    assert!(record.meta("os").is_some());
}

#[test]
fn test_plugin_module_transport() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let config = Config::from_value(json!({
        "logger": ["audit"],
        "log": { "audit": { "module": "acme-audit" } }
    }));

    let logger = Logger::builder()
        .config(config)
        .module("acme-audit", counting_factory("audit", Arc::clone(&attempts), false))
        .without_default_error_listener()
        .test_mode(true)
        .build();

    logger.notice("shipped", []);
    assert_eq!(logger.sink_names(), vec!["audit"]);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unregistered_module_is_resolution_error() {
    let (events, listener) = collecting_listener();
    let config = Config::from_value(json!({
        "logger": ["audit"],
        "log": { "audit": { "module": "missing-plugin" } }
    }));

    let logger = Logger::builder()
        .config(config)
        .without_default_error_listener()
        .error_listener(listener)
        .test_mode(true)
        .build();

    assert_eq!(logger.sink_count(), 0);
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert!(events[0].message.contains("missing-plugin"));
}
