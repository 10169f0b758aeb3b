//! Exception reporting: trace parsing, host information and the exception sink
//!
//! The exception sink is separate from the transport registry. It writes
//! through its own console sink, so a broken transport cannot hide the report
//! of the failure it caused.

use super::{
    error::Result,
    isolation::isolate,
    record::{LogRecord, Metadata},
    severity::Severity,
    sink::Sink,
};
use crate::transports::console::{ConsoleSink, ConsoleTarget};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::backtrace::Backtrace;

/// One frame of a parsed backtrace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub index: usize,
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsInfo {
    /// 1, 5 and 15 minute load averages
    pub loadavg: [f64; 3],
    /// System uptime in seconds
    pub uptime: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Current resident set size
    pub rss_bytes: Option<u64>,
    /// Peak resident set size
    pub max_rss_kb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub cwd: Option<String>,
    pub exec_path: Option<String>,
    /// Version of this crate, standing in for the runtime version
    pub version: String,
    pub argv: Vec<String>,
    pub memory_usage: MemoryUsage,
}

/// Parse a captured backtrace into frames
pub fn get_trace(backtrace: &Backtrace) -> Vec<TraceFrame> {
    parse_trace(&backtrace.to_string())
}

/// Parse the text form of a backtrace.
///
/// Frame lines look like `  12: crate::module::function` and may be followed
/// by a location line `at /path/to/file.rs:10:5`.
pub fn parse_trace(text: &str) -> Vec<TraceFrame> {
    let mut frames: Vec<TraceFrame> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line, column) = parse_location(location);
                    frame.file = Some(file);
                    frame.line = line;
                    frame.column = column;
                }
            }
            continue;
        }

        if let Some((index, function)) = trimmed.split_once(": ") {
            if let Ok(index) = index.parse::<usize>() {
                frames.push(TraceFrame {
                    index,
                    function: function.to_string(),
                    file: None,
                    line: None,
                    column: None,
                });
            }
        }
    }

    frames
}

fn parse_location(location: &str) -> (String, Option<u32>, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle.and_then(|m| m.parse().ok()), last.and_then(|l| l.parse().ok())) {
        (Some(file), Some(line), Some(column)) => (file.to_string(), Some(line), Some(column)),
        _ => (location.to_string(), None, None),
    }
}

/// Current load averages and uptime; zeros where the platform offers neither
pub fn get_os_info() -> OsInfo {
    OsInfo {
        loadavg: load_average(),
        uptime: uptime_secs(),
    }
}

/// Identity, location and memory usage of the current process
pub fn get_process_info() -> ProcessInfo {
    let (uid, gid) = user_ids();

    ProcessInfo {
        pid: std::process::id(),
        uid,
        gid,
        cwd: std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string()),
        exec_path: std::env::current_exe()
            .ok()
            .map(|p| p.display().to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        argv: std::env::args().collect(),
        memory_usage: MemoryUsage {
            rss_bytes: resident_bytes(),
            max_rss_kb: max_rss_kb(),
        },
    }
}

/// Metadata describing an uncaught failure
pub fn get_all_info(message: &str, backtrace: &Backtrace) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("error".to_string(), Value::String(message.to_string()));
    metadata.insert(
        "date".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    metadata.insert("process".to_string(), to_value(&get_process_info()));
    metadata.insert("os".to_string(), to_value(&get_os_info()));
    metadata.insert("trace".to_string(), to_value(&get_trace(backtrace)));
    metadata
}

/// Error-level record enriched with [`get_all_info`]
pub fn exception_record(message: &str, backtrace: &Backtrace) -> LogRecord {
    LogRecord::new(
        Severity::Error,
        "uncaught exception: %s",
        vec![json!(message)],
    )
    .with_metadata(get_all_info(message, backtrace))
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(target_os = "linux")]
fn load_average() -> [f64; 3] {
    let Ok(text) = std::fs::read_to_string("/proc/loadavg") else {
        return [0.0; 3];
    };
    let mut values = text
        .split_whitespace()
        .take(3)
        .map(|v| v.parse::<f64>().unwrap_or(0.0));
    [
        values.next().unwrap_or(0.0),
        values.next().unwrap_or(0.0),
        values.next().unwrap_or(0.0),
    ]
}

#[cfg(not(target_os = "linux"))]
fn load_average() -> [f64; 3] {
    [0.0; 3]
}

#[cfg(target_os = "linux")]
fn uptime_secs() -> u64 {
    std::fs::read_to_string("/proc/uptime")
        .ok()
        .and_then(|text| text.split_whitespace().next()?.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn uptime_secs() -> u64 {
    0
}

#[cfg(target_os = "linux")]
fn resident_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    // SAFETY: sysconf has no preconditions
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(page_size).ok().map(|size| pages * size)
}

#[cfg(not(target_os = "linux"))]
fn resident_bytes() -> Option<u64> {
    None
}

#[cfg(unix)]
fn max_rss_kb() -> Option<u64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage fills the struct it is handed; it is zeroed beforehand
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: getrusage returned success, so the struct is initialized
    let usage = unsafe { usage.assume_init() };
    let raw = u64::try_from(usage.ru_maxrss).ok()?;
    // ru_maxrss is bytes on macOS, kilobytes elsewhere
    Some(if cfg!(target_os = "macos") { raw / 1024 } else { raw })
}

#[cfg(not(unix))]
fn max_rss_kb() -> Option<u64> {
    None
}

#[cfg(unix)]
fn user_ids() -> (Option<u32>, Option<u32>) {
    // SAFETY: getuid/getgid always succeed
    unsafe { (Some(libc::getuid()), Some(libc::getgid())) }
}

#[cfg(not(unix))]
fn user_ids() -> (Option<u32>, Option<u32>) {
    (None, None)
}

/// Console sink reserved for uncaught failures
///
/// Its threshold is always `error`, whatever the `log.stderr` block says.
pub struct ExceptionSink {
    sink: Mutex<Box<dyn Sink>>,
}

impl ExceptionSink {
    pub fn new(sink: Box<dyn Sink>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Build the stderr console sink from a `log.stderr` block
    pub fn from_options(options: &Value) -> Result<Self> {
        let console = ConsoleSink::from_transport_options("stderr", options)?
            .with_level(Severity::Error)
            .with_target(ConsoleTarget::Stderr);
        Ok(Self::new(Box::new(console)))
    }

    /// Plain stderr console sink, used when `log.stderr` is unusable
    pub fn fallback() -> Self {
        Self::new(Box::new(ConsoleSink::stderr().with_level(Severity::Error)))
    }

    pub fn write(&self, record: &LogRecord) -> Result<()> {
        isolate("exception", "write", || {
            let mut sink = self.sink.lock();
            sink.write(record)?;
            sink.flush()
        })
    }

    /// Format and write an uncaught failure
    pub fn report(&self, message: &str, backtrace: &Backtrace) -> Result<()> {
        self.write(&exception_record(message, backtrace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;
    use crate::transports::memory::MemorySink;

    const SAMPLE: &str = "   0: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   1: my_app::handler::run
             at ./src/handler.rs:42:9
   2: main
";

    #[test]
    fn test_parse_trace() {
        let frames = parse_trace(SAMPLE);
        assert_eq!(frames.len(), 3);

        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[1].function, "my_app::handler::run");
        assert_eq!(frames[1].file.as_deref(), Some("./src/handler.rs"));
        assert_eq!(frames[1].line, Some(42));
        assert_eq!(frames[1].column, Some(9));

        assert_eq!(frames[2].function, "main");
        assert!(frames[2].file.is_none());
    }

    #[test]
    fn test_parse_location_without_numbers() {
        let frames = parse_trace("   0: f\n             at <unknown>\n");
        assert_eq!(frames[0].file.as_deref(), Some("<unknown>"));
        assert_eq!(frames[0].line, None);
    }

    #[test]
    fn test_process_info() {
        let info = get_process_info();
        assert_eq!(info.pid, std::process::id());
        assert!(!info.argv.is_empty());
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        #[cfg(unix)]
        assert!(info.uid.is_some());
    }

    #[test]
    fn test_os_info_is_sane() {
        let info = get_os_info();
        assert!(info.loadavg.iter().all(|l| *l >= 0.0));
    }

    #[test]
    fn test_exception_record_metadata() {
        let record = exception_record("boom", &Backtrace::force_capture());
        assert_eq!(record.level, Severity::Error);
        assert_eq!(record.message, "uncaught exception: boom");
        assert_eq!(record.meta("error"), Some(&json!("boom")));
        assert!(record.meta("process").unwrap()["pid"].is_number());
        assert!(record.meta("os").unwrap()["loadavg"].is_array());
        assert!(record.meta("trace").unwrap().is_array());
    }

    #[test]
    fn test_exception_sink_writes_through_its_own_sink() {
        let memory = MemorySink::new();
        let handle = memory.handle();
        let sink = ExceptionSink::new(Box::new(memory));

        sink.report("kaboom", &Backtrace::force_capture()).unwrap();
        assert_eq!(handle.messages(), vec!["uncaught exception: kaboom"]);
    }

    #[test]
    fn test_bad_stderr_block_is_reported_as_stderr() {
        match ExceptionSink::from_options(&json!({"stderrLevels": ["nope"]})) {
            Err(LoggerError::InvalidConfiguration { component, .. }) => {
                assert_eq!(component, "stderr")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("invalid stderrLevels accepted"),
        }
    }
}
