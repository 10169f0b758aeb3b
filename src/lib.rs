//! # Transport Logger
//!
//! A logging facade that fans every call out to a set of pluggable
//! transports selected by configuration.
//!
//! ## Features
//!
//! - **Syslog Severities**: nine levels from `emerg` to `http`, each with a color
//! - **Pluggable Transports**: console, daily rotating file, UDP syslog, in-memory,
//!   plus host-registered plug-in sinks
//! - **Failure Isolation**: a broken or panicking sink never reaches the caller;
//!   failures are published on an error channel
//! - **Exception Sink**: panics are reported through a dedicated console sink
//!
//! ## Example
//!
//! ```
//! use transport_logger::prelude::*;
//! use serde_json::json;
//!
//! let handle = MemoryHandle::new();
//! let logger = Logger::builder()
//!     .register("memory", memory_factory(handle.clone()))
//!     .transports(vec![TransportDescriptor::named("memory")])
//!     .test_mode(true)
//!     .build();
//!
//! logger.error("disk failure", [json!({"code": 5})]);
//!
//! let record = handle.last().unwrap();
//! assert_eq!(record.message, "disk failure");
//! assert_eq!(record.meta("code"), Some(&json!(5)));
//! ```

pub mod core;
pub mod macros;
pub mod transports;

pub use crate::core::exception;

pub mod prelude {
    pub use crate::core::{
        Config, ErrorChannel, LogRecord, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
        Result, Severity, Sink, SinkOptions, TransportDescriptor, TransportErrorEvent,
    };
    pub use crate::transports::{memory_factory, ConsoleSink, MemoryHandle, MemorySink};
}

pub use crate::core::{
    global, init_global, sink_factory, Config, ConfigSource, ErrorChannel, LogRecord, Logger,
    LoggerBuilder, LoggerError, LoggerMetrics, Result, Severity, Sink, SinkFactory, SinkOptions,
    TransportDescriptor, TransportErrorEvent,
};
pub use transports::{ConsoleSink, MemoryHandle, MemorySink};
