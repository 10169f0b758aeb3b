//! Core logger types and traits

pub mod config;
pub mod error;
pub mod exception;
pub mod format;
pub mod isolation;
pub mod logger;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod severity;
pub mod sink;

pub use config::{Config, ConfigSource, LOGGER_KEY, TEST_MODE_ENV};
pub use error::{LoggerError, Result, TransportErrorEvent};
pub use exception::{ExceptionSink, OsInfo, ProcessInfo, TraceFrame};
pub use format::RecordFormat;
pub use isolation::{isolate, ErrorChannel, ErrorListener};
pub use logger::{global, init_global, Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use record::{LogRecord, Metadata};
pub use registry::{
    sink_factory, DispatchOutcome, SinkFactory, TransportDescriptor, TransportRegistry,
    TransportResolver,
};
pub use severity::{rank_of, Severity};
pub use sink::{Sink, SinkOptions};
