//! Fan-out logger
//!
//! [`Logger`] owns the transport registry and the exception sink. Every call
//! builds one [`LogRecord`] and hands it to each sink in registry order;
//! sink failures go to the error channel, never to the caller.

use super::{
    config::Config,
    error::{LoggerError, Result},
    exception::{exception_record, ExceptionSink},
    isolation::{panic_message, within_boundary, ErrorChannel, ErrorListener},
    metrics::LoggerMetrics,
    record::LogRecord,
    registry::{DispatchOutcome, SinkFactory, TransportDescriptor, TransportRegistry, TransportResolver},
    severity::Severity,
    sink::{Sink, SinkOptions},
};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Logger> = OnceLock::new();

pub struct Logger {
    registry: TransportRegistry,
    exception_sink: Arc<ExceptionSink>,
    errors: Arc<ErrorChannel>,
    metrics: Arc<LoggerMetrics>,
    hook_installed: bool,
}

impl Logger {
    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use transport_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .transports(vec![TransportDescriptor::named("memory")])
    ///     .test_mode(true)
    ///     .build();
    ///
    /// assert_eq!(logger.sink_names(), vec!["memory"]);
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Build from a configuration tree layered over [`Config::defaults`]
    pub fn from_config(config: &Config) -> Self {
        Self::builder().config(config.clone()).build()
    }

    /// Log at a level given by name.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::UnknownSeverity`] when `level` is not in the
    /// severity table. Sink failures are never returned.
    pub fn log(
        &self,
        level: &str,
        message: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<()> {
        let level: Severity = level.parse()?;
        self.log_at(level, message, args);
        Ok(())
    }

    pub fn log_at(&self, level: Severity, message: &str, args: impl IntoIterator<Item = Value>) {
        let record = LogRecord::new(level, message, args.into_iter().collect());
        self.log_record(&record);
    }

    /// Dispatch a prepared record to every sink
    pub fn log_record(&self, record: &LogRecord) -> DispatchOutcome {
        self.metrics.record_dispatched();
        self.registry.dispatch(record, &self.errors, &self.metrics)
    }

    #[inline]
    pub fn emerg(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Emerg, message, args);
    }

    #[inline]
    pub fn alert(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Alert, message, args);
    }

    #[inline]
    pub fn crit(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Crit, message, args);
    }

    #[inline]
    pub fn error(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Error, message, args);
    }

    #[inline]
    pub fn warning(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Warning, message, args);
    }

    #[inline]
    pub fn notice(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Notice, message, args);
    }

    #[inline]
    pub fn info(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Info, message, args);
    }

    #[inline]
    pub fn debug(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Debug, message, args);
    }

    #[inline]
    pub fn http(&self, message: &str, args: impl IntoIterator<Item = Value>) {
        self.log_at(Severity::Http, message, args);
    }

    /// Report an uncaught failure through the exception sink.
    ///
    /// The regular transports are bypassed; a failing exception sink is
    /// reported on the error channel under the name `exception`.
    pub fn handle_exception(&self, message: &str, backtrace: &Backtrace) {
        report_exception(&self.exception_sink, &self.errors, &self.metrics, message, backtrace);
    }

    /// Enriched record for an uncaught failure, without writing it
    pub fn exception_record(&self, message: &str, backtrace: &Backtrace) -> LogRecord {
        exception_record(message, backtrace)
    }

    pub fn exception_sink(&self) -> &ExceptionSink {
        &self.exception_sink
    }

    /// Whether the panic hook was installed at build time
    pub fn exception_hook_installed(&self) -> bool {
        self.hook_installed
    }

    /// Flush every sink; failures are reported on the error channel
    pub fn flush(&self) {
        self.registry.flush(&self.errors);
    }

    /// Transport names of the live sinks, in dispatch order
    pub fn sink_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    pub fn sink_count(&self) -> usize {
        self.registry.len()
    }

    /// The channel transport failures are published on
    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    /// Get the logger metrics for observability
    ///
    /// # Example
    ///
    /// ```
    /// use transport_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .transport(TransportDescriptor::named("bogus"))
    ///     .without_default_error_listener()
    ///     .test_mode(true)
    ///     .build();
    ///
    /// logger.info("nobody listens", []);
    ///
    /// let metrics = logger.metrics();
    /// assert_eq!(metrics.resolution_failures(), 1);
    /// assert_eq!(metrics.records_dispatched(), 1);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.registry.flush(&self.errors);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("registry", &self.registry)
            .field("errors", &self.errors)
            .field("hook_installed", &self.hook_installed)
            .finish()
    }
}

fn report_exception(
    sink: &ExceptionSink,
    errors: &ErrorChannel,
    metrics: &LoggerMetrics,
    message: &str,
    backtrace: &Backtrace,
) {
    metrics.record_exception();
    if let Err(e) = sink.report(message, backtrace) {
        errors.report("exception", &e);
    }
}

/// Route panics outside any isolation boundary to the exception sink
fn install_panic_hook(
    sink: Arc<ExceptionSink>,
    errors: Arc<ErrorChannel>,
    metrics: Arc<LoggerMetrics>,
) {
    std::panic::set_hook(Box::new(move |info| {
        if within_boundary() {
            return;
        }

        let payload = panic_message(info.payload());
        let message = match info.location() {
            Some(location) => format!(
                "{} at {}:{}:{}",
                payload,
                location.file(),
                location.line(),
                location.column()
            ),
            None => payload,
        };
        report_exception(&sink, &errors, &metrics, &message, &Backtrace::force_capture());
    }));
}

/// Builder for constructing Logger with a fluent API
///
/// The configuration starts from [`Config::defaults`]; transports come from
/// its `logger` key unless [`LoggerBuilder::transports`] replaces them.
///
/// # Example
/// ```
/// use transport_logger::prelude::*;
/// use std::sync::Arc;
///
/// let handle = MemoryHandle::new();
/// let logger = Logger::builder()
///     .args(["--logger=memory", "--log:memory:level=warning"])
///     .register("memory", memory_factory(handle.clone()))
///     .error_listener(Arc::new(|event: &TransportErrorEvent| {
///         eprintln!("ALERT: {} failed", event.name)
///     }))
///     .test_mode(true)
///     .build();
///
/// logger.info("dropped by the sink threshold", []);
/// logger.warning("value is %d", [serde_json::json!(42)]);
/// assert_eq!(handle.messages(), vec!["value is 42"]);
/// ```
pub struct LoggerBuilder {
    config: Config,
    descriptors: Option<Vec<TransportDescriptor>>,
    resolver: TransportResolver,
    listeners: Vec<ErrorListener>,
    default_listener: bool,
    test_mode: Option<bool>,
    exception_sink: Option<Box<dyn Sink>>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: Config::defaults(),
            descriptors: None,
            resolver: TransportResolver::with_builtins(),
            listeners: Vec::new(),
            default_listener: true,
            test_mode: None,
            exception_sink: None,
        }
    }

    /// Layer `config` over the current configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: Config) -> Self {
        self.config.merge(&config);
        self
    }

    /// Apply command line style overrides, see [`Config::apply_args`]
    #[must_use = "builder methods return a new value"]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.apply_args(args);
        self
    }

    /// Add one transport to an explicit transport list
    ///
    /// Once called, the `logger` configuration key is ignored.
    #[must_use = "builder methods return a new value"]
    pub fn transport(mut self, descriptor: TransportDescriptor) -> Self {
        self.descriptors.get_or_insert_with(Vec::new).push(descriptor);
        self
    }

    /// Replace the transport list
    #[must_use = "builder methods return a new value"]
    pub fn transports(mut self, descriptors: Vec<TransportDescriptor>) -> Self {
        self.descriptors = Some(descriptors);
        self
    }

    /// Register (or override) a built-in transport
    #[must_use = "builder methods return a new value"]
    pub fn register(mut self, name: impl Into<String>, factory: SinkFactory) -> Self {
        self.resolver.register(name, factory);
        self
    }

    /// Register a plug-in sink addressed by a `log.<transport>.module` key
    #[must_use = "builder methods return a new value"]
    pub fn module(mut self, module: impl Into<String>, factory: SinkFactory) -> Self {
        self.resolver.register_module(module, factory);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_listener(mut self, listener: ErrorListener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Do not print transport failures to stderr
    #[must_use = "builder methods return a new value"]
    pub fn without_default_error_listener(mut self) -> Self {
        self.default_listener = false;
        self
    }

    /// Force test mode on or off instead of reading `LOG_ENV` / `env`
    #[must_use = "builder methods return a new value"]
    pub fn test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = Some(enabled);
        self
    }

    /// Replace the console sink used for uncaught failures
    #[must_use = "builder methods return a new value"]
    pub fn exception_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.exception_sink = Some(sink);
        self
    }

    /// Build the Logger
    ///
    /// Never fails: unusable transports are reported on the error channel
    /// and skipped.
    pub fn build(self) -> Logger {
        let errors = Arc::new(if self.default_listener {
            ErrorChannel::new()
        } else {
            ErrorChannel::silent()
        });
        for listener in self.listeners {
            errors.on_error(listener);
        }
        let metrics = Arc::new(LoggerMetrics::new());

        let descriptors = self
            .descriptors
            .unwrap_or_else(|| self.config.transport_descriptors());
        let registry =
            TransportRegistry::build(&descriptors, &self.resolver, &self.config, &errors, &metrics);

        if !descriptors.is_empty() && registry.is_empty() {
            let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
            eprintln!(
                "[LOGGER WARNING] None of the configured transports ({}) could be loaded. \
                 Log records will be discarded.",
                names.join(", ")
            );
        }

        let stderr_options = self.config.transport_options("stderr");
        let exception_sink = Arc::new(match self.exception_sink {
            Some(sink) => ExceptionSink::new(sink),
            None => ExceptionSink::from_options(&stderr_options).unwrap_or_else(|e| {
                errors.report("stderr", &e);
                ExceptionSink::fallback()
            }),
        });

        let test_mode = self.test_mode.unwrap_or_else(|| self.config.test_mode());
        let handle_exceptions =
            SinkOptions::new("stderr", &stderr_options).bool_or("handleExceptions", true);

        let hook_installed = !test_mode && handle_exceptions;
        if hook_installed {
            install_panic_hook(
                Arc::clone(&exception_sink),
                Arc::clone(&errors),
                Arc::clone(&metrics),
            );
        }

        Logger {
            registry,
            exception_sink,
            errors,
            metrics,
            hook_installed,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the process-wide default logger.
///
/// # Errors
///
/// Returns [`LoggerError::Other`] when a global logger already exists.
pub fn init_global(logger: Logger) -> Result<&'static Logger> {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        logger
    });

    if installed {
        Ok(global)
    } else {
        Err(LoggerError::other("global logger already initialized"))
    }
}

/// The process-wide default logger, if one was installed
pub fn global() -> Option<&'static Logger> {
    GLOBAL.get()
}
