//! Transport resolution and the registry of live sinks
//!
//! Resolution order for a transport name:
//! 1. a built-in factory registered under that name;
//! 2. the `module` key of the transport's configuration (`log.<name>.module`,
//!    falling back to `<name>.module`), looked up among host-registered modules;
//! 3. otherwise a [`LoggerError::UnknownTransport`].
//!
//! The registry is built once and never changes afterwards. Each sink sits
//! behind its own mutex so a slow sink only serializes writes to itself.

use super::{
    config::ConfigSource,
    error::{LoggerError, Result},
    isolation::{isolate, ErrorChannel},
    metrics::LoggerMetrics,
    record::LogRecord,
    sink::Sink,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Constructor for a sink, given its transport option block
pub type SinkFactory = Arc<dyn Fn(&Value) -> Result<Box<dyn Sink>> + Send + Sync>;

/// Wrap a closure as a [`SinkFactory`]
pub fn sink_factory<F>(f: F) -> SinkFactory
where
    F: Fn(&Value) -> Result<Box<dyn Sink>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Transport name plus the options passed verbatim to its constructor
#[derive(Debug, Clone, PartialEq)]
pub struct TransportDescriptor {
    pub name: String,
    pub options: Value,
}

impl TransportDescriptor {
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Descriptor with an empty option block
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Value::Object(Map::new()))
    }
}

/// Maps transport names to sink constructors
#[derive(Clone, Default)]
pub struct TransportResolver {
    builtins: HashMap<String, SinkFactory>,
    modules: HashMap<String, SinkFactory>,
}

impl TransportResolver {
    /// Resolver with no factories at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolver preloaded with the crate's built-in sinks
    pub fn with_builtins() -> Self {
        let mut resolver = Self::empty();
        for (name, factory) in crate::transports::builtin_factories() {
            resolver.register(name, factory);
        }
        resolver
    }

    /// Register (or replace) a built-in transport
    pub fn register(&mut self, name: impl Into<String>, factory: SinkFactory) -> &mut Self {
        self.builtins.insert(name.into(), factory);
        self
    }

    /// Register a plug-in module that configuration can reference by name
    pub fn register_module(&mut self, module: impl Into<String>, factory: SinkFactory) -> &mut Self {
        self.modules.insert(module.into(), factory);
        self
    }

    pub fn has_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn resolve(&self, name: &str, config: &dyn ConfigSource) -> Result<SinkFactory> {
        if let Some(factory) = self.builtins.get(name) {
            return Ok(Arc::clone(factory));
        }

        let module = config
            .get(&format!("log:{}:module", name))
            .or_else(|| config.get(&format!("{}:module", name)))
            .and_then(Value::as_str);

        match module {
            Some(module) => self.modules.get(module).map(Arc::clone).ok_or_else(|| {
                LoggerError::unknown_transport(
                    name,
                    format!("module '{}' is not registered", module),
                )
            }),
            None => Err(LoggerError::unknown_transport(
                name,
                "no built-in transport and no module reference",
            )),
        }
    }
}

impl fmt::Debug for TransportResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builtins: Vec<&String> = self.builtins.keys().collect();
        builtins.sort();
        let mut modules: Vec<&String> = self.modules.keys().collect();
        modules.sort();
        f.debug_struct("TransportResolver")
            .field("builtins", &builtins)
            .field("modules", &modules)
            .finish()
    }
}

struct SinkSlot {
    name: String,
    sink: Mutex<Box<dyn Sink>>,
}

/// Result of fanning one record out to the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub attempted: usize,
    pub failed: usize,
}

/// The ordered set of instantiated sinks
#[derive(Default)]
pub struct TransportRegistry {
    sinks: Vec<SinkSlot>,
}

impl TransportRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve and construct every descriptor, in order.
    ///
    /// Resolution and construction failures are reported on `errors` and the
    /// descriptor is skipped; the build itself never fails. Duplicate names
    /// produce independent sinks.
    pub fn build(
        descriptors: &[TransportDescriptor],
        resolver: &TransportResolver,
        config: &dyn ConfigSource,
        errors: &ErrorChannel,
        metrics: &LoggerMetrics,
    ) -> Self {
        let mut sinks = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let name = descriptor.name.as_str();

            let factory = match resolver.resolve(name, config) {
                Ok(factory) => factory,
                Err(e) => {
                    metrics.record_resolution_failure();
                    errors.report(name, &e);
                    continue;
                }
            };

            match isolate(name, "construct", || factory(&descriptor.options)) {
                Ok(sink) => sinks.push(SinkSlot {
                    name: descriptor.name.clone(),
                    sink: Mutex::new(sink),
                }),
                Err(e) => {
                    metrics.record_construction_failure();
                    errors.report(name, &as_construction_error(name, e));
                }
            }
        }

        Self { sinks }
    }

    /// Registry from already constructed sinks
    pub fn from_sinks(sinks: Vec<(String, Box<dyn Sink>)>) -> Self {
        Self {
            sinks: sinks
                .into_iter()
                .map(|(name, sink)| SinkSlot {
                    name,
                    sink: Mutex::new(sink),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Transport names of the live sinks, in dispatch order
    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|slot| slot.name.as_str()).collect()
    }

    /// Write `record` to every sink in order, isolating each write.
    pub fn dispatch(
        &self,
        record: &LogRecord,
        errors: &ErrorChannel,
        metrics: &LoggerMetrics,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for slot in &self.sinks {
            outcome.attempted += 1;
            let result = isolate(&slot.name, "write", || slot.sink.lock().write(record));

            if let Err(e) = result {
                outcome.failed += 1;
                metrics.record_write_failure();
                errors.report(&slot.name, &as_write_error(&slot.name, e));
            }
        }

        outcome
    }

    /// Flush every sink; failures are reported, not returned
    pub fn flush(&self, errors: &ErrorChannel) -> usize {
        let mut failed = 0;
        for slot in &self.sinks {
            if let Err(e) = isolate(&slot.name, "flush", || slot.sink.lock().flush()) {
                failed += 1;
                errors.report(&slot.name, &as_write_error(&slot.name, e));
            }
        }
        failed
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("sinks", &self.names())
            .finish()
    }
}

fn as_construction_error(name: &str, error: LoggerError) -> LoggerError {
    match error {
        e @ (LoggerError::SinkConstruction { .. } | LoggerError::SinkPanicked { .. }) => e,
        other => LoggerError::construction(name, other.to_string()),
    }
}

fn as_write_error(name: &str, error: LoggerError) -> LoggerError {
    match error {
        e @ (LoggerError::SinkWrite { .. } | LoggerError::SinkPanicked { .. }) => e,
        other => LoggerError::write(name, other.to_string()),
    }
}
