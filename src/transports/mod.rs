//! Built-in transports

pub mod console;
#[cfg(feature = "file")]
pub mod file;
pub mod memory;
#[cfg(feature = "syslog")]
pub mod syslog;

pub use console::{ConsoleSink, ConsoleTarget};
#[cfg(feature = "file")]
pub use file::FileSink;
pub use memory::{memory_factory, MemoryHandle, MemorySink};
#[cfg(feature = "syslog")]
pub use syslog::{Facility, SyslogSink};

use crate::core::registry::{sink_factory, SinkFactory};
use crate::core::Sink;

/// Factories for every compiled-in transport, keyed by transport name
pub fn builtin_factories() -> Vec<(&'static str, SinkFactory)> {
    #[allow(unused_mut)]
    let mut factories: Vec<(&'static str, SinkFactory)> = vec![
        (
            "stdout",
            sink_factory(|options| Ok(Box::new(ConsoleSink::from_options(options)?) as Box<dyn Sink>)),
        ),
        (
            "memory",
            sink_factory(|options| {
                Ok(Box::new(MemorySink::from_options(options, MemoryHandle::new())?) as Box<dyn Sink>)
            }),
        ),
    ];

    #[cfg(feature = "file")]
    factories.push((
        "file",
        sink_factory(|options| Ok(Box::new(FileSink::from_options(options)?) as Box<dyn Sink>)),
    ));

    #[cfg(feature = "syslog")]
    factories.push((
        "syslog",
        sink_factory(|options| Ok(Box::new(SyslogSink::from_options(options)?) as Box<dyn Sink>)),
    ));

    factories
}
