//! Logging macros for printf-style log calls.
//!
//! Arguments may be any `Serialize` value. A trailing JSON object becomes the
//! record's metadata instead of a format argument.
//!
//! # Examples
//!
//! ```
//! use transport_logger::prelude::*;
//! use transport_logger::{info, warning};
//! use serde_json::json;
//!
//! let logger = Logger::builder()
//!     .transports(vec![TransportDescriptor::named("memory")])
//!     .test_mode(true)
//!     .build();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port %d", port);
//!
//! // With metadata
//! warning!(logger, "Slow request to %s", "/orders", json!({"ms": 950}));
//! ```

/// Log at a given [`Severity`](crate::Severity).
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::log;
/// log!(logger, Severity::Info, "Simple message");
/// log!(logger, Severity::Error, "Error code: %d", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $logger.log_at(
            $level,
            $fmt,
            ::std::vec![$($crate::core::record::to_arg(&$arg)),*],
        )
    };
}

/// Log an emergency-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::emerg;
/// emerg!(logger, "System unusable: %s", "kernel panic");
/// ```
#[macro_export]
macro_rules! emerg {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Emerg, $($arg)+)
    };
}

/// Log an alert-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::alert;
/// alert!(logger, "Replica %s lost quorum", "db-2");
/// ```
#[macro_export]
macro_rules! alert {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Alert, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::crit;
/// crit!(logger, "Payment gateway down for %d seconds", 30);
/// ```
#[macro_export]
macro_rules! crit {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Crit, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// # use serde_json::json;
/// use transport_logger::error;
/// error!(logger, "disk failure", json!({"code": 5}));
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::warning;
/// warning!(logger, "value is %d", 42);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Warning, $($arg)+)
    };
}

/// Log a notice-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::notice;
/// notice!(logger, "User %s signed in", "ada");
/// ```
#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Notice, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::info;
/// info!(logger, "Processing %d items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Info, $($arg)+)
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// # use serde_json::json;
/// use transport_logger::debug;
/// debug!(logger, "Cache state: %j", json!({"hits": 3}));
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

/// Log an http-level message.
///
/// # Examples
///
/// ```
/// # use transport_logger::prelude::*;
/// # let logger = Logger::builder().transports(vec![]).test_mode(true).build();
/// use transport_logger::http;
/// http!(logger, "GET %s %d", "/health", 200);
/// ```
#[macro_export]
macro_rules! http {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Http, $($arg)+)
    };
}
