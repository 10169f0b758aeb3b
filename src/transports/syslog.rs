//! Syslog sink sending BSD-style (RFC 3164) datagrams over UDP
//!
//! Each record becomes one datagram:
//! `<PRI>Mmm dd hh:mm:ss host app[pid]: message key=value`

use crate::core::{
    format::RecordFormat, LogRecord, LoggerError, Result, Severity, Sink, SinkOptions,
};
use chrono::Local;
use serde_json::Value;
use std::net::{ToSocketAddrs, UdpSocket};

/// Default syslog UDP port
pub const DEFAULT_PORT: u16 = 514;

/// Syslog facility codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    Kern = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    AuthPriv = 10,
    Ftp = 11,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl std::str::FromStr for Facility {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        let facility = match s.trim().to_lowercase().as_str() {
            "kern" => Facility::Kern,
            "user" => Facility::User,
            "mail" => Facility::Mail,
            "daemon" => Facility::Daemon,
            "auth" => Facility::Auth,
            "syslog" => Facility::Syslog,
            "lpr" => Facility::Lpr,
            "news" => Facility::News,
            "uucp" => Facility::Uucp,
            "cron" => Facility::Cron,
            "authpriv" => Facility::AuthPriv,
            "ftp" => Facility::Ftp,
            "local0" => Facility::Local0,
            "local1" => Facility::Local1,
            "local2" => Facility::Local2,
            "local3" => Facility::Local3,
            "local4" => Facility::Local4,
            "local5" => Facility::Local5,
            "local6" => Facility::Local6,
            "local7" => Facility::Local7,
            other => {
                return Err(LoggerError::config(
                    "syslog",
                    format!("unknown facility '{}'", other),
                ))
            }
        };
        Ok(facility)
    }
}

pub struct SyslogSink {
    socket: UdpSocket,
    level: Severity,
    facility: Facility,
    app: String,
    hostname: String,
    format: RecordFormat,
}

impl SyslogSink {
    /// Connect a UDP socket to `host:port`
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be resolved or the socket cannot be bound
    pub fn connect(host: &str, port: u16, ipv6: bool) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                LoggerError::io_operation("resolving syslog host", format!("{}:{}", host, port), e)
            })?
            .find(|addr| addr.is_ipv6() == ipv6)
            .ok_or_else(|| {
                LoggerError::config("syslog", format!("no usable address for {}:{}", host, port))
            })?;

        let bind = if ipv6 { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind)?;
        socket.connect(addr)?;

        Ok(Self {
            socket,
            level: Severity::Http,
            facility: Facility::Local0,
            app: "app".to_string(),
            hostname: local_hostname(),
            format: RecordFormat {
                timestamp: false,
                ..RecordFormat::default()
            },
        })
    }

    /// Build from a `log.syslog` block.
    ///
    /// Options: `host`, `port`, `app` (or `identity`), `facility`, `level`,
    /// `protocol` (`udp4`/`udp6`), `type` (only `BSD`), `label`.
    pub fn from_options(options: &Value) -> Result<Self> {
        let opts = SinkOptions::new("syslog", options);

        let ipv6 = match opts.str("protocol").unwrap_or("udp4") {
            "udp4" | "udp" => false,
            "udp6" => true,
            other => {
                return Err(LoggerError::config(
                    "syslog",
                    format!("unsupported protocol '{}'", other),
                ))
            }
        };
        if let Some(kind) = opts.str("type") {
            if !kind.eq_ignore_ascii_case("bsd") && kind != "3164" {
                return Err(LoggerError::config(
                    "syslog",
                    format!("unsupported message type '{}'", kind),
                ));
            }
        }

        let port = match opts.u64("port")? {
            Some(port) => u16::try_from(port)
                .map_err(|_| LoggerError::config("syslog", format!("invalid port {}", port)))?,
            None => DEFAULT_PORT,
        };
        let host = opts.string_or("host", "localhost");

        let mut sink = Self::connect(&host, port, ipv6)?;
        sink.level = opts.level_or(Severity::Http)?;
        sink.facility = opts.str("facility").unwrap_or("local0").parse()?;
        sink.app = opts
            .str("app")
            .or_else(|| opts.str("identity"))
            .unwrap_or("app")
            .to_string();
        sink.format = RecordFormat::from_options(
            &opts,
            RecordFormat {
                timestamp: false,
                ..RecordFormat::default()
            },
        );
        // Header carries the time; colors make no sense on the wire
        sink.format.timestamp = false;
        sink.format.colorize = false;
        Ok(sink)
    }

    #[must_use]
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    #[must_use]
    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }

    /// Priority value for a record: `facility * 8 + severity`
    pub fn priority(&self, level: Severity) -> u8 {
        (self.facility as u8) * 8 + level.syslog_code()
    }

    fn frame(&self, record: &LogRecord) -> String {
        let timestamp = record.timestamp.with_timezone(&Local).format("%b %e %H:%M:%S");
        format!(
            "<{}>{} {} {}[{}]: {}",
            self.priority(record.level),
            timestamp,
            self.hostname,
            self.app,
            std::process::id(),
            self.format.render(record)
        )
    }
}

impl Sink for SyslogSink {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        if !record.level.passes(self.level) {
            return Ok(());
        }

        let datagram = self.frame(record);
        self.socket
            .send(datagram.as_bytes())
            .map_err(|e| LoggerError::io_operation("sending syslog datagram", "send failed", e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_priority() {
        let sink = SyslogSink::connect("127.0.0.1", 5514, false)
            .unwrap()
            .with_facility(Facility::Local0);
        assert_eq!(sink.priority(Severity::Emerg), 128);
        assert_eq!(sink.priority(Severity::Warning), 132);
        assert_eq!(sink.priority(Severity::Http), 135);
    }

    #[test]
    fn test_facility_parsing() {
        assert_eq!("LOCAL3".parse::<Facility>().unwrap(), Facility::Local3);
        assert_eq!("daemon".parse::<Facility>().unwrap(), Facility::Daemon);
        assert!("local9".parse::<Facility>().is_err());
    }

    #[test]
    fn test_sends_datagram() -> Result<()> {
        let receiver = UdpSocket::bind("127.0.0.1:0")?;
        receiver.set_read_timeout(Some(Duration::from_secs(2)))?;
        let port = receiver.local_addr()?.port();

        let mut sink = SyslogSink::from_options(&json!({
            "host": "127.0.0.1",
            "port": port,
            "app": "billing",
            "facility": "local0",
            "type": "BSD"
        }))?;
        sink.write(&LogRecord::new(Severity::Error, "disk failure", vec![json!({"code": 5})]))?;

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf)?;
        let datagram = String::from_utf8_lossy(&buf[..len]);

        assert!(datagram.starts_with("<131>"), "datagram: {}", datagram);
        assert!(datagram.contains(&format!("billing[{}]: ", std::process::id())));
        assert!(datagram.ends_with("error: disk failure code=5"));
        Ok(())
    }

    #[test]
    fn test_rejects_unsupported_options() {
        assert!(SyslogSink::from_options(&json!({"host": "127.0.0.1", "protocol": "tcp"})).is_err());
        assert!(SyslogSink::from_options(&json!({"host": "127.0.0.1", "type": "5424"})).is_err());
        assert!(SyslogSink::from_options(&json!({"host": "127.0.0.1", "port": 70000})).is_err());
        assert!(SyslogSink::from_options(&json!({"host": "127.0.0.1", "facility": "nope"})).is_err());
    }
}
