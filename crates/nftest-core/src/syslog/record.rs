//! BSD syslog parsing and re-levelling of relayed pipeline logs.
//!
//! Datagrams follow RFC 3164:
//!
//! ```text
//! <PRI>Mmm dd hh:mm:ss HOSTNAME MESSAGE
//! <134>Jan  3 12:00:25 ip-0A125232 nextflow: INFO  [main] more...
//! ```
//!
//! Most pipeline messages additionally use `tool: LEVEL [THREAD] MODULE - BODY`.
//! The syslog priority, not the embedded LEVEL, decides the record's level.

use std::net::SocketAddr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Target under which relayed pipeline records are emitted.
pub const PIPELINE_TARGET: &str = "pipeline";

/// Thread label for messages that don't follow the structured convention.
/// These are almost always continuation lines of a stack trace.
pub const TRACEBACK_THREAD: &str = "traceback";

/// Harness severity of a relayed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

/// Syslog severity (PRI mod 8) to harness severity.
pub const SEVERITY_TABLE: [Severity; 8] = [
    Severity::Critical, // 0 = Emergency
    Severity::Critical, // 1 = Alert
    Severity::Critical, // 2 = Critical
    Severity::Error,    // 3 = Error
    Severity::Warning,  // 4 = Warning
    Severity::Info,     // 5 = Notice
    Severity::Info,     // 6 = Informational
    Severity::Debug,    // 7 = Debug
];

impl Severity {
    /// Map a syslog PRI value. The facility (PRI / 8) is discarded.
    pub fn from_priority(priority: u32) -> Self {
        SEVERITY_TABLE[(priority % 8) as usize]
    }
}

/// One received datagram.
#[derive(Debug, Clone)]
pub struct LogEnvelope {
    pub payload: Vec<u8>,
    pub source: SocketAddr,
    pub received_at: DateTime<Utc>,
}

impl LogEnvelope {
    pub fn new(payload: &[u8], source: SocketAddr) -> Self {
        Self {
            payload: payload.to_vec(),
            source,
            received_at: Utc::now(),
        }
    }
}

/// A relayed record, ready to be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    /// Syslog timestamp as sent, e.g. `Jan  3 12:00:25`.
    pub timestamp: Option<String>,
    pub host: Option<String>,
    /// Thread or module of the emitter. `None` when the envelope did not parse.
    pub thread: Option<String>,
    pub message: String,
}

impl LogRecord {
    /// A record for a payload that isn't a syslog envelope, kept verbatim.
    fn passthrough(payload: &[u8]) -> Self {
        Self {
            severity: Severity::Info,
            timestamp: None,
            host: None,
            thread: None,
            message: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    /// Whether the outer envelope was recognised.
    pub fn is_parsed(&self) -> bool {
        self.thread.is_some()
    }
}

fn syslog_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?xs)
            ^
            <(?P<priority>\d+)>
            (?P<month>\w{3})\s
            (?P<day>[\s\d]?\d)\s
            (?P<time>\d{2}:\d{2}:\d{2})\s
            (?P<hostname>\S+)\s
            (?P<message>.*)
            $",
        )
        .expect("syslog regex is valid")
    })
}

fn message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w.-]+:\s+\w+\s+\[(?P<thread>.+?)\] \S+ - ").expect("message regex is valid")
    })
}

/// Parse a datagram payload into a record.
///
/// Never fails: a payload that isn't UTF-8 or doesn't match the envelope
/// layout comes back unmodified at INFO.
pub fn transform(payload: &[u8]) -> LogRecord {
    let Ok(text) = std::str::from_utf8(payload) else {
        return LogRecord::passthrough(payload);
    };
    let Some(caps) = syslog_re().captures(text.trim()) else {
        return LogRecord::passthrough(payload);
    };
    let Ok(priority) = caps["priority"].parse::<u32>() else {
        return LogRecord::passthrough(payload);
    };

    let message = &caps["message"];
    let (thread, body) = match message_re().captures(message) {
        Some(inner) => {
            let prefix_len = inner.get(0).map_or(0, |m| m.end());
            (inner["thread"].to_string(), &message[prefix_len..])
        }
        None => (TRACEBACK_THREAD.to_string(), message),
    };

    LogRecord {
        severity: Severity::from_priority(priority),
        timestamp: Some(format!("{} {} {}", &caps["month"], &caps["day"], &caps["time"])),
        host: Some(caps["hostname"].to_string()),
        thread: Some(thread),
        message: body.to_string(),
    }
}

/// Emit `record` into the harness log.
pub fn emit(record: &LogRecord, envelope: &LogEnvelope) {
    let thread = record.thread.as_deref().unwrap_or("syslog");
    let host = record.host.as_deref().unwrap_or("");
    let syslog_time = record.timestamp.as_deref().unwrap_or("");
    let peer = envelope.source;
    let message = record.message.as_str();

    match record.severity {
        Severity::Critical => error!(target: PIPELINE_TARGET, critical = true, thread, host, syslog_time, %peer, "{}", message),
        Severity::Error => error!(target: PIPELINE_TARGET, thread, host, syslog_time, %peer, "{}", message),
        Severity::Warning => warn!(target: PIPELINE_TARGET, thread, host, syslog_time, %peer, "{}", message),
        Severity::Info => info!(target: PIPELINE_TARGET, thread, host, syslog_time, %peer, "{}", message),
        Severity::Debug => debug!(target: PIPELINE_TARGET, thread, host, syslog_time, %peer, "{}", message),
    }
}
