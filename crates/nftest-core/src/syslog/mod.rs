//! Capture of the pipeline's log stream.
//!
//! The pipeline is pointed at a [`SyslogServer`] bound on an ephemeral port.
//! Every datagram it sends is parsed by [`transform`], re-levelled from its
//! syslog priority and logged under the [`PIPELINE_TARGET`] target. Capture
//! is best effort: a datagram that doesn't parse is logged verbatim and
//! never stops the relay.

pub mod record;
pub mod server;

pub use record::{
    emit, transform, LogEnvelope, LogRecord, Severity, PIPELINE_TARGET, SEVERITY_TABLE,
    TRACEBACK_THREAD,
};
pub use server::{RelayConfig, RelayState, SyslogRelay, SyslogServer, MAX_DATAGRAM};
