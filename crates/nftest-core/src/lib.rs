//! nftest core - regression testing for workflow pipelines
//!
//! Provides:
//! - Result assertions: glob resolution, freshness checks, checksum or
//!   script comparison of produced files against expected ones
//! - A UDP syslog relay that re-levels the pipeline's log stream into tracing
//! - Test file loading, per-case pipeline orchestration and run reports

pub mod assertion;
pub mod case;
pub mod checksum;
pub mod config;
pub mod env;
pub mod error;
pub mod process;
pub mod report;
pub mod resolve;
pub mod runner;
pub mod script;
pub mod syslog;
pub mod telemetry;

// Re-export key types
pub use assertion::{AssertMethod, Assertion};
pub use case::{CaseFailure, CaseOutcome, PipelineCommand, TestCase};
pub use config::{find_config, AssertConfig, CaseConfig, GlobalConfig, TestFile};
pub use env::HarnessEnv;
pub use error::{
    AssertionError, AssertionResult, FailureKind, HarnessError, RelayError, ResolveError, Result,
};
pub use report::{FailedCase, TestReport};
pub use runner::TestRunner;
pub use syslog::{RelayConfig, SyslogRelay, SyslogServer};
pub use telemetry::init_tracing;
