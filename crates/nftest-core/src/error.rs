//! Error taxonomy for nftest.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors produced while resolving a glob pattern to a single file.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no files match pattern {pattern}")]
    NoMatch { pattern: String },

    #[error("pattern {pattern} is ambiguous: {} files match", matches.len())]
    Ambiguous {
        pattern: String,
        matches: Vec<PathBuf>,
    },

    #[error("invalid glob pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors produced by a single file assertion.
///
/// The set is closed: callers branch on [`AssertionError::kind`], never on
/// the rendered message.
#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    #[error("path resolution failed: {0}")]
    PathResolution(#[from] ResolveError),

    #[error("{} was not modified by this pipeline (modified {modified}, assertion created {created})", path.display())]
    NotUpdated {
        path: PathBuf,
        modified: DateTime<Utc>,
        created: DateTime<Utc>,
    },

    #[error("contents differ: actual {} expect {}", actual.display(), expect.display())]
    MismatchedContents { actual: PathBuf, expect: PathBuf },

    #[error("assert method {method} unknown")]
    UnknownMethod { method: String },

    #[error("failed to launch comparison script {}: {source}", script.display())]
    ScriptLaunch {
        script: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializable classification of a failed case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PathResolution,
    NotUpdated,
    MismatchedContents,
    UnknownMethod,
    ScriptLaunch,
    Io,
    PipelineFailed,
    PipelineLaunch,
    Relay,
    Config,
}

impl AssertionError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AssertionError::PathResolution(_) => FailureKind::PathResolution,
            AssertionError::NotUpdated { .. } => FailureKind::NotUpdated,
            AssertionError::MismatchedContents { .. } => FailureKind::MismatchedContents,
            AssertionError::UnknownMethod { .. } => FailureKind::UnknownMethod,
            AssertionError::ScriptLaunch { .. } => FailureKind::ScriptLaunch,
            AssertionError::Io { .. } => FailureKind::Io,
        }
    }
}

/// Errors from the syslog relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind syslog relay on {host}: {source}")]
    Bind {
        host: std::net::IpAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Harness-level errors: configuration, pipeline launch, case execution.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid test configuration {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to launch pipeline {program}: {source}")]
    PipelineLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for assertion operations.
pub type AssertionResult<T> = std::result::Result<T, AssertionError>;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_counts_matches() {
        let err = ResolveError::Ambiguous {
            pattern: "out/*.txt".to_string(),
            matches: vec![PathBuf::from("out/a.txt"), PathBuf::from("out/b.txt")],
        };
        let msg = err.to_string();
        assert!(msg.contains("out/*.txt"));
        assert!(msg.contains("2 files"));
    }

    #[test]
    fn test_unknown_method_names_value() {
        let err = AssertionError::UnknownMethod {
            method: "sha1".to_string(),
        };
        assert!(err.to_string().contains("sha1"));
        assert_eq!(err.kind(), FailureKind::UnknownMethod);
    }

    #[test]
    fn test_resolve_error_converts_to_path_resolution() {
        let err: AssertionError = ResolveError::NoMatch {
            pattern: "*.bam".to_string(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::PathResolution);
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::MismatchedContents).unwrap();
        assert_eq!(json, "\"mismatched_contents\"");
    }
}
