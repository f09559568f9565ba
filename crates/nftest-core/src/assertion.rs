//! Expected-vs-actual file assertions.
//!
//! An [`Assertion`] resolves both of its glob patterns, checks that the
//! actual file was written after the assertion was created, then compares
//! contents by checksum or with an external script. Each step short-circuits
//! the rest.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::checksum;
use crate::error::{AssertionError, AssertionResult};
use crate::resolve::resolve_single;
use crate::script::run_comparison_script;

/// Method names accepted for checksum comparison.
pub const CHECKSUM_METHODS: &[&str] = &["checksum", "md5"];

/// How two resolved files are compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssertMethod {
    /// Equal iff content checksums are equal.
    Checksum,

    /// Equal iff `script ACTUAL EXPECT` exits 0.
    Script { path: PathBuf },

    /// A method name nobody recognised. Rejected when the assertion runs.
    Unknown { name: String },
}

impl AssertMethod {
    /// Resolve the configured method name and optional script.
    ///
    /// A script always wins over the method name.
    pub fn from_config(method: &str, script: Option<PathBuf>) -> Self {
        match script {
            Some(path) => AssertMethod::Script { path },
            None if CHECKSUM_METHODS.contains(&method) => AssertMethod::Checksum,
            None => AssertMethod::Unknown {
                name: method.to_string(),
            },
        }
    }
}

/// One declared comparison between an actual and an expected file.
#[derive(Debug, Clone)]
pub struct Assertion {
    actual_pattern: String,
    expect_pattern: String,
    method: AssertMethod,
    creation_time: DateTime<Utc>,
}

impl Assertion {
    /// Create an assertion stamped with the current time.
    pub fn new(
        actual_pattern: impl Into<String>,
        expect_pattern: impl Into<String>,
        method: AssertMethod,
    ) -> Self {
        Self::with_creation_time(actual_pattern, expect_pattern, method, Utc::now())
    }

    /// Create an assertion with an explicit freshness baseline.
    pub fn with_creation_time(
        actual_pattern: impl Into<String>,
        expect_pattern: impl Into<String>,
        method: AssertMethod,
        creation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            actual_pattern: actual_pattern.into(),
            expect_pattern: expect_pattern.into(),
            method,
            creation_time,
        }
    }

    pub fn actual_pattern(&self) -> &str {
        &self.actual_pattern
    }

    pub fn expect_pattern(&self) -> &str {
        &self.expect_pattern
    }

    pub fn method(&self) -> &AssertMethod {
        &self.method
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    /// Run the assertion.
    pub async fn perform(&self) -> AssertionResult<()> {
        let actual = resolve_single(&self.actual_pattern)?;
        let expect = resolve_single(&self.expect_pattern)?;

        self.check_updated(&actual)?;

        let matched = match &self.method {
            AssertMethod::Checksum => {
                debug!("checksum {} {}", actual.display(), expect.display());
                let digest_of = |path: &Path| {
                    checksum::digest(path).map_err(|source| AssertionError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                };
                digest_of(&actual)? == digest_of(&expect)?
            }
            AssertMethod::Script { path } => run_comparison_script(path, &actual, &expect).await?,
            AssertMethod::Unknown { name } => {
                error!("assert method {} unknown.", name);
                return Err(AssertionError::UnknownMethod {
                    method: name.clone(),
                });
            }
        };

        if !matched {
            error!("Assertion failed");
            error!("Actual: {}", actual.display());
            error!("Expect: {}", expect.display());
            return Err(AssertionError::MismatchedContents { actual, expect });
        }

        debug!("Assertion passed");
        Ok(())
    }

    /// Fail unless `actual` was modified strictly after this assertion was
    /// created. Equal timestamps count as stale.
    fn check_updated(&self, actual: &Path) -> AssertionResult<()> {
        let modified = std::fs::metadata(actual)
            .and_then(|meta| meta.modified())
            .map_err(|source| AssertionError::Io {
                path: actual.to_path_buf(),
                source,
            })?;
        let modified: DateTime<Utc> = modified.into();

        debug!("Test creation time: {}", self.creation_time);
        debug!("Actual mod time:    {}", modified);

        if modified <= self.creation_time {
            return Err(AssertionError::NotUpdated {
                path: actual.to_path_buf(),
                modified,
                created: self.creation_time,
            });
        }
        Ok(())
    }
}
