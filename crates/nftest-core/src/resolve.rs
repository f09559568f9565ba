//! Resolve a glob pattern to exactly one file.

use std::path::PathBuf;

use tracing::debug;

use crate::error::ResolveError;

/// Expand `pattern` and return its single match.
///
/// Zero matches and multiple matches are both errors; an ambiguous pattern
/// is never narrowed to its first match.
pub fn resolve_single(pattern: &str) -> Result<PathBuf, ResolveError> {
    let paths = glob::glob(pattern).map_err(|e| ResolveError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    // Unreadable directory entries are skipped, as a shell glob would.
    let mut matches: Vec<PathBuf> = paths.filter_map(|entry| entry.ok()).collect();
    debug!(pattern = %pattern, matches = matches.len(), "Resolved glob");

    match matches.len() {
        0 => Err(ResolveError::NoMatch {
            pattern: pattern.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(ResolveError::Ambiguous {
            pattern: pattern.to_string(),
            matches,
        }),
    }
}
