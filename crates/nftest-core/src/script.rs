//! External comparison scripts.
//!
//! A script is invoked as `script ACTUAL EXPECT` and decides equality through
//! its exit code alone; its output is advisory and relayed into the log.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{AssertionError, AssertionResult};
use crate::process::{relay_output, OutputLevels};

/// Run `script` against a pair of files.
///
/// Returns `Ok(true)` iff the script exits with status 0. A script that
/// cannot be started is an [`AssertionError::ScriptLaunch`], not a mismatch.
pub async fn run_comparison_script(
    script: &Path,
    actual: &Path,
    expect: &Path,
) -> AssertionResult<bool> {
    debug!(
        "{} {} {}",
        script.display(),
        actual.display(),
        expect.display()
    );

    let child = Command::new(script)
        .arg(actual)
        .arg(expect)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| AssertionError::ScriptLaunch {
            script: script.to_path_buf(),
            source,
        })?;

    let program = script.display().to_string();
    let status = relay_output(child, &program, OutputLevels::SCRIPT)
        .await
        .map_err(|source| AssertionError::Io {
            path: script.to_path_buf(),
            source,
        })?;

    debug!(script = %program, code = ?status.code(), "Comparison script exited");
    Ok(status.success())
}
