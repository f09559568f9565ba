//! Child process output relaying.
//!
//! Both pipes of a child are drained concurrently and each line is logged
//! as it arrives, so neither stream can fill its pipe buffer and stall the
//! child while the other is being read.

use std::process::ExitStatus;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, error, info, warn, Level};

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn name(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Log levels applied to a child's output streams.
#[derive(Debug, Clone, Copy)]
pub struct OutputLevels {
    pub stdout: Level,
    pub stderr: Level,
}

impl OutputLevels {
    /// Levels used for comparison scripts.
    pub const SCRIPT: OutputLevels = OutputLevels {
        stdout: Level::DEBUG,
        stderr: Level::ERROR,
    };

    /// Levels used for the pipeline's own console output.
    pub const PIPELINE: OutputLevels = OutputLevels {
        stdout: Level::INFO,
        stderr: Level::WARN,
    };
}

/// Relay all output of `child` into the log, then wait for it to exit.
///
/// `child` must have been spawned with piped stdout and stderr; a stream
/// that was not piped is simply not relayed.
pub async fn relay_output(
    mut child: Child,
    program: &str,
    levels: OutputLevels,
) -> std::io::Result<ExitStatus> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tokio::join!(
        drain(stdout, program, Stream::Stdout, levels.stdout),
        drain(stderr, program, Stream::Stderr, levels.stderr),
    );

    child.wait().await
}

async fn drain<R>(pipe: Option<R>, program: &str, stream: Stream, level: Level)
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return;
    };

    // Lines are bytes until logged; output that isn't UTF-8 is decoded lossily.
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                log_line(level, program, stream, text.trim_end());
            }
            Err(e) => {
                warn!(program = %program, stream = stream.name(), error = %e, "Failed to read child output");
                // The pipe stays open and drained until EOF.
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    warn!(program = %program, stream = stream.name(), error = %e, "Discarding child output failed");
                }
                break;
            }
        }
    }
}

fn log_line(level: Level, program: &str, stream: Stream, line: &str) {
    let stream = stream.name();
    match level {
        Level::ERROR => error!(target: "console", program = %program, stream, "{}", line),
        Level::WARN => warn!(target: "console", program = %program, stream, "{}", line),
        Level::INFO => info!(target: "console", program = %program, stream, "{}", line),
        _ => debug!(target: "console", program = %program, stream, "{}", line),
    }
}
