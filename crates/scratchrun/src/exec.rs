//! Process spawning and stream pumping
//!
//! Runs one external command in a working directory, draining its stdout
//! and stderr line-by-line to the caller's sinks while it executes, and
//! optionally delivering a fixed block of text to its stdin. All waits are
//! cancellable; cancellation kills the child and abandons its pumps.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::sink::{Appender, OutputSinks};

#[derive(Debug, Error)]
pub(crate) enum ProcessError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run a command to completion, streaming its output.
///
/// Returns the exit code (`None` if the process was killed by a signal).
/// The returned future resolves only after the process has exited *and*
/// both stream pumps have drained, so no buffered output is lost on
/// fast-exiting processes. `input` of `None` gives the process an empty
/// (null) stdin; `Some` pipes the text in and closes the stream.
///
/// A flip of `cancel` to `true` kills the child, abandons the pumps, and
/// resolves to [`ProcessError::Cancelled`].
pub(crate) async fn run_streamed(
    argv: &[String],
    dir: &Path,
    input: Option<String>,
    sinks: &OutputSinks,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Option<i32>, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(dir)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(?argv, ?dir, "spawning process");
    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdout_pump = child
        .stdout
        .take()
        .map(|s| spawn_line_pump(s, "stdout", sinks.stdout.clone(), sinks.info.clone()));
    let stderr_pump = child
        .stderr
        .take()
        .map(|s| spawn_line_pump(s, "stderr", sinks.stderr.clone(), sinks.info.clone()));
    let stdin_writer = match (input, child.stdin.take()) {
        (Some(text), Some(stdin)) => Some(spawn_stdin_writer(stdin, text, sinks.info.clone())),
        _ => None,
    };

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = cancelled(cancel) => {
            debug!("cancellation requested, killing process");
            let _ = child.start_kill();
            let _ = child.wait().await;
            for task in [stdout_pump, stderr_pump, stdin_writer].into_iter().flatten() {
                task.abort();
            }
            return Err(ProcessError::Cancelled);
        }
    };

    // Both pumps must finish draining before the exit code is evaluated,
    // or a fast-exiting process could have its tail output dropped.
    if let Some(pump) = stdout_pump {
        let _ = pump.await;
    }
    if let Some(pump) = stderr_pump {
        let _ = pump.await;
    }
    if let Some(writer) = stdin_writer {
        let _ = writer.await;
    }

    debug!(code = ?status.code(), "process exited");
    Ok(status.code())
}

/// Resolves when `cancel` flips to true; never resolves if the sender is
/// dropped without cancelling.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if *cancel.borrow() {
        return;
    }
    while cancel.changed().await.is_ok() {
        if *cancel.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Drain one output stream to a sink, line by line, as output arrives.
///
/// Lines keep their terminators; a final unterminated line is forwarded
/// as-is. A read failure of the pipe itself is reported through `info` and
/// ends this pump without affecting the other stream or the process.
fn spawn_line_pump<R>(
    stream: R,
    name: &'static str,
    sink: Arc<dyn Appender>,
    info: Arc<dyn Appender>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => sink.append(&line),
                Err(e) => {
                    info.append(&format!("ERROR: failed reading {name} stream: {e}\n"));
                    break;
                }
            }
        }
    })
}

/// Deliver the fixed input text to the process's stdin, then close it.
///
/// A write failure (e.g. the process exited without reading) is reported
/// through `info`; it does not affect the stage's exit-code evaluation.
fn spawn_stdin_writer(
    mut stdin: ChildStdin,
    input: String,
    info: Arc<dyn Appender>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = stdin.write_all(input.as_bytes()).await {
            info.append(&format!("ERROR: failed writing to stdin: {e}\n"));
            return;
        }
        let _ = stdin.shutdown().await;
    })
}
