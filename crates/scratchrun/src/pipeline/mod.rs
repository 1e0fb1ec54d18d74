//! Pipeline orchestration
//!
//! Executes one compile-and-run cycle: detect the program name, populate a
//! fresh scratch directory, then run the stage list strictly in order,
//! streaming every process's output as it is produced. The scratch
//! directory is deleted on every path out of a run.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument};

pub use crate::pipeline::stage::{Stage, StageKind, build_stages};

mod stage;

use crate::command::{classpath_for, expand_template};
use crate::config::Language;
use crate::deps::{DependencyCache, DependencyError};
use crate::exec::{ProcessError, run_streamed};
use crate::scratch::Scratchpad;
use crate::sink::OutputSinks;

/// Errors that abort a pipeline run.
///
/// These never reach the embedding caller as errors: the session boundary
/// converts them to sink messages and the completion callback fires
/// regardless.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} stage exited with code {code}")]
    StageFailed { stage: &'static str, code: i32 },

    #[error(transparent)]
    Dependency(DependencyError),

    #[error("run was cancelled")]
    Cancelled,

    #[error("empty command line")]
    EmptyCommand,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One compile-and-run request.
#[derive(Debug)]
pub struct RunRequest {
    /// Source text to build and execute
    pub source: String,

    /// Text delivered to the run stage's standard input
    pub input: String,

    /// Language describing the stage commands
    pub language: Language,

    /// Where process output and diagnostics go
    pub sinks: OutputSinks,
}

/// Execute a full pipeline run.
///
/// Always deletes the scratch directory before resolving, whatever the
/// outcome.
#[instrument(skip(request, cache, cancel), fields(language = %request.language.name))]
pub(crate) async fn run_pipeline(
    request: RunRequest,
    cache: Arc<DependencyCache>,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), PipelineError> {
    let RunRequest {
        source,
        input,
        language,
        sinks,
    } = request;

    // The detected name decides the source file's on-disk name, so it is
    // resolved before the scratch directory is populated.
    let base_name = language.detect_base_name(&source);
    let file_name = language.file_name(&base_name);
    let stages = build_stages(&language, &source);
    debug!(%base_name, stages = stages.len(), "starting pipeline");

    let mut scratch = Scratchpad::create()?;
    let result = match scratch.write_source(&file_name, &source).await {
        Ok(_) => {
            execute_stages(
                &stages,
                &language,
                &base_name,
                &input,
                &scratch,
                &cache,
                &sinks,
                &mut cancel,
            )
            .await
        }
        Err(e) => Err(PipelineError::Io(e)),
    };

    scratch.cleanup();
    result
}

#[allow(clippy::too_many_arguments)]
async fn execute_stages(
    stages: &[Stage],
    language: &Language,
    base_name: &str,
    input: &str,
    scratch: &Scratchpad,
    cache: &DependencyCache,
    sinks: &OutputSinks,
    cancel: &mut watch::Receiver<bool>,
) -> Result<(), PipelineError> {
    if *cancel.borrow() {
        return Err(PipelineError::Cancelled);
    }

    let extension = language.dotted_extension();
    let dir = scratch.path();

    for stage in stages {
        // Computed per stage so jars fetched by earlier stages are visible.
        let classpath = classpath_for(dir).await;

        if let StageKind::Dependency(id) = &stage.kind {
            let mut argv = expand_template(&stage.template, base_name, &extension, &classpath);
            argv.push(id.clone());

            match cache.materialize(id, &argv, dir, sinks, cancel).await {
                Ok(()) => {}
                Err(DependencyError::Cancelled { .. }) => return Err(PipelineError::Cancelled),
                Err(e) => return Err(PipelineError::Dependency(e)),
            }
            continue;
        }

        let argv = expand_template(&stage.template, base_name, &extension, &classpath);
        let stage_input = matches!(stage.kind, StageKind::Run).then(|| input.to_owned());

        let code = match run_streamed(&argv, dir, stage_input, sinks, cancel).await {
            Ok(code) => code,
            Err(ProcessError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(ProcessError::Spawn { program, source }) => {
                return Err(PipelineError::Launch { program, source });
            }
            Err(ProcessError::EmptyCommand) => return Err(PipelineError::EmptyCommand),
            Err(ProcessError::Io(e)) => return Err(PipelineError::Io(e)),
        };

        if stage.kind.must_succeed() {
            if code != Some(0) {
                return Err(PipelineError::StageFailed {
                    stage: stage.kind.label(),
                    code: code.unwrap_or(-1),
                });
            }
        } else if code != Some(0) {
            match code {
                Some(c) => sinks.info.append(&format!("Process exited with code {c}\n")),
                None => sinks.info.append("Process terminated by signal\n"),
            }
        }
    }

    Ok(())
}
