//! A library for compiling and running code in configurable languages.
//!
//! Scratchrun takes source text in a declaratively-configured language and
//! builds and executes it by invoking the language's external toolchain in
//! an ephemeral scratch directory, streaming output back to the caller as
//! it is produced.
//!
//! # Features
//!
//! - **Declarative languages** — TOML-configured command templates for
//!   init, dependency fetch, compile, and run stages.
//! - **Staged pipeline** — stages run strictly in order; a failing build
//!   stage stops the pipeline before the program ever runs.
//! - **Live output** — concurrent pumps deliver stdout and stderr lines as
//!   the processes write them, plus a diagnostic channel.
//! - **Dependency cache** — dependencies requested by source markers are
//!   fetched once per process and copied into later runs.
//! - **Cancellation** — a run handle kills the active process and still
//!   cleans up; submitting a new run supersedes the previous one.

pub use command::{classpath_for, expand_template};
pub use config::{Config, ConfigError, DEFAULT_BASE_NAME, EXAMPLE_CONFIG, FileExtension, Language};
pub use deps::{DEPENDENCY_MARKER, DependencyCache, DependencyError, scan_dependencies};
pub use pipeline::{PipelineError, RunRequest, Stage, StageKind, build_stages};
pub use scratch::Scratchpad;
pub use session::{Controller, RunHandle, RunningChanged};
pub use sink::{Appender, OutputSinks};

pub mod command;
pub mod config;
pub mod deps;
mod exec;
pub mod pipeline;
pub mod scratch;
pub mod session;
pub mod sink;
