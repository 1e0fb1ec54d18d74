//! Stage model for pipeline runs
//!
//! A stage is one external-process invocation. The stage list for a run is
//! fixed up front from the language definition and the source text.

use crate::config::Language;
use crate::deps::scan_dependencies;

/// The kind of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKind {
    /// Project initialization
    Init,

    /// Fetch of one dependency identifier
    Dependency(String),

    /// Compilation
    Compile,

    /// Program execution; the only stage that receives the caller's input
    Run,
}

impl StageKind {
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Init => "init",
            StageKind::Dependency(_) => "dependency",
            StageKind::Compile => "compile",
            StageKind::Run => "run",
        }
    }

    /// Whether a non-zero exit aborts the remaining stages.
    ///
    /// The run stage is last and its exit code is reported, not enforced.
    pub fn must_succeed(&self) -> bool {
        !matches!(self, StageKind::Run)
    }
}

/// One external-process invocation within a pipeline run.
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,

    /// Command template. Expanded at launch time, not list-build time, so
    /// `$CLASSPATH` sees files produced by earlier stages.
    pub template: String,
}

/// Build the ordered stage list for one run:
/// init? → dependencies (in source order) → compile? → run.
///
/// A stage whose template the language omits does not appear; dependency
/// markers are ignored entirely when the language has no fetch command.
pub fn build_stages(language: &Language, source: &str) -> Vec<Stage> {
    let mut stages = Vec::new();

    if let Some(template) = &language.init_command {
        stages.push(Stage {
            kind: StageKind::Init,
            template: template.clone(),
        });
    }

    if let Some(template) = &language.dependency_command {
        for id in scan_dependencies(source) {
            stages.push(Stage {
                kind: StageKind::Dependency(id),
                template: template.clone(),
            });
        }
    }

    if let Some(template) = &language.compile_command {
        stages.push(Stage {
            kind: StageKind::Compile,
            template: template.clone(),
        });
    }

    stages.push(Stage {
        kind: StageKind::Run,
        template: language.run_command.clone(),
    });

    stages
}
