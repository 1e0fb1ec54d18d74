//! Integration tests for scratchrun
//!
//! These drive real pipeline runs end to end. All commands are POSIX shell
//! utilities (sh, echo, cat, sleep, pwd, ls), so the tests run without any
//! language toolchain installed.

use std::sync::{Arc, Mutex};

use scratchrun::{Appender, FileExtension, Language, OutputSinks, RunRequest};

mod dependencies;
mod sessions;

/// A sink that accumulates everything appended to it.
pub(crate) struct Collect(Mutex<String>);

impl Collect {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(String::new())))
    }

    pub(crate) fn text(&self) -> String {
        self.0.lock().unwrap().clone()
    }
}

impl Appender for Collect {
    fn append(&self, text: &str) {
        self.0.lock().unwrap().push_str(text);
    }
}

pub(crate) struct Collected {
    pub(crate) out: Arc<Collect>,
    pub(crate) err: Arc<Collect>,
    pub(crate) info: Arc<Collect>,
}

pub(crate) fn collecting_sinks() -> (OutputSinks, Collected) {
    let out = Collect::new();
    let err = Collect::new();
    let info = Collect::new();
    let sinks = OutputSinks::new(out.clone(), err.clone(), info.clone());
    (sinks, Collected { out, err, info })
}

/// A minimal interpreted "language" whose run stage is the given template.
pub(crate) fn run_only_language(run_command: &str) -> Language {
    Language {
        name: "Test".to_owned(),
        extension: FileExtension::new("txt").unwrap(),
        init_command: None,
        dependency_command: None,
        compile_command: None,
        run_command: run_command.to_owned(),
        filename_pattern: None,
        template: String::new(),
        default_input: None,
    }
}

/// A "language" that executes its own source file through sh, so test
/// sources get full shell behavior (stderr, exit codes, ...).
pub(crate) fn shell_language() -> Language {
    Language {
        name: "Shell".to_owned(),
        extension: FileExtension::new("sh").unwrap(),
        init_command: None,
        dependency_command: None,
        compile_command: None,
        run_command: "sh $NAME$EXT".to_owned(),
        filename_pattern: None,
        template: String::new(),
        default_input: None,
    }
}

pub(crate) fn request(language: Language, source: &str, input: &str) -> (RunRequest, Collected) {
    let (sinks, collected) = collecting_sinks();
    let request = RunRequest {
        source: source.to_owned(),
        input: input.to_owned(),
        language,
        sinks,
    };
    (request, collected)
}
