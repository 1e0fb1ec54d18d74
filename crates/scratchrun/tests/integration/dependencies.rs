//! Dependency fetching and the shared cache
//!
//! The fetch "tool" here is a shell script that records each invocation in
//! a counter file and drops a jar named after the identifier, so tests can
//! assert exactly how many fetches happened and what got copied into each
//! scratch directory.

use std::path::PathBuf;

use scratchrun::{Controller, Language};
use tempfile::TempDir;

use super::{request, run_only_language};

struct FetchFixture {
    _dir: TempDir,
    counter: PathBuf,
    command: String,
}

impl FetchFixture {
    /// Writes a fetch script logging `$1` to the counter file and creating
    /// `$1.jar` in the current (cache) directory.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("fetch-count");
        let script = dir.path().join("fetch.sh");
        std::fs::write(
            &script,
            format!("echo \"$1\" >> {}\ntouch \"$1.jar\"\n", counter.display()),
        )
        .unwrap();

        Self {
            command: format!("sh {}", script.display()),
            counter,
            _dir: dir,
        }
    }

    fn fetch_log(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.counter) {
            Ok(text) => text.lines().map(str::to_owned).collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn fetching_language(fixture: &FetchFixture, run_command: &str) -> Language {
    let mut language = run_only_language(run_command);
    language.dependency_command = Some(fixture.command.clone());
    language
}

#[tokio::test]
async fn dependency_fetched_once_and_copied_into_both_runs() {
    let fixture = FetchFixture::new();
    let mut controller = Controller::new().unwrap();

    for _ in 0..2 {
        let language = fetching_language(&fixture, "ls");
        let (request, collected) = request(language, "//DEPS acme-lib\n", "");
        controller.submit(request, || {}).wait().await;

        // The jar was copied into this run's scratch directory.
        assert!(collected.out.text().contains("acme-lib.jar"));
    }

    // ...but the fetch command ran only for the first session.
    assert_eq!(fixture.fetch_log(), vec!["acme-lib"]);
}

#[tokio::test]
async fn one_fetch_stage_per_marker_in_source_order() {
    let fixture = FetchFixture::new();
    let mut controller = Controller::new().unwrap();

    let language = fetching_language(&fixture, "ls");
    let source = "//DEPS first-lib\ncode here\n//DEPS second-lib\n";
    let (request, collected) = request(language, source, "");
    controller.submit(request, || {}).wait().await;

    assert_eq!(fixture.fetch_log(), vec!["first-lib", "second-lib"]);
    let listing = collected.out.text();
    assert!(listing.contains("first-lib.jar"));
    assert!(listing.contains("second-lib.jar"));
}

#[tokio::test]
async fn duplicate_markers_fetch_once_within_a_run() {
    let fixture = FetchFixture::new();
    let mut controller = Controller::new().unwrap();

    let language = fetching_language(&fixture, "ls");
    let (request, collected) = request(language, "//DEPS acme-lib\n//DEPS acme-lib\n", "");
    controller.submit(request, || {}).wait().await;

    // Both stages ran; the second was served from the cache.
    assert_eq!(fixture.fetch_log(), vec!["acme-lib"]);
    assert!(collected.out.text().contains("acme-lib.jar"));
}

#[tokio::test]
async fn fetched_jars_show_up_in_the_classpath() {
    let fixture = FetchFixture::new();
    let mut controller = Controller::new().unwrap();

    let mut language = fetching_language(&fixture, "echo done");
    language.compile_command = Some("echo $CLASSPATH".to_owned());

    let (request, collected) = request(language, "//DEPS acme-lib\n", "");
    controller.submit(request, || {}).wait().await;

    let out = collected.out.text();
    assert!(out.contains("acme-lib.jar"), "classpath was: {out}");
    assert!(out.contains("done\n"));
}

#[tokio::test]
async fn failed_fetch_aborts_the_pipeline() {
    let mut language = run_only_language("echo should-not-run");
    // `sh -c false <id>` exits 1 whatever the identifier.
    language.dependency_command = Some("sh -c false".to_owned());

    let mut controller = Controller::new().unwrap();
    let (request, collected) = request(language, "//DEPS broken-lib\n", "");

    let handle = controller.submit(request, || {});
    handle.wait().await;

    assert!(!collected.out.text().contains("should-not-run"));
}

#[tokio::test]
async fn failed_fetch_is_retried_by_a_later_run() {
    let fixture = FetchFixture::new();
    let mut controller = Controller::new().unwrap();

    // First run: a fetch command that always fails.
    let mut failing = run_only_language("echo first");
    failing.dependency_command = Some("sh -c false".to_owned());
    let (first_request, _) = request(failing, "//DEPS acme-lib\n", "");
    controller.submit(first_request, || {}).wait().await;

    // Second run on the same cache: the key was never registered, so the
    // working fetch command runs.
    let language = fetching_language(&fixture, "ls");
    let (second_request, collected) = request(language, "//DEPS acme-lib\n", "");
    controller.submit(second_request, || {}).wait().await;

    assert_eq!(fixture.fetch_log(), vec!["acme-lib"]);
    assert!(collected.out.text().contains("acme-lib.jar"));
}

#[tokio::test]
async fn fetch_announced_through_info() {
    let fixture = FetchFixture::new();
    let mut controller = Controller::new().unwrap();

    let language = fetching_language(&fixture, "echo done");
    let (request, collected) = request(language, "//DEPS acme-lib\n", "");
    controller.submit(request, || {}).wait().await;

    assert!(collected.info.text().contains("acme-lib"));
}
