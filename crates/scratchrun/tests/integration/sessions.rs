//! Session lifecycle: completion callbacks, running state, supersession

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use scratchrun::Controller;

use super::{request, run_only_language};

#[tokio::test]
async fn running_state_goes_false_true_false() {
    let mut controller = Controller::new().unwrap();
    let states = Arc::new(Mutex::new(vec![false]));
    let states_clone = states.clone();
    controller.set_running_changed(move |running| {
        states_clone.lock().unwrap().push(running);
    });

    let (request, _) = request(run_only_language("echo hi"), "anything", "");
    let handle = controller.submit(request, || {});
    handle.wait().await;

    assert_eq!(*states.lock().unwrap(), vec![false, true, false]);
}

#[tokio::test]
async fn completion_callback_fires_exactly_once_per_outcome() {
    let mut controller = Controller::new().unwrap();

    for run_command in ["echo ok", "sh -c false", "scratchrun-no-such-binary"] {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let (request, _) = request(run_only_language(run_command), "anything", "");

        let handle = controller.submit(request, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        handle.wait().await;

        assert_eq!(fired.load(Ordering::SeqCst), 1, "command: {run_command}");
    }
}

#[tokio::test]
async fn submitting_supersedes_the_previous_session() {
    let mut controller = Controller::new().unwrap();
    let started = Instant::now();

    let fired_a = Arc::new(AtomicUsize::new(0));
    let fired_a_clone = fired_a.clone();
    let (request_a, _) = request(run_only_language("sleep 30"), "anything", "");
    let handle_a = controller.submit(request_a, move || {
        fired_a_clone.fetch_add(1, Ordering::SeqCst);
    });

    // B cancels A implicitly; A's callback still fires exactly once.
    let (request_b, collected_b) = request(run_only_language("echo second"), "anything", "");
    let handle_b = controller.submit(request_b, || {});

    handle_a.wait().await;
    handle_b.wait().await;

    assert_eq!(fired_a.load(Ordering::SeqCst), 1);
    assert_eq!(collected_b.out.text(), "second\n");
    // A's 30-second sleep must have been killed, not waited out.
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test]
async fn cancel_is_idempotent_and_never_fails() {
    let mut controller = Controller::new().unwrap();
    let (request, _) = request(run_only_language("sleep 30"), "anything", "");

    let handle = controller.submit(request, || {});
    handle.cancel();
    handle.cancel();
    handle.wait().await;
    handle.cancel(); // after completion: still a no-op
    assert!(handle.is_finished());
}

#[tokio::test]
async fn output_before_cancellation_is_kept() {
    let mut language = run_only_language("sleep 30");
    language.compile_command = Some("echo compiled".to_owned());

    let mut controller = Controller::new().unwrap();
    let (request, collected) = request(language, "anything", "");

    let handle = controller.submit(request, || {});
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.cancel();
    handle.wait().await;

    // Cancellation does not retract already-delivered output.
    assert_eq!(collected.out.text(), "compiled\n");
}
