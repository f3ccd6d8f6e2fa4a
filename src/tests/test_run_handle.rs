use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use super::mock::{generator, MockSynthesizer};
use crate::generator::{GenerationRequest, OutputSettings, RunOutcome};
use crate::progress::StatusKind;
use crate::run::RunHandle;
use crate::script::DialogueLine;

fn request(dir: &std::path::Path, count: usize) -> GenerationRequest {
    let lines = (1..=count)
        .map(|i| DialogueLine::new("A", format!("line {}", i), "en-US-JennyNeural"))
        .collect();
    GenerationRequest::new(
        lines,
        OutputSettings {
            output_dir: dir.to_path_buf(),
            filename_template: "{index}_{speaker}.wav".to_string(),
            merge: true,
            merged_filename: "all.wav".to_string(),
            delete_singles: false,
        },
    )
    .unwrap()
}

#[test]
fn test_run_in_background() {
    let dir = tempdir().unwrap();
    let mut handle = RunHandle::spawn(generator(Arc::new(MockSynthesizer::new())), request(dir.path(), 2)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(30);
    while !handle.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let events: Vec<_> = std::iter::from_fn(|| handle.try_next_event()).collect();
    let result = handle.join();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.files.len(), 3);
    assert_eq!(events.first().map(|e| e.kind()), Some(StatusKind::RunStarted));
    assert_eq!(events.last().map(|e| e.kind()), Some(StatusKind::Completed));
}

#[test]
fn test_cancel_before_start() {
    let dir = tempdir().unwrap();
    let mock = Arc::new(MockSynthesizer::new());
    let token = CancellationToken::new();
    token.cancel();

    let handle = RunHandle::spawn_with_token(generator(mock.clone()), request(dir.path(), 3), token).unwrap();
    assert!(handle.is_cancelled());

    let result = handle.join();
    assert_eq!(result.outcome, RunOutcome::Cancelled);
    assert!(result.files.is_empty());
    assert!(mock.calls().is_empty());
}

#[test]
fn test_cancel_running() {
    let dir = tempdir().unwrap();
    let handle = RunHandle::spawn(generator(Arc::new(MockSynthesizer::new())), request(dir.path(), 50)).unwrap();
    handle.cancel();

    let result = handle.join();
    assert!(matches!(result.outcome, RunOutcome::Cancelled | RunOutcome::Completed));
    if result.outcome == RunOutcome::Cancelled {
        assert!(result.merged.is_none());
    }
}
