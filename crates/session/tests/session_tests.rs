//! End-to-end tests for the annotation session: loading the bundled sample
//! data, editing tracks, and headless playback on a paused Tokio clock.

use std::path::PathBuf;
use std::sync::Arc;

use assert_matches::assert_matches;
use tokio_util::sync::CancellationToken;

use scrub_core::frame::FrameSequence;
use scrub_core::playback::PlaybackSpeed;
use scrub_core::review::{find_match, load_matches, ReviewQueue};
use scrub_core::types::{TrackClass, TrackId};
use scrub_core::CoreError;
use scrub_events::{EventBus, SessionEventKind};
use scrub_session::runner::play_through;
use scrub_session::{AnnotationSession, SessionOptions};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .join(name)
}

fn sample_session() -> AnnotationSession {
    let frames = FrameSequence::load(data_path("frames.json")).expect("sample frames load");
    AnnotationSession::new(frames, SessionOptions::default(), Arc::new(EventBus::default()))
}

fn ids(v: &[TrackId]) -> Vec<&str> {
    v.iter().map(TrackId::as_str).collect()
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

#[test]
fn sample_data_loads_with_mixed_id_types() {
    let s = sample_session();
    assert_eq!(s.frames().len(), 12);
    assert_eq!(ids(s.filtered_track_ids()), vec!["1", "2", "3", "4", "5", "7"]);
    assert_eq!(s.allocator().peek_next_id(), 8);

    let counts = s.class_counts();
    assert_eq!(counts[&TrackClass::TeamA], 2);
    assert_eq!(counts[&TrackClass::TeamB], 3);
    assert_eq!(counts[&TrackClass::Referee], 1);

    let seven = &s.stats()[&TrackId::from("7")];
    assert_eq!(seven.start_frame_index, 5);
    assert_eq!(seven.occurrence_count, 5);
}

#[test]
fn sample_match_and_review_queue() {
    let matches = load_matches(data_path("matches.json")).unwrap();
    assert_eq!(find_match(&matches, 1).unwrap().title, "Riverside FC vs Harbor United");

    let mut queue = ReviewQueue::from_matches(&matches);
    let queued: Vec<u64> = queue.items().iter().map(|m| m.id).collect();
    assert_eq!(queued, vec![1, 3, 5]);
    queue.validate(3).unwrap();
    assert_matches!(queue.reject(3), Err(CoreError::InvalidOperation(_)));
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

#[test]
fn merge_scenario_from_json() {
    let frames = FrameSequence::from_json_str(
        r#"[
            {"timestamp": 0.0, "tracks": [
                {"track_id": 1, "class": "team A", "bbox": [10, 10, 30, 50]},
                {"track_id": "2", "class": "team B", "bbox": [100, 10, 120, 50]}
            ]},
            {"timestamp": 0.5, "tracks": [
                {"track_id": 1, "class": "team A", "bbox": [12, 10, 32, 50]}
            ]},
            {"timestamp": 1.0, "tracks": [
                {"track_id": 2, "class": "team B", "bbox": [104, 10, 124, 50]}
            ]}
        ]"#,
    )
    .unwrap();
    let mut s =
        AnnotationSession::new(frames, SessionOptions::default(), Arc::new(EventBus::default()));

    let one = &s.stats()[&TrackId::from("1")];
    assert_eq!((one.occurrence_count, one.start_frame_index), (2, 0));
    let two = &s.stats()[&TrackId::from("2")];
    assert_eq!((two.occurrence_count, two.start_frame_index), (2, 0));

    s.toggle_checked(&TrackId::from("1"));
    s.toggle_checked(&TrackId::from("2"));
    let merged = s.merge_checked().unwrap();
    assert_eq!(merged.as_str(), "3");

    let frames = s.frames();
    let f0 = &frames.get(0).unwrap().detections;
    assert_eq!(f0.len(), 1);
    assert_eq!(f0[0].track_id.as_str(), "3");
    assert_eq!(f0[0].class, TrackClass::TeamA);
    assert_eq!(f0[0].bbox.x1, 10.0);
    assert_eq!(frames.get(1).unwrap().detections[0].track_id.as_str(), "3");
    assert!(frames.get(2).unwrap().detections.is_empty());
    assert_eq!(s.activity().last().unwrap().message, "Merge [1, 2] → 3");
}

#[test]
fn repeated_splits_never_collide() {
    let mut s = sample_session();
    let three = TrackId::from("3");

    s.select_track(Some(three.clone()));
    s.seek(4);
    let (a, b) = s.split_selected().unwrap();
    assert_eq!((a.as_str(), b.as_str()), ("3_a", "3_b"));

    // Split the later half again.
    s.select_track(Some(b.clone()));
    s.seek(8);
    let (ba, bb) = s.split_selected().unwrap();
    assert_eq!((ba.as_str(), bb.as_str()), ("3_b_a", "3_b_b"));

    let total: usize = [&a, &ba, &bb]
        .iter()
        .map(|id| s.stats()[*id].occurrence_count)
        .sum();
    assert_eq!(total, 12);
    assert!(!s.frames().contains_track(&three));
    assert_eq!(s.activity().len(), 2);
}

#[test]
fn hidden_class_survives_mutation() {
    let mut s = sample_session();
    s.toggle_class(TrackClass::Referee);
    s.select_track(Some(TrackId::from("2")));
    s.delete_selected(|_| true).unwrap();
    assert_eq!(ids(s.filtered_track_ids()), vec!["1", "3", "4", "7"]);
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn headless_run_renders_every_frame() {
    let mut s = sample_session();
    let dir = tempfile::tempdir().unwrap();

    let summary = play_through(&mut s, Some(dir.path()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.frames_rendered, 12);
    assert_eq!(summary.final_frame, 11);
    assert_eq!(summary.boxes_drawn, 4 + 4 + 4 + 5 + 5 + 6 + 6 + 6 + 5 + 5 + 4 + 4);
    assert!(!summary.cancelled);
    assert_eq!(summary.saved.len(), 12);
    assert!(dir.path().join("frame_0011.png").exists());
    assert!(!s.playback().is_playing());
}

#[tokio::test(start_paused = true)]
async fn playback_time_follows_speed() {
    let mut s = sample_session();
    s.set_speed(PlaybackSpeed::Double);

    let started = tokio::time::Instant::now();
    play_through(&mut s, None, CancellationToken::new())
        .await
        .unwrap();

    // Eleven advances at 500 ms each.
    assert_eq!(started.elapsed().as_millis(), 5500);
}

#[tokio::test(start_paused = true)]
async fn speed_change_while_playing_keeps_position() {
    let mut s = sample_session();
    assert!(s.play());
    s.next_tick().await;
    s.next_tick().await;
    assert_eq!(s.frame_index(), 2);

    s.set_speed(PlaybackSpeed::Half);
    let before = tokio::time::Instant::now();
    s.next_tick().await;
    assert_eq!(s.frame_index(), 3);
    assert_eq!(before.elapsed().as_millis(), 2000);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_pauses_session() {
    let mut s = sample_session();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = play_through(&mut s, None, cancel).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.frames_rendered, 1);
    assert!(!s.playback().is_playing());
    assert_eq!(s.frame_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn frame_events_follow_playback() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let frames = FrameSequence::load(data_path("frames.json")).unwrap();
    let mut s = AnnotationSession::new(frames, SessionOptions::default(), bus);

    s.seek(9);
    play_through(&mut s, None, CancellationToken::new())
        .await
        .unwrap();

    let frames_seen: Vec<usize> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|e| match e.kind {
            SessionEventKind::FrameChanged { frame_index } => Some(frame_index),
            _ => None,
        })
        .collect();
    assert_eq!(frames_seen, vec![9, 10, 11]);
}
