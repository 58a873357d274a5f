use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::frame::LumaFrame;
use crate::matcher::MatcherProvider;
use crate::multibox_tracker::{FrameOutcome, MultiBoxTracker, ProcessReport};
use crate::palette::Color;
use crate::rect::Rect;
use crate::test_support::{blank_frame, ScriptedBackend, SharedScript};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::thread;

const W: usize = 320;
const H: usize = 240;

fn scripted_tracker() -> (MultiBoxTracker, SharedScript, MatcherProvider) {
    let (backend, script) = ScriptedBackend::new();
    let provider = MatcherProvider::new(backend);
    let tracker =
        MultiBoxTracker::new(TrackerConfig::default(), provider.clone()).unwrap();
    (tracker, script, provider)
}

fn det(id: &str, x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Detection {
    Detection::new(id, "car", confidence, Rect::new(x, y, w, h))
}

#[test]
fn test_snapshot_is_stable_between_mutations() {
    let (tracker, _script, _provider) = scripted_tracker();
    let data = blank_frame(W, H);
    let frame = LumaFrame::packed(&data, W, H).unwrap();
    tracker.on_frame(&frame, 0, 1).unwrap();
    tracker
        .process(
            &[
                det("a", 10.0, 10.0, 40.0, 40.0, 0.9),
                det("b", 200.0, 100.0, 40.0, 40.0, 0.7),
            ],
            &frame,
            1,
        )
        .unwrap();

    let first = tracker.tracked_objects();
    let second = tracker.tracked_objects();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert!(first[0].track_id < first[1].track_id);
    assert_eq!(first[0].color, Color::BLUE);
    assert_eq!(first[1].color, Color::RED);
    assert_eq!(first[0].label.as_deref(), Some("car"));
}

#[test]
fn test_busy_process_is_dropped() {
    let (tracker, _script, _provider) = scripted_tracker();
    let data = blank_frame(W, H);
    let frame = LumaFrame::packed(&data, W, H).unwrap();
    tracker.on_frame(&frame, 0, 1).unwrap();
    let batch = [det("a", 10.0, 10.0, 40.0, 40.0, 0.9)];

    tracker.set_processing(true);
    let report = tracker.process(&batch, &frame, 1).unwrap();
    assert_eq!(report, ProcessReport::skipped());
    assert!(tracker.tracked_objects().is_empty());

    tracker.set_processing(false);
    let report = tracker.process(&batch, &frame, 1).unwrap();
    assert_eq!(report.accepted, 1);
}

#[test]
fn test_in_flight_flag_clears_after_process() {
    let (tracker, _script, _provider) = scripted_tracker();
    let data = blank_frame(W, H);
    let frame = LumaFrame::packed(&data, W, H).unwrap();
    tracker.on_frame(&frame, 0, 1).unwrap();

    for i in 0..3 {
        let x = 10.0 + 90.0 * i as f32;
        let report = tracker
            .process(&[det("a", x, 10.0, 40.0, 40.0, 0.9)], &frame, 1)
            .unwrap();
        assert!(!report.skipped);
    }
    assert_eq!(tracker.tracked_objects().len(), 3);
}

#[test]
fn test_debug_detections_include_degenerate_boxes() {
    let (tracker, _script, _provider) = scripted_tracker();
    let data = blank_frame(W, H);
    let frame = LumaFrame::packed(&data, W, H).unwrap();
    tracker.on_frame(&frame, 0, 1).unwrap();

    let batch = [
        det("tiny", 0.0, 0.0, 8.0, 8.0, 0.99),
        det("big", 100.0, 100.0, 50.0, 50.0, 0.6),
    ];
    let report = tracker.process(&batch, &frame, 1).unwrap();

    assert_eq!(report.degenerate, 1);
    assert_eq!(tracker.debug_detections(), batch.to_vec());
    let tracked = tracker.tracked_objects();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].rect, Rect::new(100.0, 100.0, 50.0, 50.0));
}

#[test]
fn test_detection_only_tracker() {
    let tracker = MultiBoxTracker::detection_only(TrackerConfig::default()).unwrap();
    let data = blank_frame(W, H);
    let frame = LumaFrame::packed(&data, W, H).unwrap();

    assert!(tracker.is_detection_only());
    assert_eq!(tracker.on_frame(&frame, 0, 1).unwrap(), FrameOutcome::DetectionOnly);

    tracker
        .process(
            &[
                det("a", 0.0, 0.0, 40.0, 40.0, 0.5),
                det("b", 0.0, 0.0, 40.0, 40.0, 0.4),
            ],
            &frame,
            1,
        )
        .unwrap();
    let first = tracker.tracked_objects();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].color, Color::BLUE);
    assert_eq!(first[1].color, Color::RED);
    assert_eq!(first[0].correlation, None);

    tracker
        .process(&[det("c", 50.0, 50.0, 40.0, 40.0, 0.3)], &frame, 2)
        .unwrap();
    let second = tracker.tracked_objects();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].color, Color::BLUE);
    assert!(second[0].track_id > first[1].track_id);
    tracker.with_state(|state| state.check_invariants());
}

#[test]
fn test_frame_geometry_is_recorded() {
    let (tracker, _script, _provider) = scripted_tracker();
    assert_eq!(tracker.frame_geometry(), None);

    let data = vec![0u8; 400 * H];
    let frame = LumaFrame::new(&data, W, H, 400).unwrap();
    tracker.on_frame(&frame, 270, 1).unwrap();

    let geometry = tracker.frame_geometry().unwrap();
    assert_eq!(geometry.width, W);
    assert_eq!(geometry.row_stride, 400);
    assert_eq!(geometry.sensor_orientation, 270);
    assert_eq!(tracker.palette_capacity(), tracker.available_colors());
}

#[test]
fn test_dropping_tracker_closes_matcher() {
    let (tracker, script, provider) = scripted_tracker();
    let data = blank_frame(W, H);
    let frame = LumaFrame::packed(&data, W, H).unwrap();
    tracker.on_frame(&frame, 0, 1).unwrap();
    assert!(provider.is_live());

    drop(tracker);

    assert!(!provider.is_live());
    assert!(script.lock().released);

    let replacement =
        MultiBoxTracker::new(TrackerConfig::default(), provider.clone()).unwrap();
    assert!(replacement.on_frame(&frame, 0, 2).is_ok());
    assert!(provider.is_live());
}

#[test]
fn test_concurrent_frames_and_batches_keep_invariants() {
    let (backend, script) = ScriptedBackend::new();
    let config = TrackerConfig::default().with_colors(vec![
        Color::BLUE,
        Color::RED,
        Color::GREEN,
        Color::YELLOW,
    ]);
    let tracker =
        Arc::new(MultiBoxTracker::new(config, MatcherProvider::new(backend)).unwrap());

    let feeder = {
        let tracker = Arc::clone(&tracker);
        let script = Arc::clone(&script);
        thread::spawn(move || {
            let data = blank_frame(W, H);
            let frame = LumaFrame::packed(&data, W, H).unwrap();
            let mut rng = StdRng::seed_from_u64(7);
            for timestamp in 1..=400u64 {
                if timestamp % 5 == 0 {
                    let mut script = script.lock();
                    let handles: Vec<u64> = script.readings.keys().copied().collect();
                    if let Some(&handle) = handles.first() {
                        let correlation = rng.gen_range(0.0f32..1.0);
                        if let Some(reading) = script.readings.get_mut(&handle) {
                            reading.correlation = correlation;
                        }
                    }
                }
                tracker.on_frame(&frame, 0, timestamp).unwrap();
                tracker.with_state(|state| state.check_invariants());
            }
        })
    };

    let detector = {
        let tracker = Arc::clone(&tracker);
        let script = Arc::clone(&script);
        thread::spawn(move || {
            let data = blank_frame(W, H);
            let frame = LumaFrame::packed(&data, W, H).unwrap();
            let mut rng = StdRng::seed_from_u64(42);
            for round in 0..200u64 {
                let count = rng.gen_range(0..6usize);
                let mut batch = Vec::with_capacity(count);
                {
                    let mut script = script.lock();
                    for _ in 0..count {
                        script.queue(rng.gen_range(0.5f32..1.0));
                    }
                }
                for i in 0..count {
                    let w = rng.gen_range(10..90) as f32;
                    let h = rng.gen_range(10..90) as f32;
                    let x = rng.gen_range(0..W - 90) as f32;
                    let y = rng.gen_range(0..H - 90) as f32;
                    let confidence = rng.gen_range(0.0f32..1.0);
                    batch.push(det(&i.to_string(), x, y, w, h, confidence));
                }
                tracker.process(&batch, &frame, round).unwrap();
                tracker.with_state(|state| state.check_invariants());
            }
        })
    };

    feeder.join().unwrap();
    detector.join().unwrap();

    tracker.with_state(|state| state.check_invariants());
    assert!(tracker.tracked_objects().len() <= 4);
}
