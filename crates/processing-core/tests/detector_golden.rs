use rand::rngs::StdRng;
use rand::SeedableRng;

use reelsync_processing_core::motion_cluster::{FrameGeometry, MotionClusterDetector};
use reelsync_processing_core::range_filter::{chunk_windows, slice_chunks, Rebase};
use reelsync_processing_core::suggestions::SuggestionEngine;
use reelsync_processing_core::typing::{aggregate_suggestion, TypingClusterDetector};
use reelsync_project_model::event::{parse_events, serialize_events, TelemetryEvent};

const SCREEN: FrameGeometry = FrameGeometry {
    screen_width: 1920.0,
    screen_height: 1080.0,
    video_width: 1920.0,
    video_height: 1080.0,
};

/// Two dwell regions: (500, 300) for the first two seconds, then (1200, 600)
/// from t=3000 to t=5000, sampled every 100ms.
fn two_region_session() -> Vec<TelemetryEvent> {
    let mut events: Vec<_> = (0..=20u64)
        .map(|i| TelemetryEvent::mouse(i * 100, 500.0, 300.0))
        .collect();
    events.extend((0..=20u64).map(|i| TelemetryEvent::mouse(3000 + i * 100, 1200.0, 600.0)));
    events
}

fn block_signature(seed: u64) -> String {
    let detector = MotionClusterDetector::with_defaults();
    let mut rng = StdRng::seed_from_u64(seed);
    detector
        .detect(&two_region_session(), &SCREEN, 5000.0, &mut rng)
        .iter()
        .map(|b| {
            format!(
                "{}|{:.1}|{:.1}|{:.3}|{:.6}|{:.6}",
                b.id, b.start_time, b.end_time, b.scale, b.target_x, b.target_y
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn two_dwell_regions_produce_two_ordered_blocks() {
    let detector = MotionClusterDetector::with_defaults();
    let mut rng = StdRng::seed_from_u64(42);
    let blocks = detector.detect(&two_region_session(), &SCREEN, 5000.0, &mut rng);

    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].start_time < blocks[1].start_time);
    assert!(blocks[0].end_time <= blocks[1].start_time);

    assert!((blocks[0].target_x - 500.0 / 1920.0).abs() < 0.02);
    assert!((blocks[0].target_y - 300.0 / 1080.0).abs() < 0.02);
    assert!((blocks[1].target_x - 1200.0 / 1920.0).abs() < 0.02);
    assert!((blocks[1].target_y - 600.0 / 1080.0).abs() < 0.02);

    assert_eq!(blocks[0].start_time, 0.0);
    assert_eq!(blocks[0].end_time, 2300.0);
    assert_eq!(blocks[1].start_time, 3000.0);
    assert_eq!(blocks[1].end_time, 5000.0);

    for block in &blocks {
        assert!((1.0..=2.5).contains(&block.scale));
        assert!(block.end_time <= 5000.0);
    }
}

#[test]
fn detection_is_deterministic_for_a_seed() {
    assert_eq!(block_signature(42), block_signature(42));
    assert_eq!(block_signature(7), block_signature(7));
}

#[test]
fn telemetry_survives_jsonl_before_detection() {
    let events = two_region_session();
    let jsonl = serialize_events(None, &events).expect("serialize");
    let parsed = parse_events(&jsonl).expect("parse");

    let detector = MotionClusterDetector::with_defaults();
    let direct = detector.detect(&events, &SCREEN, 5000.0, &mut StdRng::seed_from_u64(1));
    let reparsed = detector.detect(&parsed, &SCREEN, 5000.0, &mut StdRng::seed_from_u64(1));
    assert_eq!(direct, reparsed);
}

#[test]
fn steady_typing_session_suggests_speedup() {
    let events: Vec<_> = (0..20u64)
        .map(|i| TelemetryEvent::key(1000 + i * 300, "a"))
        .collect();

    let periods = TypingClusterDetector::with_defaults().detect(&events);
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].key_count, 20);

    let suggestion = aggregate_suggestion(&periods).expect("one period");
    assert_eq!(suggestion.period_count, 1);
    assert!((suggestion.speed_multiplier - 2.5).abs() < 1e-9);
    assert!((suggestion.total_typing_ms - 5700.0).abs() < 1e-9);
}

#[test]
fn mixed_session_produces_both_suggestion_kinds() {
    let mut events = two_region_session();
    events.extend((0..20u64).map(|i| TelemetryEvent::key(6000 + i * 300, "a")));
    events.sort_by_key(|e| e.timestamp_ms);

    let suggestions = SuggestionEngine::with_seed(42).generate(&events, &SCREEN, 12_000.0);
    assert_eq!(suggestions.zoom_blocks.len(), 2);
    assert_eq!(suggestions.typing_periods.len(), 1);
    assert!(suggestions.typing.is_some());
}

#[test]
fn export_chunks_partition_the_session() {
    let events = two_region_session();
    let windows = chunk_windows(0, 4999, 1000);
    let slices = slice_chunks(&events, &windows, Rebase::Keep);

    assert_eq!(windows.len(), 5);
    let total: usize = slices.iter().map(Vec::len).sum();
    // The sample at t=5000 lies past the last window.
    assert_eq!(total, events.len() - 1);
    assert!(slices[2].iter().all(|e| (2000..=2999).contains(&e.timestamp_ms)));
}
