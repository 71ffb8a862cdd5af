//! Integration tests for deterministic replay of recorded event streams

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use synheart_ambient::core::{load_events, replay, Scores, StateChange};
use synheart_ambient::{Config, Hypothesis, SensorEvent};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap()
}

fn at_ms(ms: i64) -> DateTime<Utc> {
    start() + Duration::milliseconds(ms)
}

/// Six keypresses inside each of `ticks` consecutive 800ms ticks.
fn typing(ticks: i64) -> Vec<SensorEvent> {
    (0..ticks)
        .flat_map(|tick| (0..6).map(move |key| SensorEvent::key_down(false, at_ms(tick * 800 + 100 + key * 50))))
        .collect()
}

/// Steady downward scrolling, 480px per tick.
fn reading(ticks: i64) -> Vec<SensorEvent> {
    (0..ticks * 8)
        .map(|i| SensorEvent::scroll((i + 1) as f64 * 60.0, at_ms(i * 100 + 50)))
        .collect()
}

/// Transitions without the random session id.
fn transitions(changes: &[StateChange]) -> Vec<(u64, DateTime<Utc>, Option<Hypothesis>, Hypothesis, Scores)> {
    changes
        .iter()
        .map(|c| (c.tick, c.at, c.from, c.to, c.scores))
        .collect()
}

#[test]
fn test_replay_is_deterministic() {
    let config = Config::default();
    let mut events = typing(8);
    events.extend(reading(8).into_iter().map(|mut e| {
        e.timestamp += Duration::milliseconds(8 * 800);
        e
    }));

    let first = replay(&config, start(), &events).unwrap();
    let second = replay(&config, start(), &events).unwrap();

    assert!(!first.is_empty());
    assert_eq!(transitions(&first), transitions(&second));
}

#[test]
fn test_unordered_recording_matches_ordered() {
    let config = Config::default();
    let events = typing(5);
    let mut shuffled = events.clone();
    shuffled.reverse();

    assert_eq!(
        transitions(&replay(&config, start(), &events).unwrap()),
        transitions(&replay(&config, start(), &shuffled).unwrap())
    );
}

#[test]
fn test_typing_commits_focused_at_threshold() {
    let changes = replay(&Config::default(), start(), &typing(10)).unwrap();

    let first = &changes[0];
    assert_eq!(first.from, None);
    assert_eq!(first.to, Hypothesis::Focused);
    assert_eq!(first.tick, 3);
    assert_eq!(first.at, at_ms(3 * 800));
}

#[test]
fn test_scrolling_commits_reading() {
    let changes = replay(&Config::default(), start(), &reading(10)).unwrap();

    assert_eq!(changes[0].to, Hypothesis::Reading);
    assert_eq!(changes[0].tick, 3);
}

#[test]
fn test_recording_ends_calm() {
    let changes = replay(&Config::default(), start(), &typing(6)).unwrap();

    let states: Vec<_> = changes.iter().map(|c| c.to).collect();
    assert_eq!(states.first(), Some(&Hypothesis::Focused));
    assert_eq!(states.last(), Some(&Hypothesis::Calm));
}

#[test]
fn test_commits_are_spaced_by_threshold() {
    let config = Config::default();
    let mut events = typing(4);
    events.extend(reading(4).into_iter().map(|mut e| {
        e.timestamp += Duration::milliseconds(4 * 800);
        e
    }));
    events.extend(typing(4).into_iter().map(|mut e| {
        e.timestamp += Duration::milliseconds(8 * 800);
        e
    }));

    let changes = replay(&config, start(), &events).unwrap();
    for pair in changes.windows(2) {
        assert!(pair[1].tick - pair[0].tick >= config.hysteresis_threshold as u64);
        assert_eq!(pair[1].from, Some(pair[0].to));
        assert_ne!(pair[1].to, pair[0].to);
    }
}

#[test]
fn test_higher_threshold_delays_commit() {
    let config = Config {
        hysteresis_threshold: 5,
        ..Config::default()
    };
    let changes = replay(&config, start(), &typing(10)).unwrap();
    assert_eq!(changes[0].to, Hypothesis::Focused);
    assert_eq!(changes[0].tick, 5);
}

#[test]
fn test_sparse_recording_replays_quickly() {
    // A century between the typing and one stray click
    let gap_ms: i64 = 36_525 * 24 * 60 * 60 * 1000;
    let mut events = typing(6);
    events.push(SensorEvent::click(at_ms(gap_ms + 100)));

    let began = std::time::Instant::now();
    let changes = replay(&Config::default(), start(), &events).unwrap();
    assert!(began.elapsed() < std::time::Duration::from_secs(30));

    let states: Vec<_> = changes.iter().map(|c| c.to).collect();
    assert_eq!(states.first(), Some(&Hypothesis::Focused));
    assert_eq!(states.last(), Some(&Hypothesis::Calm));

    // Tick numbering stays aligned with wall-clock tick times across the gap
    let after_gap = changes
        .iter()
        .find(|c| c.at > at_ms(gap_ms))
        .expect("the stray click produces a commit");
    assert_eq!(after_gap.to, Hypothesis::Neutral);
    assert_eq!(after_gap.tick, (gap_ms / 800 + 3) as u64);
    assert_eq!(after_gap.at, at_ms(gap_ms + 3 * 800));
    for change in &changes {
        assert_eq!(change.at, at_ms(change.tick as i64 * 800));
    }
}

#[test]
fn test_replay_from_jsonl_file() {
    let events = typing(4);
    let jsonl: String = events
        .iter()
        .map(|e| serde_json::to_string(e).unwrap() + "\n")
        .collect();

    let path = std::env::temp_dir().join(format!("synheart-ambient-replay-{}.jsonl", uuid::Uuid::new_v4()));
    std::fs::write(&path, jsonl).unwrap();
    let loaded = load_events(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.len(), events.len());
    let config = Config::default();
    assert_eq!(
        transitions(&replay(&config, start(), &loaded).unwrap()),
        transitions(&replay(&config, start(), &events).unwrap())
    );
}
