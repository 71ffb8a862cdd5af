//! Demonstration of the Synheart Ambient tick pipeline.
//!
//! This example shows how to:
//! 1. Build a tracking session from configuration
//! 2. Subscribe to committed state changes
//! 3. Feed scripted interaction bursts with explicit timestamps
//! 4. Inspect per-tick signals, scores and arbiter state
//!
//! Run with: cargo run --example tick_demo

use chrono::{Duration, TimeZone, Utc};
use synheart_ambient::{collector::SensorEvent, Config, Hypothesis, TrackingSession};

fn main() {
    println!("Synheart Ambient - Tick Demo");
    println!("============================");
    println!();

    let config = Config::default();
    let mut session = match TrackingSession::new(&config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    session.subscribe(Box::new(|change| {
        println!("  >>> committed {}", change.describe());
    }));

    let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
    session.start(start);

    let tick = Duration::milliseconds(config.tick_interval.as_millis() as i64);
    let phases: [(&str, usize, Hypothesis); 4] = [
        ("typing", 6, Hypothesis::Focused),
        ("reading", 6, Hypothesis::Reading),
        ("erratic pointer", 6, Hypothesis::Alert),
        ("away", 16, Hypothesis::Calm),
    ];

    let mut now = start;
    let mut scroll_offset = 0.0;
    let mut pointer_x = 0.0;

    for (name, ticks, expected) in phases {
        println!("Phase: {name} (expecting {expected})");
        for _ in 0..ticks {
            let step = tick / 8;
            for i in 0..8 {
                let at = now + step * i;
                let event = match name {
                    "typing" => Some(SensorEvent::key_down(i == 7, at)),
                    "reading" => {
                        scroll_offset += 30.0;
                        Some(SensorEvent::scroll(scroll_offset, at))
                    }
                    "erratic pointer" => {
                        pointer_x = if i % 2 == 0 { pointer_x + 300.0 } else { pointer_x - 300.0 };
                        Some(SensorEvent::pointer_move(pointer_x, 0.0, at))
                    }
                    _ => None,
                };
                if let Some(event) = event {
                    session.ingest(&event);
                }
            }

            now += tick;
            session.tick(now);
            if let Some(eval) = session.last_evaluation() {
                println!(
                    "  tick {:>3}: winner {:<9} streak {} | pointer {:.2} reversals {:.2} scroll {:.2} keys {:.2} idle {:.2}",
                    eval.tick,
                    eval.winner.as_str(),
                    eval.arbiter.streak,
                    eval.signals.pointer_speed,
                    eval.signals.direction_reversals,
                    eval.signals.scroll_speed,
                    eval.signals.keypresses,
                    eval.signals.idle,
                );
            }
        }
        println!("  current state: {}", session.label());
        println!();
    }

    session.stop();
}
