//! Wall-clock scheduler.
//!
//! Moves a [`TrackingSession`] onto its own thread. That thread is the only
//! consumer of the collector queue and the only caller of `tick`, so event
//! handling and evaluation never interleave.

use crate::collector::types::SensorEvent;
use crate::core::session::TrackingSession;
use crate::transparency::{SharedTransparencyLog, TransparencyStats};
use chrono::Utc;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use uuid::Uuid;

/// Spawns tracking sessions onto a scheduler thread.
pub struct Scheduler;

impl Scheduler {
    /// Start `session` and evaluate it every `interval`.
    ///
    /// Listeners registered on the session before this call stay attached.
    /// The thread exits when the handle is stopped or dropped, or when every
    /// sender of `events` is gone. Activity is stamped with the time each
    /// event is received, not the timestamp it carries.
    pub fn spawn(
        mut session: TrackingSession,
        events: Receiver<SensorEvent>,
        interval: Duration,
        log: SharedTransparencyLog,
    ) -> io::Result<SchedulerHandle> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        session.start(Utc::now());
        let session_id = session.session_id();

        let thread = thread::Builder::new()
            .name("synheart-scheduler".to_string())
            .spawn({
                let log = log.clone();
                move || run_loop(session, events, interval, shutdown_rx, log)
            })?;

        Ok(SchedulerHandle {
            session_id,
            shutdown: shutdown_tx,
            thread: Some(thread),
            log,
        })
    }
}

fn run_loop(
    mut session: TrackingSession,
    events: Receiver<SensorEvent>,
    interval: Duration,
    shutdown: Receiver<()>,
    log: SharedTransparencyLog,
) {
    let ticker = tick(interval);
    tracing::info!(
        session = %session.session_id(),
        interval_ms = interval.as_millis() as u64,
        "Tracking session started"
    );

    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => {
                    log.record_event(event.kind());
                    session.ingest_at(&event, Utc::now());
                }
                Err(_) => {
                    tracing::debug!("Event queue disconnected");
                    break;
                }
            },
            recv(ticker) -> _ => {
                log.record_tick();
                if let Some(change) = session.tick(Utc::now()) {
                    log.record_commit();
                    tracing::info!(session = %change.session_id, "State committed: {}", change.describe());
                } else if let Some(eval) = session.last_evaluation() {
                    tracing::debug!(
                        tick = eval.tick,
                        winner = %eval.winner,
                        streak = eval.arbiter.streak,
                        score = eval.scores.get(eval.winner),
                        "Tick evaluated"
                    );
                }
            },
            recv(shutdown) -> _ => break,
        }
    }

    session.stop();
    tracing::info!("Tracking session stopped");
}

/// Owner of a running scheduler thread.
pub struct SchedulerHandle {
    session_id: Uuid,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
    log: SharedTransparencyLog,
}

impl SchedulerHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// True once the scheduler thread has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Cancel the ticker, stop the session and wait for the thread.
    pub fn stop(mut self) -> TransparencyStats {
        self.shutdown_and_join();
        self.log.stats()
    }

    fn shutdown_and_join(&mut self) {
        if let Some(thread) = self.thread.take() {
            // The thread may already be gone after a disconnect
            let _ = self.shutdown.try_send(());
            if thread.join().is_err() {
                tracing::error!("Scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
