//! Queue-backed collector that external event sources push into.
//!
//! The collector owns a bounded crossbeam channel. Producers hold cloneable
//! [`EventSender`]s; the scheduler is the single consumer of the receiver.

use crate::collector::types::SensorEvent;
use crate::config::SourceConfig;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Capacity of the event queue between sources and the scheduler.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Errors that can occur during event collection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,

    #[error("Event queue is full")]
    QueueFull,

    #[error("Event queue is disconnected")]
    Disconnected,
}

/// Collects raw interaction events into a single-consumer queue.
pub struct Collector {
    sources: SourceConfig,
    sender: Sender<SensorEvent>,
    receiver: Receiver<SensorEvent>,
    running: Arc<AtomicBool>,
}

impl Collector {
    /// Create a new collector accepting the given sources.
    pub fn new(sources: SourceConfig) -> Self {
        Self::with_capacity(sources, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(sources: SourceConfig, capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sources,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start accepting events.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop accepting events. Senders stay valid but their events are dropped.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Handle for event sources.
    pub fn sender(&self) -> EventSender {
        EventSender {
            sources: self.sources.clone(),
            sender: self.sender.clone(),
            running: Arc::clone(&self.running),
        }
    }

    /// Get the receiver for sensor events.
    pub fn receiver(&self) -> &Receiver<SensorEvent> {
        &self.receiver
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<SensorEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Cloneable producer side of a [`Collector`].
#[derive(Clone)]
pub struct EventSender {
    sources: SourceConfig,
    sender: Sender<SensorEvent>,
    running: Arc<AtomicBool>,
}

impl EventSender {
    /// Queue an event without blocking.
    ///
    /// Returns `Ok(false)` when the event was dropped because the collector is
    /// stopped or its source is disabled.
    pub fn send(&self, event: SensorEvent) -> Result<bool, CollectorError> {
        if !self.running.load(Ordering::SeqCst) || !self.sources.accepts(event.kind()) {
            return Ok(false);
        }
        match self.sender.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Err(CollectorError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(CollectorError::Disconnected),
        }
    }
}
