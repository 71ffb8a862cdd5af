//! HTTP server for feeding interaction events from a browser or desktop shell.
//!
//! This module provides an HTTP server that:
//! - Accepts batches of interaction events via POST /events
//! - Runs them through a tracking session on the scheduler thread
//! - Exposes the current committed state via GET /state
//!
//! # Architecture
//!
//! ```text
//! UI shell ──→ POST /events ──→ collector queue ──→ scheduler ──→ watch channel
//!                                                                      ↓
//! UI shell ←────────────────────── GET /state ←────────────────────────┘
//! ```

use crate::collector::{Collector, CollectorError, EventSender, SensorEvent, Timestamp};
use crate::config::Config;
use crate::core::scorer::state_label;
use crate::core::session::TrackingSession;
use crate::scheduler::Scheduler;
use crate::transparency::create_shared_log_with_persistence;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Classifier configuration for the session behind the server
    pub config: Config,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, config: Config) -> Self {
        Self { port, config }
    }
}

/// Committed state as published to HTTP clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: String,
    /// When the current state was committed, absent while still "auto"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<Timestamp>,
    pub tick: u64,
    pub session_id: Uuid,
}

/// Shared server state
pub struct ServerState {
    sender: EventSender,
    current: watch::Receiver<StateResponse>,
}

/// Response from the events endpoint
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub accepted: usize,
    pub dropped: usize,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /events
///
/// Queues a batch of events for the scheduler. Events from disabled sources
/// are counted as dropped.
async fn ingest_events(
    State(state): State<Arc<ServerState>>,
    Json(events): Json<Vec<SensorEvent>>,
) -> Result<Json<IngestResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut accepted = 0;
    let mut dropped = 0;

    for event in events {
        match state.sender.send(event) {
            Ok(true) => accepted += 1,
            Ok(false) => dropped += 1,
            Err(e) => {
                let code = match e {
                    CollectorError::QueueFull => "QUEUE_FULL",
                    _ => "QUEUE_CLOSED",
                };
                return Err((
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ErrorResponse {
                        error: format!("{e} after {accepted} events"),
                        code: code.to_string(),
                    }),
                ));
            }
        }
    }

    Ok(Json(IngestResponse {
        status: "ok".to_string(),
        accepted,
        dropped,
    }))
}

/// GET /state
async fn current_state(State(state): State<Arc<ServerState>>) -> Json<StateResponse> {
    Json(state.current.borrow().clone())
}

/// A running server. Dropping it without [`shutdown`](Self::shutdown) leaves
/// the server task running until the runtime ends.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting requests, stop the scheduler and save statistics.
    /// Resolves once all of that has finished.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Server task failed: {}", e);
        }
    }
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<ServerHandle> {
    let mut session = TrackingSession::new(&config.config)?;

    let mut collector = Collector::new(config.config.sources.clone());
    collector.start()?;

    let (state_tx, state_rx) = watch::channel(StateResponse {
        state: state_label(None).to_string(),
        since: None,
        tick: 0,
        session_id: Uuid::nil(),
    });
    let state_tx = Arc::new(state_tx);
    let publisher = Arc::clone(&state_tx);
    session.subscribe(Box::new(move |change| {
        publisher.send_replace(StateResponse {
            state: change.to.to_string(),
            since: Some(change.at),
            tick: change.tick,
            session_id: change.session_id,
        });
    }));

    let log = create_shared_log_with_persistence(config.config.data_path.join("transparency.json"));
    let scheduler = Scheduler::spawn(
        session,
        collector.receiver().clone(),
        config.config.tick_interval,
        log.clone(),
    )?;

    // The session id is assigned when the scheduler starts the session
    let session_id = scheduler.session_id();
    state_tx.send_modify(|current| {
        if current.session_id.is_nil() {
            current.session_id = session_id;
        }
    });

    let state = Arc::new(ServerState {
        sender: collector.sender(),
        current: state_rx,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/events", post(ingest_events))
        .route("/state", get(current_state))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Ambient classifier listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }

        collector.stop();
        match tokio::task::spawn_blocking(move || scheduler.stop()).await {
            Ok(stats) => tracing::info!(
                ticks = stats.ticks_evaluated,
                commits = stats.state_commits,
                "Scheduler stopped"
            ),
            Err(e) => tracing::error!("Scheduler shutdown failed: {}", e),
        }
        if let Err(e) = log.save() {
            tracing::warn!("Could not save transparency log: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown: shutdown_tx,
        task,
    })
}
