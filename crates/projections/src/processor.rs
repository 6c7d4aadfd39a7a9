//! Projection processor for feeding events to projections.

use std::sync::Arc;
use std::time::Duration;

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// Delivers the committed event log to projections.
///
/// - Catch-up: replays the log and hands each projection the events past its
///   position
/// - Rebuild: resets all projections and replays from scratch
///
/// Positions are kept here, one per projection, and advance per stream.
/// An event whose predecessor in the same stream is not visible yet is held
/// back until a later run. Catch-up runs are serialized, so an event is never
/// delivered twice to the same projection even when reads and the background
/// loop race.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    positions: Mutex<Vec<ProjectionPosition>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            positions: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
        self.positions.get_mut().push(ProjectionPosition::zero());
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, projection: impl Projection + 'static) -> Self {
        self.register(Box::new(projection));
        self
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Current position of every projection, in registration order.
    pub async fn positions(&self) -> Vec<(&'static str, ProjectionPosition)> {
        let positions = self.positions.lock().await;
        self.projections
            .iter()
            .map(|projection| projection.name())
            .zip(positions.iter().cloned())
            .collect()
    }

    /// Streams the log and delivers every event a projection has not seen.
    ///
    /// Returns the number of deliveries made.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut positions = self.positions.lock().await;

        let mut stream = self.store.stream_all_events().await?;
        let mut events: u64 = 0;
        let mut delivered: u64 = 0;
        let mut held_back: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            events += 1;

            for (projection, position) in self.projections.iter().zip(positions.iter_mut()) {
                if position.has_seen(&event) {
                    continue;
                }
                if !position.is_next(&event) {
                    held_back += 1;
                    continue;
                }
                projection.handle(&event).await?;
                position.advance(&event);
                delivered += 1;
                metrics::counter!("projections_events_processed", "projection" => projection.name())
                    .increment(1);
            }
        }

        if held_back > 0 {
            tracing::debug!(held_back, "events waiting on an earlier stream version");
        }
        if delivered > 0 {
            tracing::info!(events, delivered, "catch-up complete");
        } else {
            tracing::debug!(events, "projections up to date");
        }

        Ok(delivered)
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        {
            let mut positions = self.positions.lock().await;
            for (projection, position) in self.projections.iter().zip(positions.iter_mut()) {
                tracing::info!(projection = projection.name(), "resetting projection");
                projection.reset().await?;
                *position = ProjectionPosition::zero();
            }
        }
        self.run_catch_up().await.map(|_| ())
    }
}

impl<S: EventStore + 'static> ProjectionProcessor<S> {
    /// Runs catch-up every `interval` until the task is aborted.
    ///
    /// Failures are logged and retried on the next tick.
    pub fn spawn_catch_up_loop(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_catch_up().await {
                    tracing::error!(error = %e, "projection catch-up failed");
                }
            }
        })
    }
}
