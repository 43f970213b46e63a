//! Fixed-interval polling of both log streams.
//!
//! The poller owns one tokio task per stream. Each task keeps its own cursor,
//! fetches on every tick and forwards non-empty batches over a channel. The
//! session that consumes the channel is the only owner of derived state.
//!
//! A stream never has two requests in flight: the fetch is awaited inside the
//! task, and ticks that elapse meanwhile are skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PollingConfig;
use crate::types::StreamKind;

use super::cursor::LogCursor;
use super::source::{poll, Batch, LogSource};

/// A batch tagged with the session it was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    pub report_id: String,
    pub generation: u64,
    pub batch: Batch,
}

/// Handle to the two running stream tasks.
///
/// Dropping the handle stops polling. Requests already in flight are allowed
/// to finish; their batches still carry the old generation so a replaced
/// session ignores them.
pub struct Poller {
    report_id: String,
    generation: u64,
    stop: Arc<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Poller {
    /// Start polling both streams for `report_id`.
    ///
    /// Returns `None` for an empty report id. Must be called from within a
    /// tokio runtime.
    pub fn start(
        source: Arc<dyn LogSource>,
        report_id: &str,
        generation: u64,
        config: &PollingConfig,
        updates: mpsc::UnboundedSender<FeedUpdate>,
    ) -> Option<Self> {
        let report_id = report_id.trim();
        if report_id.is_empty() {
            tracing::debug!("No report id, polling not started");
            return None;
        }

        let (stop_tx, _) = watch::channel(false);
        let stop = Arc::new(stop_tx);

        let streams = [
            (StreamKind::Agent, config.agent_interval()),
            (StreamKind::Console, config.console_interval()),
        ];

        let tasks = streams
            .into_iter()
            .map(|(stream, period)| {
                let task = StreamTask {
                    source: Arc::clone(&source),
                    stream,
                    report_id: report_id.to_string(),
                    generation,
                    period,
                    updates: updates.clone(),
                    stop: Arc::clone(&stop),
                };
                tokio::spawn(task.run())
            })
            .collect();

        tracing::info!(
            report_id = %report_id,
            generation,
            agent_interval_ms = config.agent_interval_ms,
            console_interval_ms = config.console_interval_ms,
            "Polling started"
        );

        Some(Self {
            report_id: report_id.to_string(),
            generation,
            stop,
            tasks,
        })
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop both streams. Future ticks are cancelled; idempotent.
    pub fn stop(&self) {
        if !self.stop.send_replace(true) {
            tracing::info!(
                report_id = %self.report_id,
                generation = self.generation,
                "Polling stopped"
            );
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Whether both stream tasks have exited
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

struct StreamTask {
    source: Arc<dyn LogSource>,
    stream: StreamKind,
    report_id: String,
    generation: u64,
    period: Duration,
    updates: mpsc::UnboundedSender<FeedUpdate>,
    stop: Arc<watch::Sender<bool>>,
}

impl StreamTask {
    async fn run(self) {
        let mut stop_rx = self.stop.subscribe();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cursor = LogCursor::new();

        loop {
            if *stop_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            let (batch, next) = poll(self.source.as_ref(), self.stream, &self.report_id, cursor).await;
            cursor = next;

            if batch.is_empty() {
                continue;
            }

            let completes = batch.completes_report();
            let update = FeedUpdate {
                report_id: self.report_id.clone(),
                generation: self.generation,
                batch,
            };

            if self.updates.send(update).is_err() {
                tracing::debug!(stream = %self.stream, "Update receiver dropped, stopping stream");
                break;
            }

            if completes {
                tracing::info!(
                    report_id = %self.report_id,
                    cursor = cursor.position(),
                    "Report complete, stopping both streams"
                );
                self.stop.send_replace(true);
                break;
            }
        }

        tracing::debug!(
            stream = %self.stream,
            report_id = %self.report_id,
            generation = self.generation,
            "Stream task exited"
        );
    }
}
