// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget front end for a [`LogSink`].
//!
//! [`BufferedSink::log`] never waits: entries go into a bounded channel and a
//! background task batches them by count or flush interval. Failed writes are
//! reported to the [`OnError`] callback and counted, never retried.
//!
//! # Shutdown
//!
//! [`BufferedSink::close`] cancels the worker, which closes the channel,
//! drains whatever is still queued, flushes it, and finally closes the sink.

use super::{LogSink, OnError, SinkEntry, SinkError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("log queue is full, entry dropped")]
    QueueFull,
    #[error("log sink is closed, entry dropped")]
    Closed,
}

/// Counters describing what happened to entries handed to the sink.
///
/// `queued` is counted before an entry reaches the queue, so a snapshot never
/// shows more `delivered + failed` than `queued`. It may briefly include an
/// entry that is about to be dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub queued: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    // Outcomes are read before `queued`.
    fn snapshot(&self) -> DeliveryStats {
        let delivered = self.delivered.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        let dropped = self.dropped.load(Ordering::Acquire);
        DeliveryStats {
            queued: self.queued.load(Ordering::Acquire),
            delivered,
            dropped,
            failed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

pub struct BufferedSink {
    tx: mpsc::Sender<SinkEntry>,
    sink: Arc<dyn LogSink>,
    counters: Arc<Counters>,
    cancel_token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedSink {
    /// Spawns the flush worker on the current Tokio runtime.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, config: BufferConfig, on_error: OnError) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let cancel_token = CancellationToken::new();

        let worker = Worker {
            rx,
            sink: Arc::clone(&sink),
            on_error,
            counters: Arc::clone(&counters),
            batch_size: config.batch_size.max(1),
            flush_interval: config.flush_interval.max(MIN_FLUSH_INTERVAL),
            cancel_token: cancel_token.clone(),
        };
        let handle = tokio::spawn(worker.spin());

        Self {
            tx,
            sink,
            counters,
            cancel_token,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Queues `entry` without blocking.
    pub fn log(&self, entry: SinkEntry) -> Result<(), DeliveryError> {
        self.counters.queued.fetch_add(1, Ordering::AcqRel);
        let err = match self.tx.try_send(entry) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(_)) => DeliveryError::QueueFull,
            Err(TrySendError::Closed(_)) => DeliveryError::Closed,
        };
        self.counters.queued.fetch_sub(1, Ordering::AcqRel);
        self.counters.dropped.fetch_add(1, Ordering::AcqRel);
        Err(err)
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Drains queued entries, stops the worker and closes the sink.
    /// A second call returns [`SinkError::Closed`].
    pub async fn close(&self) -> Result<(), SinkError> {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Err(SinkError::Closed);
        };

        self.cancel_token.cancel();
        handle
            .await
            .map_err(|e| SinkError::Worker(e.to_string()))?;
        self.sink.close().await
    }
}

struct Worker {
    rx: mpsc::Receiver<SinkEntry>,
    sink: Arc<dyn LogSink>,
    on_error: OnError,
    counters: Arc<Counters>,
    batch_size: usize,
    flush_interval: Duration,
    cancel_token: CancellationToken,
}

impl Worker {
    async fn spin(mut self) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // discard first tick, which is instantaneous

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(entry) => {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    self.flush(&mut batch).await;
                }
                () = self.cancel_token.cancelled() => {
                    debug!("Log sink received shutdown signal, draining remaining entries");
                    // After close() recv yields what is still buffered, then None.
                    self.rx.close();
                    while let Some(entry) = self.rx.recv().await {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    break;
                }
            }
        }

        self.flush(&mut batch).await;
        debug!("Log sink worker stopped");
    }

    async fn flush(&self, batch: &mut Vec<SinkEntry>) {
        if batch.is_empty() {
            return;
        }
        let entries = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        let count = entries.len() as u64;
        match self.sink.write_entries(entries).await {
            Ok(()) => {
                self.counters.delivered.fetch_add(count, Ordering::AcqRel);
            }
            Err(e) => {
                self.counters.failed.fetch_add(count, Ordering::AcqRel);
                (self.on_error)(&e);
            }
        }
    }
}
