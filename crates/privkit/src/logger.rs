//! # Buffered Log Sink
//!
//! Processing activities are buffered in memory and appended to the `logs`
//! ledger in batches.
//!
//! ## Flush triggers
//!
//! - the buffer reaching `buffer_limit` entries
//! - a background ticker firing every `flush_interval`: a tokio task when a
//!   runtime is available, otherwise a dedicated thread
//! - an explicit [`BufferedLogger::flush`] or [`BufferedLogger::shutdown`]
//! - dropping the logger, which flushes with blocking I/O
//!
//! All triggers go through one flush mutex per logger, so a batch is
//! swapped out and written by exactly one flusher at a time. A failed
//! write puts the batch back at the front of the buffer.
//!
//! Entries still buffered when the process dies abruptly are lost.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use privkit_core::{require_identifier, DocumentId, ProcessingLogEntry};
use privkit_store::{DocumentStore, StoreError};

use crate::error::{ComplianceError, Result};
use crate::ledger::Ledger;

/// Buffer sizing and flush cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Flush as soon as this many entries are buffered.
    pub buffer_limit: usize,
    /// Background flush period. Zero disables the ticker.
    pub flush_interval: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            buffer_limit: 10,
            flush_interval: Duration::from_secs(5),
        }
    }
}

/// Predicate for [`BufferedLogger::get_logs_for_audit`].
pub type LogFilter = Box<dyn Fn(&ProcessingLogEntry) -> bool + Send + Sync>;

struct Shared {
    ledger: Ledger<ProcessingLogEntry>,
    buffer: Mutex<Vec<ProcessingLogEntry>>,
    flush_lock: Mutex<()>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> ComplianceError {
    ComplianceError::Store(StoreError::LockPoisoned(e.to_string()))
}

impl Shared {
    fn buffer(&self) -> Result<MutexGuard<'_, Vec<ProcessingLogEntry>>> {
        self.buffer.lock().map_err(poisoned)
    }

    /// Swap the buffer out and append it to the ledger.
    fn flush_blocking(&self) -> Result<usize> {
        let _flushing = self.flush_lock.lock().map_err(poisoned)?;

        let batch = std::mem::take(&mut *self.buffer()?);
        if batch.is_empty() {
            return Ok(0);
        }

        match self.ledger.append_many_blocking(&batch) {
            Ok(total) => {
                tracing::info!(flushed = batch.len(), total, "processing log flushed");
                Ok(batch.len())
            }
            Err(e) => {
                let mut buffer = self.buffer()?;
                let newer = std::mem::replace(&mut *buffer, batch);
                buffer.extend(newer);
                Err(e)
            }
        }
    }
}

/// Buffered writer for the processing log.
pub struct BufferedLogger {
    shared: Arc<Shared>,
    config: LoggerConfig,
    ticker: Mutex<Option<Ticker>>,
}

/// Handle on the background flusher.
enum Ticker {
    Task(JoinHandle<()>),
    /// Dropping the sender wakes and ends the thread.
    Thread(Sender<()>),
}

impl Ticker {
    fn stop(self) {
        match self {
            Ticker::Task(handle) => handle.abort(),
            Ticker::Thread(stop) => drop(stop),
        }
    }
}

impl fmt::Debug for BufferedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedLogger")
            .field("config", &self.config)
            .field("buffered", &self.buffered_len())
            .finish()
    }
}

impl BufferedLogger {
    /// Create a logger over the `logs` document.
    ///
    /// Inside a tokio runtime the interval ticker is a task on that runtime;
    /// outside one it runs on its own thread.
    pub fn new(docs: DocumentStore, config: LoggerConfig) -> Self {
        let shared = Arc::new(Shared {
            ledger: Ledger::new(docs, DocumentId::PROCESSING_LOGS),
            buffer: Mutex::new(Vec::new()),
            flush_lock: Mutex::new(()),
        });
        let ticker = spawn_ticker(Arc::downgrade(&shared), config.flush_interval);

        Self {
            shared,
            config,
            ticker: Mutex::new(ticker),
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Buffer one processing activity, flushing if the buffer is full.
    pub async fn log_data_processing(
        &self,
        activity: &str,
        details: Value,
    ) -> Result<ProcessingLogEntry> {
        require_identifier("activity", activity)?;

        let entry = ProcessingLogEntry::new(activity, details);
        let pending = {
            let mut buffer = self.shared.buffer()?;
            buffer.push(entry.clone());
            buffer.len()
        };
        tracing::debug!(activity, pending, "processing activity buffered");

        if pending >= self.config.buffer_limit {
            self.flush().await?;
        }
        Ok(entry)
    }

    /// Append everything buffered to the ledger. Returns the batch size.
    pub async fn flush(&self) -> Result<usize> {
        let shared = self.shared.clone();
        tokio::task::spawn_blocking(move || shared.flush_blocking())
            .await
            .map_err(|e| ComplianceError::Task(e.to_string()))?
    }

    /// [`flush`](Self::flush) on the calling thread with blocking I/O.
    pub fn flush_sync(&self) -> Result<usize> {
        self.shared.flush_blocking()
    }

    /// Entries not yet persisted.
    pub fn buffered_len(&self) -> usize {
        self.shared.buffer().map(|b| b.len()).unwrap_or(0)
    }

    /// Persisted entries, optionally filtered. Buffered entries are not
    /// included.
    pub async fn get_logs_for_audit(
        &self,
        filter: Option<LogFilter>,
    ) -> Result<Vec<ProcessingLogEntry>> {
        match filter {
            Some(keep) => self.shared.ledger.list_filtered(keep).await,
            None => self.shared.ledger.list().await,
        }
    }

    pub async fn get_log_by_index(&self, index: usize) -> Result<Option<ProcessingLogEntry>> {
        self.shared.ledger.get(index).await
    }

    pub async fn delete_log_by_index(&self, index: usize) -> Result<bool> {
        self.shared.ledger.delete(index).await
    }

    /// Empty the persisted ledger. Buffered entries are kept.
    pub async fn clear_logs(&self) -> Result<()> {
        self.shared.ledger.clear().await
    }

    /// Stop the ticker and flush.
    pub async fn shutdown(&self) -> Result<usize> {
        self.stop_ticker();
        self.flush().await
    }

    fn stop_ticker(&self) {
        let ticker = match self.ticker.lock() {
            Ok(mut ticker) => ticker.take(),
            Err(e) => e.into_inner().take(),
        };
        if let Some(ticker) = ticker {
            ticker.stop();
        }
    }
}

impl Drop for BufferedLogger {
    fn drop(&mut self) {
        self.stop_ticker();
        if let Err(e) = self.shared.flush_blocking() {
            tracing::warn!(error = %e, "final processing log flush failed");
        }
    }
}

fn spawn_ticker(shared: Weak<Shared>, period: Duration) -> Option<Ticker> {
    if period.is_zero() {
        return None;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => Some(Ticker::Task(spawn_task_ticker(&runtime, shared, period))),
        Err(_) => match spawn_thread_ticker(shared, period) {
            Ok(stop) => Some(Ticker::Thread(stop)),
            Err(e) => {
                tracing::warn!(error = %e, "could not start flush thread, interval flush disabled");
                None
            }
        },
    }
}

fn spawn_thread_ticker(shared: Weak<Shared>, period: Duration) -> std::io::Result<Sender<()>> {
    let (stop, stopped) = mpsc::channel::<()>();
    thread::Builder::new()
        .name("privkit-log-flush".into())
        .spawn(move || loop {
            match stopped.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            let Some(shared) = shared.upgrade() else {
                break;
            };
            if let Err(e) = shared.flush_blocking() {
                tracing::warn!(error = %e, "interval flush failed");
            }
        })?;
    tracing::debug!(?period, "no tokio runtime, interval flush runs on a thread");
    Ok(stop)
}

fn spawn_task_ticker(
    runtime: &tokio::runtime::Handle,
    shared: Weak<Shared>,
    period: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                break;
            };
            match tokio::task::spawn_blocking(move || shared.flush_blocking()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "interval flush failed"),
                Err(e) => tracing::warn!(error = %e, "interval flush task failed"),
            }
        }
    })
}
