//! Breach log and notification.
//!
//! The entry is persisted before the notifier runs, so a failed
//! notification never loses the record.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use privkit_core::{require_object, BreachEntry, DocumentId};
use privkit_store::DocumentStore;

use crate::error::Result;
use crate::ledger::Ledger;

/// Delivers breach notices to whoever needs to act on them.
#[async_trait]
pub trait BreachNotifier: Send + Sync {
    async fn notify(&self, entry: &BreachEntry) -> Result<()>;
}

/// Notifier that emits a `warn!` event and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl BreachNotifier for LogNotifier {
    async fn notify(&self, entry: &BreachEntry) -> Result<()> {
        tracing::warn!(
            timestamp = %entry.timestamp,
            details = %entry.details,
            "Data breach detected! Admin notified."
        );
        Ok(())
    }
}

/// Result of [`BreachLog::notify_breach`].
#[derive(Debug, Clone, PartialEq)]
pub struct BreachNotice {
    /// The persisted entry.
    pub entry: BreachEntry,
    /// Whether the notifier succeeded.
    pub delivered: bool,
}

/// The `breachLog` ledger plus its notifier.
#[derive(Clone)]
pub struct BreachLog {
    ledger: Ledger<BreachEntry>,
    notifier: Arc<dyn BreachNotifier>,
}

impl fmt::Debug for BreachLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreachLog")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl BreachLog {
    /// Create a breach log that notifies through [`LogNotifier`].
    pub fn new(docs: DocumentStore) -> Self {
        Self::with_notifier(docs, Arc::new(LogNotifier))
    }

    pub fn with_notifier(docs: DocumentStore, notifier: Arc<dyn BreachNotifier>) -> Self {
        Self {
            ledger: Ledger::new(docs, DocumentId::BREACH_LOG),
            notifier,
        }
    }

    /// Record a breach and notify.
    ///
    /// `details` must be a JSON object. Notifier errors are logged and
    /// reported through [`BreachNotice::delivered`].
    pub async fn notify_breach(&self, details: Value) -> Result<BreachNotice> {
        require_object("details", &details)?;

        let entry = BreachEntry::new(details);
        self.ledger.append(entry.clone()).await?;

        let delivered = match self.notifier.notify(&entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, timestamp = %entry.timestamp, "breach notifier failed");
                false
            }
        };

        Ok(BreachNotice { entry, delivered })
    }

    /// All recorded breaches, oldest first.
    pub async fn entries(&self) -> Result<Vec<BreachEntry>> {
        self.ledger.list().await
    }
}
