//! Audit trail for consent register changes.

use serde_json::Value;

use privkit_core::{AuditEntry, DocumentId};
use privkit_store::DocumentStore;

use crate::error::Result;
use crate::ledger::Ledger;

/// The `auditTrail` ledger.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    ledger: Ledger<AuditEntry>,
}

impl AuditTrail {
    pub fn new(docs: DocumentStore) -> Self {
        Self {
            ledger: Ledger::new(docs, DocumentId::AUDIT_TRAIL),
        }
    }

    /// Append an entry for `action` taken on behalf of `user_id`.
    pub async fn record(&self, action: &str, user_id: &str, details: Value) -> Result<AuditEntry> {
        let entry = AuditEntry::new(action, user_id, details);
        self.ledger.append(entry.clone()).await?;
        tracing::debug!(action, user_id, "audit entry recorded");
        Ok(entry)
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<AuditEntry>> {
        self.ledger.list().await
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &Ledger<AuditEntry> {
        &self.ledger
    }
}
