//! Ledger entry types.
//!
//! Entries are immutable once appended. Field names on the wire keep the
//! camelCase form used by existing data files (`userId`, `actionType`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Timestamp;

/// An element of an append-only ledger.
pub trait LedgerEntry: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// When the entry was created.
    fn timestamp(&self) -> &Timestamp;
}

/// A consent register change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: Timestamp,
    pub action: String,
    pub user_id: String,
    #[serde(default)]
    pub details: Value,
}

impl AuditEntry {
    /// Create an entry stamped with the current time.
    pub fn new(action: impl Into<String>, user_id: impl Into<String>, details: Value) -> Self {
        Self {
            timestamp: Timestamp::now(),
            action: action.into(),
            user_id: user_id.into(),
            details,
        }
    }
}

impl LedgerEntry for AuditEntry {
    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}

/// A reported data breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachEntry {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub details: Value,
}

impl BreachEntry {
    /// Create an entry stamped with the current time.
    pub fn new(details: Value) -> Self {
        Self {
            timestamp: Timestamp::now(),
            details,
        }
    }
}

impl LedgerEntry for BreachEntry {
    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}

/// A data subject access request action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsarLogEntry {
    pub user_id: String,
    pub action_type: String,
    pub timestamp: Timestamp,
}

impl DsarLogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(user_id: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            action_type: action_type.into(),
            timestamp: Timestamp::now(),
        }
    }
}

impl LedgerEntry for DsarLogEntry {
    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}

/// A data processing activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub activity: String,
    #[serde(default)]
    pub details: Value,
    pub timestamp: Timestamp,
}

impl ProcessingLogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(activity: impl Into<String>, details: Value) -> Self {
        Self {
            activity: activity.into(),
            details,
            timestamp: Timestamp::now(),
        }
    }
}

impl LedgerEntry for ProcessingLogEntry {
    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}
