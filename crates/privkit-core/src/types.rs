//! Strong type definitions for privkit.
//!
//! Document names, revisions and timestamps are newtypes so they cannot be
//! mixed up with arbitrary strings.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Purpose → granted map for a single user.
pub type ConsentPreferences = BTreeMap<String, bool>;

/// The consent document: user id → preferences.
pub type ConsentRecords = BTreeMap<String, ConsentPreferences>;

/// Free-form personal data held for one data subject.
pub type UserFields = serde_json::Map<String, serde_json::Value>;

/// The DSAR user document: user id → fields.
pub type UserRecords = BTreeMap<String, UserFields>;

/// Name of one persisted document.
///
/// Each document is owned by exactly one subsystem. The well-known names are
/// associated constants; [`DocumentId::custom`] admits additional names made
/// of ASCII letters, digits, `_` and `-`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Cow<'static, str>);

impl DocumentId {
    /// Per-user consent preferences.
    pub const CONSENTS: Self = Self(Cow::Borrowed("consents"));
    /// DSAR user records.
    pub const DSAR_USERS: Self = Self(Cow::Borrowed("dsar_users"));
    /// DSAR action log.
    pub const DSAR_LOGS: Self = Self(Cow::Borrowed("dsar_logs"));
    /// Data processing log.
    pub const PROCESSING_LOGS: Self = Self(Cow::Borrowed("logs"));
    /// Consent audit trail.
    pub const AUDIT_TRAIL: Self = Self(Cow::Borrowed("auditTrail"));
    /// Breach log.
    pub const BREACH_LOG: Self = Self(Cow::Borrowed("breachLog"));

    /// Create a document id with a caller-chosen name.
    pub fn custom(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::InvalidDocumentName(name));
        }
        Ok(Self(Cow::Owned(name)))
    }

    /// The document name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blake3 hash of a stored envelope.
///
/// Used as a compare-and-swap token: a writer that read revision `r` only
/// succeeds if the stored envelope still hashes to `r`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision(pub [u8; 32]);

impl Revision {
    /// Compute the revision of an envelope's textual form.
    pub fn of(envelope: &str) -> Self {
        Self(*blake3::hash(envelope.as_bytes()).as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// UTC instant rendered as ISO-8601 with millisecond precision
/// (`2024-05-01T12:00:00.000Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Wrap an existing instant, truncated to milliseconds so that a
    /// persisted timestamp reads back equal.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(3))
    }

    /// The wrapped instant.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}
