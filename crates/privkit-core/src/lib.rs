//! # privkit Core
//!
//! Pure primitives for privkit: the symmetric envelope codec, document
//! identifiers, ledger entry types, and argument validation.
//!
//! This crate contains no I/O and no storage. Everything here is
//! computation over in-memory values.
//!
//! ## Key Types
//!
//! - [`SymmetricCodec`] - AES-256-CBC encryption into an [`Envelope`]
//! - [`EncryptionKey`] - 32-byte key derived from a configured secret
//! - [`DocumentId`] - Name of one persisted JSON document
//! - [`Revision`] - Content hash of a stored envelope (Blake3)
//! - [`AuditEntry`], [`BreachEntry`], [`DsarLogEntry`], [`ProcessingLogEntry`] - Ledger entries
//!
//! ## Envelope Format
//!
//! Every persisted document is stored as `hex(iv):hex(ciphertext)`, with a
//! fresh 16-byte IV for every write. See [`crypto`] module.

pub mod crypto;
pub mod entry;
pub mod error;
pub mod types;
pub mod validation;

pub use crypto::{EncryptionKey, Envelope, SymmetricCodec, IV_LEN, KEY_LEN};
pub use entry::{AuditEntry, BreachEntry, DsarLogEntry, LedgerEntry, ProcessingLogEntry};
pub use error::{CoreError, ValidationError};
pub use types::{
    ConsentPreferences, ConsentRecords, DocumentId, Revision, Timestamp, UserFields, UserRecords,
};
pub use validation::{preferences_from_value, require_identifier, require_object};
