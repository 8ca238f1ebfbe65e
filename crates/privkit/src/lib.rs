//! # privkit
//!
//! Privacy-compliance toolkit: consent management, data subject access
//! requests, breach and audit ledgers, buffered processing logs and field
//! anonymization, all persisted as encrypted JSON documents.
//!
//! ## Overview
//!
//! Every component works on a small fixed set of named documents through
//! one [`DocumentStore`](store::DocumentStore):
//!
//! - **Consent Register**: per-user purpose → granted maps, with pluggable
//!   storage strategies and an audit entry for every change
//! - **DSAR Manager**: access, correction and deletion requests over user
//!   records, each one logged
//! - **Ledgers**: append-only audit trail, breach log, DSAR log and
//!   processing log
//! - **Buffered Logger**: batches processing-log writes, flushing on
//!   capacity, on a timer and on drop
//! - **Anonymizer**: masking, hashing and pseudonymization of record fields
//!
//! ## Usage
//!
//! ```rust,no_run
//! use privkit::{StoreOptions, Toolkit, ToolkitConfig, Withdrawal};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = ToolkitConfig::from_env()?;
//!     let toolkit = Toolkit::open(&config)?;
//!
//!     let prefs = [("marketing".to_string(), true)].into();
//!     toolkit
//!         .consent()
//!         .store_consent("user-1", prefs, &StoreOptions::default())
//!         .await?;
//!     assert!(toolkit.consent().get_consent_status("user-1", "marketing").await?);
//!
//!     toolkit.consent().withdraw_consent("user-1", Withdrawal::All).await?;
//!     toolkit.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `privkit::core` - Codec, entry types, validation
//! - `privkit::store` - Backends and the document store

pub mod anonymize;
pub mod audit;
pub mod breach;
pub mod config;
pub mod consent;
pub mod dsar;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod registry;
pub mod toolkit;

// Re-export component crates
pub use privkit_core as core;
pub use privkit_store as store;

// Re-export main types for convenience
pub use anonymize::{AnonymizationStrategy, AnonymizeOptions, Anonymizer, FieldRule};
pub use audit::AuditTrail;
pub use breach::{BreachLog, BreachNotice, BreachNotifier, LogNotifier};
pub use config::{BackendKind, LoggerSettings, ToolkitConfig};
pub use consent::{ConsentRegister, ConsentStrategy, StoreOptions, Withdrawal};
pub use dsar::DsarManager;
pub use error::{ComplianceError, ConfigError, Result};
pub use ledger::Ledger;
pub use logger::{BufferedLogger, LogFilter, LoggerConfig};
pub use registry::StrategyRegistry;
pub use toolkit::Toolkit;

// Re-export commonly used core types
pub use privkit_core::{
    AuditEntry, BreachEntry, ConsentPreferences, ConsentRecords, DsarLogEntry, EncryptionKey,
    ProcessingLogEntry, UserFields, UserRecords, ValidationError,
};
pub use privkit_store::ReadPolicy;
