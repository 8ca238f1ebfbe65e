//! The Toolkit: every component wired over one document store.

use std::sync::Arc;

use privkit_core::{EncryptionKey, SymmetricCodec};
use privkit_store::{BlobStore, DocumentStore, FileStore, MemoryStore, SqliteStore, StoreError};

use crate::anonymize::Anonymizer;
use crate::audit::AuditTrail;
use crate::breach::{BreachLog, BreachNotifier};
use crate::config::{BackendKind, ToolkitConfig};
use crate::consent::ConsentRegister;
use crate::dsar::DsarManager;
use crate::error::Result;
use crate::logger::{BufferedLogger, LoggerConfig};

/// Database file used by the SQLite backend, relative to `data_dir`.
pub const SQLITE_FILE: &str = "privkit.db";

/// The main entry point.
///
/// Owns one [`DocumentStore`] and the components built on it:
/// - [`ConsentRegister`] and its [`AuditTrail`]
/// - [`DsarManager`]
/// - [`BreachLog`]
/// - [`BufferedLogger`]
/// - [`Anonymizer`]
///
/// Dropping the toolkit flushes the logger.
#[derive(Debug)]
pub struct Toolkit {
    docs: DocumentStore,
    consent: ConsentRegister,
    dsar: DsarManager,
    audit: AuditTrail,
    breach: BreachLog,
    logger: BufferedLogger,
    anonymizer: Anonymizer,
}

impl Toolkit {
    /// Open the configured backend.
    ///
    /// The logger's interval flush runs on the current tokio runtime if
    /// there is one, otherwise on a background thread.
    pub fn open(config: &ToolkitConfig) -> Result<Self> {
        let key = config.key()?;

        let backend: Arc<dyn BlobStore> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
            BackendKind::File => Arc::new(FileStore::open(&config.data_dir)?),
            BackendKind::Sqlite => {
                std::fs::create_dir_all(&config.data_dir).map_err(StoreError::Io)?;
                Arc::new(SqliteStore::open(config.data_dir.join(SQLITE_FILE))?)
            }
        };
        tracing::info!(
            app = %config.app_name,
            backend = backend.kind(),
            data_dir = %config.data_dir.display(),
            read_policy = ?config.read_policy,
            "toolkit opened"
        );

        let docs = DocumentStore::with_policy(backend, SymmetricCodec::new(key), config.read_policy);
        Ok(Self::with_store(docs, config.logger_config()))
    }

    /// A toolkit over fresh in-memory storage.
    pub fn in_memory(key: EncryptionKey) -> Self {
        let docs = DocumentStore::new(Arc::new(MemoryStore::new()), SymmetricCodec::new(key));
        Self::with_store(docs, LoggerConfig::default())
    }

    /// Wire every component over an existing store.
    pub fn with_store(docs: DocumentStore, logger: LoggerConfig) -> Self {
        let audit = AuditTrail::new(docs.clone());
        Self {
            consent: ConsentRegister::new(docs.clone(), audit.clone()),
            dsar: DsarManager::new(docs.clone()),
            breach: BreachLog::new(docs.clone()),
            logger: BufferedLogger::new(docs.clone(), logger),
            anonymizer: Anonymizer::default(),
            audit,
            docs,
        }
    }

    /// Replace the breach notifier.
    pub fn with_breach_notifier(mut self, notifier: Arc<dyn BreachNotifier>) -> Self {
        self.breach = BreachLog::with_notifier(self.docs.clone(), notifier);
        self
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.docs
    }

    pub fn consent(&self) -> &ConsentRegister {
        &self.consent
    }

    pub fn dsar(&self) -> &DsarManager {
        &self.dsar
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn breach(&self) -> &BreachLog {
        &self.breach
    }

    pub fn logger(&self) -> &BufferedLogger {
        &self.logger
    }

    pub fn anonymizer(&self) -> &Anonymizer {
        &self.anonymizer
    }

    pub fn anonymizer_mut(&mut self) -> &mut Anonymizer {
        &mut self.anonymizer
    }

    /// Stop the logger's ticker and flush it.
    pub async fn shutdown(&self) -> Result<()> {
        let flushed = self.logger.shutdown().await?;
        tracing::info!(flushed, "toolkit shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::consent::StoreOptions;
    use crate::error::{ComplianceError, ConfigError};

    #[test]
    fn test_open_requires_key() {
        let config = ToolkitConfig {
            backend: BackendKind::Memory,
            ..ToolkitConfig::default()
        };
        let err = Toolkit::open(&config).unwrap_err();
        assert!(matches!(
            err,
            ComplianceError::Config(ConfigError::MissingEncryptionKey)
        ));
    }

    #[tokio::test]
    async fn test_components_share_one_store() {
        let toolkit = Toolkit::in_memory(EncryptionKey::from_secret("toolkit"));
        toolkit
            .consent()
            .store_consent(
                "u1",
                [("marketing".to_string(), true)].into(),
                &StoreOptions::default(),
            )
            .await
            .unwrap();

        // The register's audit entries are visible through the toolkit's trail.
        assert_eq!(toolkit.audit().entries().await.unwrap().len(), 1);

        toolkit.breach().notify_breach(json!({})).await.unwrap();
        let mut names = toolkit.documents().backend().list().unwrap();
        names.sort();
        assert_eq!(
            names.iter().map(|n| n.as_str()).collect::<Vec<_>>(),
            vec!["auditTrail", "breachLog", "consents"]
        );
    }

    #[tokio::test]
    async fn test_open_sqlite_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolkitConfig {
            encryption_key: Some("sqlite-secret".into()),
            data_dir: dir.path().join("nested"),
            backend: BackendKind::Sqlite,
            ..ToolkitConfig::default()
        };

        let toolkit = Toolkit::open(&config).unwrap();
        toolkit.dsar().log_dsar_action("u", "access").await.unwrap();
        assert!(dir.path().join("nested").join(SQLITE_FILE).exists());
    }
}
