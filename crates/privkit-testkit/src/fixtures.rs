//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use privkit::{BackendKind, LoggerConfig, LoggerSettings, ReadPolicy, Toolkit, ToolkitConfig};
use privkit_core::{EncryptionKey, SymmetricCodec};
use privkit_store::{DocumentStore, MemoryStore};

/// Secret every fixture encrypts under.
pub const FIXTURE_SECRET: &str = "privkit-fixture-secret";

/// A toolkit plus whatever keeps its storage alive.
///
/// On-disk fixtures own their temporary directory; it is removed when the
/// fixture is dropped, after the toolkit has flushed.
pub struct TestFixture {
    toolkit: Toolkit,
    config: ToolkitConfig,
    dir: Option<TempDir>,
}

impl TestFixture {
    /// In-memory toolkit with the interval flush disabled.
    pub fn new() -> Self {
        let config = Self::config_for(BackendKind::Memory, Path::new("."), ReadPolicy::Lenient);
        let docs = DocumentStore::new(
            Arc::new(MemoryStore::new()),
            SymmetricCodec::new(Self::key()),
        );
        Self {
            toolkit: Toolkit::with_store(docs, config.logger_config()),
            config,
            dir: None,
        }
    }

    /// Toolkit over `backend` in a fresh temporary directory.
    pub fn on_disk(backend: BackendKind) -> Self {
        Self::on_disk_with_policy(backend, ReadPolicy::Lenient)
    }

    pub fn on_disk_with_policy(backend: BackendKind, read_policy: ReadPolicy) -> Self {
        let dir = tempfile::tempdir().expect("create fixture directory");
        let config = Self::config_for(backend, dir.path(), read_policy);
        let toolkit = Toolkit::open(&config).expect("open fixture toolkit");
        Self {
            toolkit,
            config,
            dir: Some(dir),
        }
    }

    /// One fixture per backend.
    pub fn every_backend() -> Vec<Self> {
        vec![
            Self::new(),
            Self::on_disk(BackendKind::File),
            Self::on_disk(BackendKind::Sqlite),
        ]
    }

    /// The key derived from [`FIXTURE_SECRET`].
    pub fn key() -> EncryptionKey {
        EncryptionKey::from_secret(FIXTURE_SECRET)
    }

    pub fn toolkit(&self) -> &Toolkit {
        &self.toolkit
    }

    pub fn toolkit_mut(&mut self) -> &mut Toolkit {
        &mut self.toolkit
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// Data directory of an on-disk fixture.
    pub fn data_dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Open a second toolkit over the same storage.
    ///
    /// Only meaningful for on-disk fixtures; an in-memory fixture has no
    /// storage to share and gets an empty toolkit.
    pub fn reopen(&self) -> Toolkit {
        match self.config.backend {
            BackendKind::Memory => Toolkit::in_memory(Self::key()),
            _ => Toolkit::open(&self.config).expect("reopen fixture toolkit"),
        }
    }

    fn config_for(backend: BackendKind, data_dir: &Path, read_policy: ReadPolicy) -> ToolkitConfig {
        ToolkitConfig {
            encryption_key: Some(FIXTURE_SECRET.into()),
            data_dir: data_dir.to_path_buf(),
            backend,
            read_policy,
            logger: LoggerSettings {
                buffer_limit: LoggerConfig::default().buffer_limit,
                flush_interval_ms: 0,
            },
            ..ToolkitConfig::default()
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privkit::StoreOptions;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_fixture() {
        let fixture = TestFixture::new();
        assert!(fixture.data_dir().is_none());

        fixture
            .toolkit()
            .consent()
            .store_consent("u", [("marketing".to_string(), true)].into(), &StoreOptions::default())
            .await
            .unwrap();
        assert!(fixture
            .toolkit()
            .consent()
            .get_consent_status("u", "marketing")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_reopen_sees_same_documents() {
        let fixture = TestFixture::on_disk(BackendKind::File);
        fixture
            .toolkit()
            .dsar()
            .upsert_user("u", &json!({"name": "Ada"}))
            .await
            .unwrap();

        let again = fixture.reopen();
        assert!(again.dsar().get_user("u").await.unwrap().is_some());
    }

    #[test]
    fn test_every_backend_is_distinct() {
        let fixtures = TestFixture::every_backend();
        let kinds: Vec<_> = fixtures
            .iter()
            .map(|f| f.toolkit().documents().backend().kind())
            .collect();
        assert_eq!(kinds.len(), 3);
        assert_ne!(kinds[0], kinds[1]);
        assert_ne!(kinds[1], kinds[2]);
    }
}
