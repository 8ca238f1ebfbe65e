//! End-to-end behavior of the toolkit on every backend.

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use privkit::store::FileStore;
use privkit::{
    BackendKind, ComplianceError, ConsentPreferences, LoggerSettings, ReadPolicy, StoreOptions,
    Toolkit, ToolkitConfig, Withdrawal,
};

const SECRET: &str = "integration-secret";

struct Harness {
    toolkit: Toolkit,
    _dir: TempDir,
}

fn open(backend: BackendKind, read_policy: ReadPolicy) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = ToolkitConfig {
        encryption_key: Some(SECRET.into()),
        data_dir: dir.path().to_path_buf(),
        backend,
        read_policy,
        logger: LoggerSettings {
            buffer_limit: 10,
            flush_interval_ms: 0,
        },
        ..ToolkitConfig::default()
    };
    Harness {
        toolkit: Toolkit::open(&config).unwrap(),
        _dir: dir,
    }
}

fn all_backends() -> Vec<Harness> {
    [BackendKind::Memory, BackendKind::File, BackendKind::Sqlite]
        .into_iter()
        .map(|b| open(b, ReadPolicy::Lenient))
        .collect()
}

fn prefs(pairs: &[(&str, bool)]) -> ConsentPreferences {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[tokio::test]
async fn consent_scenario() {
    for h in all_backends() {
        let consent = h.toolkit.consent();
        consent
            .store_consent("u1", prefs(&[("marketing", true)]), &StoreOptions::default())
            .await
            .unwrap();

        assert!(consent.get_consent_status("u1", "marketing").await.unwrap());
        assert!(!consent.get_consent_status("u1", "analytics").await.unwrap());
    }
}

#[tokio::test]
async fn full_withdrawal_revokes_every_purpose() {
    for h in all_backends() {
        let consent = h.toolkit.consent();
        consent
            .store_consent(
                "u",
                prefs(&[("marketing", true), ("analytics", true), ("email", false)]),
                &StoreOptions::default(),
            )
            .await
            .unwrap();

        assert!(consent.withdraw_consent("u", Withdrawal::All).await.unwrap());
        for purpose in ["marketing", "analytics", "email", "sms"] {
            assert!(!consent.get_consent_status("u", purpose).await.unwrap());
        }
    }
}

#[tokio::test]
async fn partial_withdrawal() {
    for h in all_backends() {
        let consent = h.toolkit.consent();
        consent
            .store_consent(
                "u",
                prefs(&[("marketing", true), ("analytics", true)]),
                &StoreOptions::default(),
            )
            .await
            .unwrap();

        consent.withdraw_consent("u", "marketing".into()).await.unwrap();
        assert!(!consent.get_consent_status("u", "marketing").await.unwrap());
        assert!(consent.get_consent_status("u", "analytics").await.unwrap());

        consent.withdraw_consent("u", "analytics".into()).await.unwrap();
        assert!(!consent.all_consents().await.unwrap().contains_key("u"));
    }
}

#[tokio::test]
async fn dsar_correction_merges() {
    for h in all_backends() {
        let dsar = h.toolkit.dsar();
        dsar.request_data_correction("u", &json!({"a": 1})).await.unwrap();
        dsar.request_data_correction("u", &json!({"b": 2})).await.unwrap();

        let record = dsar.request_data_access("u").await.unwrap().unwrap();
        assert_eq!(Value::Object(record), json!({"a": 1, "b": 2}));
    }
}

#[tokio::test]
async fn dsar_deletion_of_ghost_is_harmless() {
    for h in all_backends() {
        let dsar = h.toolkit.dsar();
        dsar.upsert_user("alice", &json!({"name": "Alice"})).await.unwrap();
        let before = dsar.all_users().await.unwrap();

        assert!(dsar.request_data_deletion("ghost").await.unwrap());
        assert_eq!(dsar.all_users().await.unwrap(), before);
    }
}

#[tokio::test]
async fn ledger_index_semantics() {
    for h in all_backends() {
        let dsar = h.toolkit.dsar();
        dsar.log_dsar_action("first", "access").await.unwrap();
        dsar.log_dsar_action("second", "access").await.unwrap();

        assert_eq!(dsar.get_log_by_index(0).await.unwrap().unwrap().user_id, "first");
        assert!(dsar.get_log_by_index(2).await.unwrap().is_none());
        assert!(!dsar.delete_log_by_index(2).await.unwrap());

        assert!(dsar.delete_log_by_index(0).await.unwrap());
        assert_eq!(dsar.logs().await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn buffered_logger_flushes_at_capacity() {
    for h in all_backends() {
        let logger = h.toolkit.logger();
        let limit = logger.config().buffer_limit;
        for i in 0..limit {
            logger
                .log_data_processing(&format!("activity-{i}"), json!({"i": i}))
                .await
                .unwrap();
        }

        let persisted = logger.get_logs_for_audit(None).await.unwrap();
        assert_eq!(persisted.len(), limit);
        assert_eq!(persisted[0].activity, "activity-0");
    }
}

#[tokio::test]
async fn missing_documents_read_as_defaults() {
    for h in all_backends() {
        assert!(h.toolkit.consent().all_consents().await.unwrap().is_empty());
        assert!(h.toolkit.dsar().all_users().await.unwrap().is_empty());
        assert!(h.toolkit.audit().entries().await.unwrap().is_empty());
        assert!(h.toolkit.breach().entries().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn file_backend_is_encrypted_at_rest_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = ToolkitConfig {
        encryption_key: Some(SECRET.into()),
        data_dir: dir.path().to_path_buf(),
        backend: BackendKind::File,
        ..ToolkitConfig::default()
    };

    {
        let toolkit = Toolkit::open(&config).unwrap();
        toolkit
            .consent()
            .store_consent("patient-7", prefs(&[("research", true)]), &StoreOptions::default())
            .await
            .unwrap();
        toolkit
            .logger()
            .log_data_processing("intake", json!({"patient": "patient-7"}))
            .await
            .unwrap();
        // Dropping the toolkit flushes the buffered entry.
    }

    let raw = std::fs::read_to_string(dir.path().join("consents.json")).unwrap();
    assert!(!raw.contains("patient-7"));
    let (iv, ct) = raw.split_once(':').unwrap();
    assert_eq!(iv.len(), 32);
    assert!(ct.chars().all(|c| c.is_ascii_hexdigit()));

    let toolkit = Toolkit::open(&config).unwrap();
    assert!(toolkit
        .consent()
        .get_consent_status("patient-7", "research")
        .await
        .unwrap());
    assert_eq!(
        toolkit.logger().get_logs_for_audit(None).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn unreadable_document_is_absent_or_fails_strictly() {
    let dir = tempfile::tempdir().unwrap();
    let config = |policy: ReadPolicy| ToolkitConfig {
        encryption_key: Some(SECRET.into()),
        data_dir: dir.path().to_path_buf(),
        backend: BackendKind::File,
        read_policy: policy,
        ..ToolkitConfig::default()
    };

    let writer = Toolkit::open(&config(ReadPolicy::Lenient)).unwrap();
    writer
        .dsar()
        .upsert_user("u", &json!({"email": "u@example.com"}))
        .await
        .unwrap();

    // Replace the document with text that is not an envelope at all.
    let files = FileStore::open(dir.path()).unwrap();
    std::fs::write(files.path_of(&privkit::core::DocumentId::DSAR_USERS), "garbage").unwrap();

    let lenient = Toolkit::open(&config(ReadPolicy::Lenient)).unwrap();
    assert!(lenient.dsar().all_users().await.unwrap().is_empty());

    let strict = Toolkit::open(&config(ReadPolicy::Strict)).unwrap();
    let err = strict.dsar().all_users().await.unwrap_err();
    assert!(matches!(err, ComplianceError::Store(_)));
}

#[tokio::test]
async fn concurrent_writers_do_not_lose_updates() {
    for h in all_backends() {
        let toolkit = std::sync::Arc::new(h.toolkit);
        let mut handles = Vec::new();
        for i in 0..16 {
            let toolkit = toolkit.clone();
            handles.push(tokio::spawn(async move {
                let mut fields = serde_json::Map::new();
                fields.insert(format!("field{i}"), json!(i));
                toolkit
                    .dsar()
                    .upsert_user("shared", &Value::Object(fields))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = toolkit.dsar().get_user("shared").await.unwrap().unwrap();
        assert_eq!(record.len(), 16);
    }
}

#[tokio::test]
async fn breach_is_persisted_before_notification() {
    for h in all_backends() {
        let notice = h
            .toolkit
            .breach()
            .notify_breach(json!({"system": "payroll"}))
            .await
            .unwrap();
        assert!(notice.delivered);
        assert_eq!(h.toolkit.breach().entries().await.unwrap(), vec![notice.entry]);
    }
}

#[tokio::test]
async fn interval_flush_runs_in_background() {
    let dir = tempfile::tempdir().unwrap();
    let config = ToolkitConfig {
        encryption_key: Some(SECRET.into()),
        data_dir: dir.path().to_path_buf(),
        backend: BackendKind::Sqlite,
        logger: LoggerSettings {
            buffer_limit: 1000,
            flush_interval_ms: 50,
        },
        ..ToolkitConfig::default()
    };
    let toolkit = Toolkit::open(&config).unwrap();
    toolkit
        .logger()
        .log_data_processing("background", Value::Null)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(toolkit.logger().buffered_len(), 0);
    assert_eq!(toolkit.documents().backend().list().unwrap().len(), 1);
}
