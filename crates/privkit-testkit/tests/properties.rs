//! Storage and ledger properties over generated data.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use privkit::{Ledger, StoreOptions, Withdrawal};
use privkit_core::{DocumentId, DsarLogEntry, SymmetricCodec, UserRecords};
use privkit_store::{DocumentStore, MemoryStore};
use privkit_testkit::generators::{identifier, preferences, purpose, user_records};
use privkit_testkit::TestFixture;

fn docs() -> DocumentStore {
    DocumentStore::new(
        Arc::new(MemoryStore::new()),
        SymmetricCodec::new(TestFixture::key()),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_documents_read_back(records in user_records()) {
        let docs = docs();
        docs.write_blocking(&DocumentId::DSAR_USERS, &records).unwrap();

        let read: UserRecords = docs.read_blocking(&DocumentId::DSAR_USERS, UserRecords::new()).unwrap();
        prop_assert_eq!(read, records);
    }

    #[test]
    fn missing_document_reads_default_without_creating_it(fallback in user_records()) {
        let docs = docs();
        let first: UserRecords = docs.read_blocking(&DocumentId::DSAR_USERS, fallback.clone()).unwrap();
        let second: UserRecords = docs.read_blocking(&DocumentId::DSAR_USERS, fallback.clone()).unwrap();

        prop_assert_eq!(&first, &fallback);
        prop_assert_eq!(&second, &fallback);
        prop_assert!(docs.backend().list().unwrap().is_empty());
    }

    #[test]
    fn ledger_keeps_append_order(users in prop::collection::vec(identifier(), 1..20)) {
        let rt = runtime();
        let ledger: Ledger<DsarLogEntry> = Ledger::new(docs(), DocumentId::DSAR_LOGS);

        rt.block_on(async {
            for user in &users {
                ledger.append(DsarLogEntry::new(user, "access")).await.unwrap();
            }
            let listed = ledger.list().await.unwrap();
            let order: Vec<_> = listed.iter().map(|e| e.user_id.clone()).collect();
            assert_eq!(order, users);

            let last = users.len() - 1;
            assert_eq!(ledger.get(last).await.unwrap().unwrap().user_id, users[last]);
            assert!(ledger.get(users.len()).await.unwrap().is_none());
        });
    }

    #[test]
    fn full_withdrawal_revokes_everything(
        user in identifier(),
        prefs in preferences(),
        other_purpose in purpose(),
    ) {
        let rt = runtime();
        let fixture = TestFixture::new();
        let consent = fixture.toolkit().consent();

        rt.block_on(async {
            consent.store_consent(&user, prefs.clone(), &StoreOptions::default()).await.unwrap();
            for (purpose, granted) in &prefs {
                assert_eq!(consent.get_consent_status(&user, purpose).await.unwrap(), *granted);
            }

            consent.withdraw_consent(&user, Withdrawal::All).await.unwrap();
            assert!(!consent.get_consent_status(&user, &other_purpose).await.unwrap());
            for purpose in prefs.keys() {
                assert!(!consent.get_consent_status(&user, purpose).await.unwrap());
            }
        });
    }

    #[test]
    fn correction_is_a_shallow_merge(
        user in identifier(),
        first in privkit_testkit::user_fields(),
        second in privkit_testkit::user_fields(),
    ) {
        let rt = runtime();
        let fixture = TestFixture::new();
        let dsar = fixture.toolkit().dsar();

        let mut expected = first.clone();
        expected.extend(second.clone());

        rt.block_on(async {
            dsar.request_data_correction(&user, &Value::Object(first)).await.unwrap();
            dsar.request_data_correction(&user, &Value::Object(second)).await.unwrap();

            let record = dsar.get_user(&user).await.unwrap().unwrap_or_default();
            assert_eq!(record, expected);
        });
    }
}
