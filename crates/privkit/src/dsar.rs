//! Data subject access requests.
//!
//! User records live in the `dsar_users` document as free-form field maps.
//! Every request is recorded in the `dsar_logs` ledger.

use serde_json::Value;

use privkit_core::{
    require_identifier, require_object, DocumentId, DsarLogEntry, UserFields, UserRecords,
};
use privkit_store::{Change, DocumentStore};

use crate::error::Result;
use crate::ledger::Ledger;

/// Handles access, correction and deletion requests.
#[derive(Debug, Clone)]
pub struct DsarManager {
    docs: DocumentStore,
    log: Ledger<DsarLogEntry>,
}

impl DsarManager {
    pub fn new(docs: DocumentStore) -> Self {
        Self {
            log: Ledger::new(docs.clone(), DocumentId::DSAR_LOGS),
            docs,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Return the data held about `user_id`.
    ///
    /// The request is logged before the lookup, so it is recorded even for
    /// unknown users.
    pub async fn request_data_access(&self, user_id: &str) -> Result<Option<UserFields>> {
        require_identifier("userId", user_id)?;
        self.log_dsar_action(user_id, "access").await?;
        self.get_user(user_id).await
    }

    /// Merge `fields` into the user's record. Returns the merged record.
    pub async fn request_data_correction(&self, user_id: &str, fields: &Value) -> Result<UserFields> {
        let merged = self.upsert_user(user_id, fields).await?;
        self.log_dsar_action(user_id, "correction").await?;
        Ok(merged)
    }

    /// Erase the user's record.
    ///
    /// Always succeeds for a valid identifier, whether or not a record
    /// existed.
    pub async fn request_data_deletion(&self, user_id: &str) -> Result<bool> {
        require_identifier("userId", user_id)?;

        let user = user_id.to_string();
        self.docs
            .update(&DocumentId::DSAR_USERS, UserRecords::new(), move |users| {
                users.remove(&user);
                Change::Commit(())
            })
            .await?;

        self.log_dsar_action(user_id, "deletion").await?;
        Ok(true)
    }

    /// Append an entry to the DSAR log.
    pub async fn log_dsar_action(&self, user_id: &str, action_type: &str) -> Result<DsarLogEntry> {
        require_identifier("userId", user_id)?;
        require_identifier("actionType", action_type)?;

        let entry = DsarLogEntry::new(user_id, action_type);
        self.log.append(entry.clone()).await?;
        tracing::info!(user_id, action_type, timestamp = %entry.timestamp, "DSAR action logged");
        Ok(entry)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User records
    // ─────────────────────────────────────────────────────────────────────────

    /// Create or shallow-merge a user record without logging a request.
    pub async fn upsert_user(&self, user_id: &str, fields: &Value) -> Result<UserFields> {
        require_identifier("userId", user_id)?;
        let fields = require_object("fields", fields)?.clone();

        let user = user_id.to_string();
        let merged = self
            .docs
            .update(&DocumentId::DSAR_USERS, UserRecords::new(), move |users| {
                let record = users.entry(user).or_default();
                record.extend(fields);
                Change::Commit(record.clone())
            })
            .await?;
        Ok(merged)
    }

    /// Every user record.
    pub async fn all_users(&self) -> Result<UserRecords> {
        Ok(self
            .docs
            .read(&DocumentId::DSAR_USERS, UserRecords::new())
            .await?)
    }

    /// One user record.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserFields>> {
        require_identifier("userId", user_id)?;
        let mut users = self.all_users().await?;
        Ok(users.remove(user_id))
    }

    /// Remove a user record. Returns true if one existed.
    pub async fn delete_user(&self, user_id: &str) -> Result<bool> {
        require_identifier("userId", user_id)?;

        let user = user_id.to_string();
        let existed = self
            .docs
            .update(&DocumentId::DSAR_USERS, UserRecords::new(), move |users| {
                match users.remove(&user) {
                    Some(_) => Change::Commit(true),
                    None => Change::Discard(false),
                }
            })
            .await?;
        Ok(existed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request log
    // ─────────────────────────────────────────────────────────────────────────

    /// Every logged request, oldest first.
    pub async fn logs(&self) -> Result<Vec<DsarLogEntry>> {
        self.log.list().await
    }

    pub async fn get_log_by_index(&self, index: usize) -> Result<Option<DsarLogEntry>> {
        self.log.get(index).await
    }

    pub async fn delete_log_by_index(&self, index: usize) -> Result<bool> {
        self.log.delete(index).await
    }

    pub async fn clear_logs(&self) -> Result<()> {
        self.log.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use privkit_core::{EncryptionKey, SymmetricCodec, ValidationError};
    use privkit_store::MemoryStore;
    use serde_json::json;

    use crate::error::ComplianceError;

    fn manager() -> DsarManager {
        DsarManager::new(DocumentStore::new(
            Arc::new(MemoryStore::new()),
            SymmetricCodec::new(EncryptionKey::from_secret("dsar-tests")),
        ))
    }

    fn action_types(logs: &[DsarLogEntry]) -> Vec<&str> {
        logs.iter().map(|e| e.action_type.as_str()).collect()
    }

    #[tokio::test]
    async fn test_correction_merges() {
        let dsar = manager();
        dsar.request_data_correction("u", &json!({"a": 1})).await.unwrap();
        let merged = dsar.request_data_correction("u", &json!({"b": 2})).await.unwrap();

        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 2}));
        assert_eq!(
            Value::Object(dsar.get_user("u").await.unwrap().unwrap()),
            json!({"a": 1, "b": 2})
        );
    }

    #[tokio::test]
    async fn test_correction_overwrites_same_field() {
        let dsar = manager();
        dsar.upsert_user("u", &json!({"email": "old@example.com", "age": 30}))
            .await
            .unwrap();
        let merged = dsar
            .request_data_correction("u", &json!({"email": "new@example.com"}))
            .await
            .unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({"email": "new@example.com", "age": 30})
        );
    }

    #[tokio::test]
    async fn test_access_logs_first() {
        let dsar = manager();
        assert!(dsar.request_data_access("nobody").await.unwrap().is_none());

        let logs = dsar.logs().await.unwrap();
        assert_eq!(action_types(&logs), vec!["access"]);
        assert_eq!(logs[0].user_id, "nobody");
    }

    #[tokio::test]
    async fn test_deletion_of_unknown_user() {
        let dsar = manager();
        dsar.upsert_user("alice", &json!({"name": "Alice"})).await.unwrap();

        assert!(dsar.request_data_deletion("ghost").await.unwrap());
        let users = dsar.all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users.contains_key("alice"));

        assert_eq!(action_types(&dsar.logs().await.unwrap()), vec!["deletion"]);
    }

    #[tokio::test]
    async fn test_deletion_removes_record() {
        let dsar = manager();
        dsar.request_data_correction("u", &json!({"a": 1})).await.unwrap();
        assert!(dsar.request_data_deletion("u").await.unwrap());
        assert!(dsar.get_user("u").await.unwrap().is_none());
        assert_eq!(
            action_types(&dsar.logs().await.unwrap()),
            vec!["correction", "deletion"]
        );
    }

    #[tokio::test]
    async fn test_delete_user() {
        let dsar = manager();
        dsar.upsert_user("u", &json!({"a": 1})).await.unwrap();
        assert!(dsar.delete_user("u").await.unwrap());
        assert!(!dsar.delete_user("u").await.unwrap());
        assert!(dsar.logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fields_must_be_object() {
        let dsar = manager();
        for bad in [json!(null), json!([1]), json!("x")] {
            let err = dsar.request_data_correction("u", &bad).await.unwrap_err();
            assert!(matches!(
                err,
                ComplianceError::Validation(ValidationError::NotAnObject { ref param }) if param == "fields"
            ));
        }
        assert!(dsar.all_users().await.unwrap().is_empty());
        assert!(dsar.logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_index_operations() {
        let dsar = manager();
        dsar.log_dsar_action("a", "access").await.unwrap();
        dsar.log_dsar_action("b", "access").await.unwrap();

        assert_eq!(dsar.get_log_by_index(0).await.unwrap().unwrap().user_id, "a");
        assert!(dsar.get_log_by_index(2).await.unwrap().is_none());
        assert!(dsar.delete_log_by_index(0).await.unwrap());
        assert!(!dsar.delete_log_by_index(5).await.unwrap());
        assert_eq!(dsar.logs().await.unwrap().len(), 1);

        dsar.clear_logs().await.unwrap();
        assert!(dsar.logs().await.unwrap().is_empty());
    }
}
