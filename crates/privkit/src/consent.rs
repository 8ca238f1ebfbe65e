//! # Consent Register
//!
//! Per-user purpose → granted maps, persisted as the `consents` document.
//!
//! ## Overview
//!
//! Every mutation is one read-modify-write cycle on the document followed
//! by an entry in the [`AuditTrail`]. Storage can be taken over by a named
//! [`ConsentStrategy`]; the strategy is then responsible for its own
//! persistence and no audit entry is written by the register.
//!
//! ## Design Notes
//!
//! - Identifiers are validated before any I/O.
//! - A strategy name that is not registered falls back to the default
//!   persistence path.
//! - Withdrawing a user's last remaining purpose removes the user entry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use privkit_core::{
    require_identifier, require_object, ConsentPreferences, ConsentRecords, DocumentId,
    UserFields, ValidationError,
};
use privkit_store::{Change, DocumentStore};

use crate::audit::AuditTrail;
use crate::error::Result;
use crate::registry::StrategyRegistry;

/// Options for [`ConsentRegister::store_consent`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOptions {
    /// Strategy to delegate to. Falls back to the register's default.
    pub strategy: Option<String>,
    /// Extra members passed through to the strategy untouched.
    pub extra: UserFields,
}

impl StoreOptions {
    /// Options naming a strategy.
    pub fn with_strategy(name: impl Into<String>) -> Self {
        Self {
            strategy: Some(name.into()),
            extra: UserFields::new(),
        }
    }

    /// Build options from untyped JSON.
    ///
    /// The value must be an object. A string `strategy` member selects the
    /// strategy; every other member lands in `extra`.
    pub fn from_value(value: &Value) -> std::result::Result<Self, ValidationError> {
        let mut extra = require_object("options", value)?.clone();
        let strategy = match extra.remove("strategy") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(_) => {
                return Err(ValidationError::NotAString {
                    param: "options.strategy".into(),
                })
            }
        };
        Ok(Self { strategy, extra })
    }
}

/// Which purposes to withdraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Withdrawal {
    /// Every purpose; removes the user entry.
    All,
    /// Only the named purposes.
    Purposes(Vec<String>),
}

impl Withdrawal {
    fn audit_details(&self) -> Value {
        match self {
            Withdrawal::All => json!({ "purposes": null }),
            Withdrawal::Purposes(list) => json!({ "purposes": list }),
        }
    }
}

impl From<&str> for Withdrawal {
    fn from(purpose: &str) -> Self {
        Withdrawal::Purposes(vec![purpose.to_string()])
    }
}

impl From<Vec<String>> for Withdrawal {
    fn from(purposes: Vec<String>) -> Self {
        Withdrawal::Purposes(purposes)
    }
}

/// Storage override for consent preferences.
#[async_trait]
pub trait ConsentStrategy: Send + Sync {
    async fn store(
        &self,
        user_id: &str,
        preferences: &ConsentPreferences,
        options: &StoreOptions,
    ) -> Result<()>;
}

#[async_trait]
impl<F> ConsentStrategy for F
where
    F: Fn(&str, &ConsentPreferences, &StoreOptions) -> Result<()> + Send + Sync,
{
    async fn store(
        &self,
        user_id: &str,
        preferences: &ConsentPreferences,
        options: &StoreOptions,
    ) -> Result<()> {
        self(user_id, preferences, options)
    }
}

/// The consent register.
#[derive(Debug)]
pub struct ConsentRegister {
    docs: DocumentStore,
    audit: AuditTrail,
    strategies: StrategyRegistry<dyn ConsentStrategy>,
    default_strategy: Option<String>,
}

impl ConsentRegister {
    pub fn new(docs: DocumentStore, audit: AuditTrail) -> Self {
        Self {
            docs,
            audit,
            strategies: StrategyRegistry::new(),
            default_strategy: None,
        }
    }

    /// Use `name` whenever [`StoreOptions::strategy`] is unset.
    pub fn with_default_strategy(mut self, name: impl Into<String>) -> Self {
        self.default_strategy = Some(name.into());
        self
    }

    /// Register a storage strategy. The last registration for a name wins.
    pub fn register_strategy<S>(&self, name: &str, strategy: S) -> Result<()>
    where
        S: ConsentStrategy + 'static,
    {
        self.strategies.register(name, Arc::new(strategy))?;
        tracing::debug!(strategy = name, "consent strategy registered");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace a user's preferences.
    pub async fn store_consent(
        &self,
        user_id: &str,
        preferences: ConsentPreferences,
        options: &StoreOptions,
    ) -> Result<()> {
        require_identifier("userId", user_id)?;

        let name = options
            .strategy
            .as_deref()
            .or(self.default_strategy.as_deref());
        if let Some(name) = name {
            match self.strategies.get(name) {
                Some(strategy) => {
                    strategy.store(user_id, &preferences, options).await?;
                    tracing::info!(user_id, strategy = name, "consent stored by strategy");
                    return Ok(());
                }
                None => {
                    tracing::debug!(strategy = name, "strategy not registered, using default storage");
                }
            }
        }

        let user = user_id.to_string();
        let stored = preferences.clone();
        self.docs
            .update(&DocumentId::CONSENTS, ConsentRecords::new(), move |consents| {
                consents.insert(user, stored);
                Change::Commit(())
            })
            .await?;

        self.audit
            .record("storeConsent", user_id, json!({ "preferences": preferences }))
            .await?;
        tracing::info!(user_id, purposes = preferences.len(), "consent stored");
        Ok(())
    }

    /// [`store_consent`](Self::store_consent), then an `upsertConsent`
    /// audit entry.
    pub async fn upsert_consent(
        &self,
        user_id: &str,
        preferences: ConsentPreferences,
        options: &StoreOptions,
    ) -> Result<()> {
        require_identifier("userId", user_id)?;
        let details = json!({ "preferences": preferences });
        self.store_consent(user_id, preferences, options).await?;
        self.audit.record("upsertConsent", user_id, details).await?;
        Ok(())
    }

    /// Withdraw some or all purposes.
    ///
    /// Returns false, without writing, if the user has no record.
    pub async fn withdraw_consent(&self, user_id: &str, withdrawal: Withdrawal) -> Result<bool> {
        require_identifier("userId", user_id)?;
        if let Withdrawal::Purposes(purposes) = &withdrawal {
            for purpose in purposes {
                require_identifier("purposes", purpose)?;
            }
        }

        let user = user_id.to_string();
        let target = withdrawal.clone();
        let existed = self
            .docs
            .update(&DocumentId::CONSENTS, ConsentRecords::new(), move |consents| {
                let Some(prefs) = consents.get_mut(&user) else {
                    return Change::Discard(false);
                };
                match target {
                    Withdrawal::All => {
                        consents.remove(&user);
                    }
                    Withdrawal::Purposes(purposes) => {
                        for purpose in &purposes {
                            prefs.remove(purpose);
                        }
                        if prefs.is_empty() {
                            consents.remove(&user);
                        }
                    }
                }
                Change::Commit(true)
            })
            .await?;

        if existed {
            self.audit
                .record("withdrawConsent", user_id, withdrawal.audit_details())
                .await?;
            tracing::info!(user_id, ?withdrawal, "consent withdrawn");
        }
        Ok(existed)
    }

    /// Remove a user's record. Returns true if one existed.
    pub async fn delete_consent(&self, user_id: &str) -> Result<bool> {
        require_identifier("userId", user_id)?;

        let user = user_id.to_string();
        let existed = self
            .docs
            .update(&DocumentId::CONSENTS, ConsentRecords::new(), move |consents| {
                match consents.remove(&user) {
                    Some(_) => Change::Commit(true),
                    None => Change::Discard(false),
                }
            })
            .await?;

        if existed {
            self.audit.record("deleteConsent", user_id, json!({})).await?;
            tracing::info!(user_id, "consent deleted");
        }
        Ok(existed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `user_id` granted `purpose`. False when either is unknown.
    pub async fn get_consent_status(&self, user_id: &str, purpose: &str) -> Result<bool> {
        require_identifier("userId", user_id)?;
        require_identifier("purpose", purpose)?;

        let prefs = self.get_preferences(user_id).await?;
        Ok(prefs.get(purpose).copied().unwrap_or(false))
    }

    /// A user's preferences, empty when absent.
    pub async fn get_preferences(&self, user_id: &str) -> Result<ConsentPreferences> {
        require_identifier("userId", user_id)?;
        let mut consents = self.all_consents().await?;
        Ok(consents.remove(user_id).unwrap_or_default())
    }

    /// Every stored record.
    pub async fn all_consents(&self) -> Result<ConsentRecords> {
        Ok(self
            .docs
            .read(&DocumentId::CONSENTS, ConsentRecords::new())
            .await?)
    }

    /// Audit entries recorded by this register.
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }
}
