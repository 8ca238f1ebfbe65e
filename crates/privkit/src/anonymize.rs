//! Field anonymization and pseudonymization.
//!
//! Pure transforms over JSON records; nothing here touches storage.
//! Built-in methods are `mask` (every character except line terminators
//! becomes `*`) and `hash`
//! (SHA-256, lowercase hex). Registered strategies take precedence over
//! built-ins of the same name. Unknown methods leave the value unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use privkit_core::{require_identifier, require_object, UserFields};

use crate::error::Result;
use crate::registry::StrategyRegistry;

/// Method used when neither the call nor the field rule names one.
pub const DEFAULT_METHOD: &str = "mask";

/// Per-field anonymization rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub method: String,
}

impl FieldRule {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnonymizeOptions {
    /// Overrides the configured rule for this call.
    pub method: Option<String>,
    /// Passed through to custom strategies.
    pub extra: UserFields,
}

impl AnonymizeOptions {
    pub fn with_method(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            extra: UserFields::new(),
        }
    }
}

/// A custom anonymization method.
pub trait AnonymizationStrategy: Send + Sync {
    fn apply(&self, value: &str, options: &AnonymizeOptions) -> String;
}

impl<F> AnonymizationStrategy for F
where
    F: Fn(&str, &AnonymizeOptions) -> String + Send + Sync,
{
    fn apply(&self, value: &str, options: &AnonymizeOptions) -> String {
        self(value, options)
    }
}

/// Field anonymizer with its own rules and strategy registry.
#[derive(Debug, Default)]
pub struct Anonymizer {
    rules: BTreeMap<String, FieldRule>,
    strategies: StrategyRegistry<dyn AnonymizationStrategy>,
}

impl Anonymizer {
    pub fn new(rules: BTreeMap<String, FieldRule>) -> Self {
        Self {
            rules,
            strategies: StrategyRegistry::new(),
        }
    }

    /// Merge `rules` into the current configuration.
    pub fn configure(&mut self, rules: BTreeMap<String, FieldRule>) {
        self.rules.extend(rules);
    }

    pub fn rules(&self) -> &BTreeMap<String, FieldRule> {
        &self.rules
    }

    /// Register a custom method. The last registration for a name wins.
    pub fn register_strategy<S>(&self, name: &str, strategy: S) -> Result<()>
    where
        S: AnonymizationStrategy + 'static,
    {
        self.strategies.register(name, Arc::new(strategy))
    }

    /// Return a copy of `record` with `field` anonymized.
    ///
    /// The record is returned unchanged when the field is missing or holds
    /// an empty value (`null`, `false`, `0`, `""`).
    pub fn anonymize_field(
        &self,
        record: &Value,
        field: &str,
        options: &AnonymizeOptions,
    ) -> Result<Value> {
        let object = require_object("record", record)?;
        require_identifier("field", field)?;

        let Some(text) = object.get(field).and_then(field_text) else {
            return Ok(record.clone());
        };

        let method = options
            .method
            .as_deref()
            .or_else(|| self.rules.get(field).map(|r| r.method.as_str()))
            .unwrap_or(DEFAULT_METHOD);

        let replaced = if let Some(strategy) = self.strategies.get(method) {
            Value::String(strategy.apply(&text, options))
        } else {
            match method {
                "hash" => Value::String(hex::encode(Sha256::digest(text.as_bytes()))),
                "mask" => Value::String(mask(&text)),
                other => {
                    tracing::debug!(method = other, field, "unknown anonymization method");
                    return Ok(record.clone());
                }
            }
        };

        let mut out = object.clone();
        out.insert(field.to_string(), replaced);
        Ok(Value::Object(out))
    }

    /// Return a copy of `record` with `field` base64-encoded.
    ///
    /// This is reversible and only hides values from casual inspection.
    pub fn pseudonymize_field(&self, record: &Value, field: &str) -> Result<Value> {
        let object = require_object("record", record)?;
        require_identifier("field", field)?;

        let Some(text) = object.get(field).and_then(field_text) else {
            return Ok(record.clone());
        };

        let mut out = object.clone();
        out.insert(field.to_string(), Value::String(BASE64.encode(text.as_bytes())));
        Ok(Value::Object(out))
    }
}

/// Replace every character with `*`, keeping line terminators.
fn mask(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' | '\r' | '\u{2028}' | '\u{2029}' => c,
            _ => '*',
        })
        .collect()
}

/// Text form of a field, or `None` for empty values.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
