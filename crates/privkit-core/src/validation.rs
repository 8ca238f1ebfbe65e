//! Argument validation.
//!
//! Checks run before any document is read or written, so a rejected call
//! never touches storage.

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{ConsentPreferences, UserFields};

/// Require a non-empty identifier. Whitespace counts as content.
pub fn require_identifier(param: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyIdentifier {
            param: param.to_string(),
        });
    }
    Ok(())
}

/// Require a JSON object (not null, not an array, not a scalar).
pub fn require_object<'a>(param: &str, value: &'a Value) -> Result<&'a UserFields, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        param: param.to_string(),
    })
}

/// Convert untyped JSON into consent preferences.
///
/// The value must be an object whose members are all booleans. The error
/// names the first offending member as `preferences.<purpose>`.
pub fn preferences_from_value(value: &Value) -> Result<ConsentPreferences, ValidationError> {
    let object = require_object("preferences", value)?;

    object
        .iter()
        .map(|(purpose, granted)| match granted {
            Value::Bool(b) => Ok((purpose.clone(), *b)),
            _ => Err(ValidationError::NotABoolean {
                param: format!("preferences.{}", purpose),
            }),
        })
        .collect()
}
