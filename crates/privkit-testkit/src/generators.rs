//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use privkit_core::{ConsentPreferences, UserFields, UserRecords};

/// Generate a non-empty user or activity identifier.
pub fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.@-]{1,24}".prop_map(String::from)
}

/// Generate a processing purpose name.
pub fn purpose() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,15}".prop_map(String::from)
}

/// Generate a purpose → granted map.
pub fn preferences() -> impl Strategy<Value = ConsentPreferences> {
    prop::collection::btree_map(purpose(), any::<bool>(), 0..8)
}

/// Generate a JSON scalar.
///
/// Floats are left out: they do not survive a text round trip bit for bit.
pub fn json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "\\PC{0,32}".prop_map(Value::String),
    ]
}

/// Generate an arbitrary JSON value, nested at most a few levels.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_scalar().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate the fields of one user record.
pub fn user_fields() -> impl Strategy<Value = UserFields> {
    prop::collection::btree_map("[a-z][a-zA-Z]{0,11}", json_value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// Generate a whole `dsar_users` document.
pub fn user_records() -> impl Strategy<Value = UserRecords> {
    prop::collection::btree_map(identifier(), user_fields(), 0..5)
}

/// Generate plaintext bytes of at most `max_len` bytes.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}
