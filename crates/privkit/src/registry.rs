//! Named strategy registries.
//!
//! Each component owns its own registry. Registering a name twice replaces
//! the earlier strategy.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use privkit_core::require_identifier;

use crate::error::Result;

/// Map from strategy name to a shared strategy object.
pub struct StrategyRegistry<S: ?Sized> {
    entries: RwLock<HashMap<String, Arc<S>>>,
}

impl<S: ?Sized> Default for StrategyRegistry<S> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<S: ?Sized> fmt::Debug for StrategyRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl<S: ?Sized> StrategyRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` under `name`, replacing any previous one.
    pub fn register(&self, name: &str, strategy: Arc<S>) -> Result<()> {
        require_identifier("name", name)?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(name.to_string(), strategy);
        Ok(())
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Option<Arc<S>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }
}
