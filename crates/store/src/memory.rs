//! In-memory snapshot store.

use std::path::Path;

use intentmatch_model::Intent;
use intentmatch_query::CandidatePredicate;

use crate::{CandidateStore, StoreError};

/// Immutable snapshot of intents evaluated with `CandidatePredicate::matches`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    intents: Vec<Intent>,
}

impl MemoryStore {
    pub fn new(intents: Vec<Intent>) -> Self {
        Self { intents }
    }

    /// Parse a JSON array of intents.
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let intents: Vec<Intent> =
            serde_json::from_str(json).map_err(|e| StoreError::ParseError(e.to_string()))?;
        Ok(Self::new(intents))
    }

    /// Load a JSON array of intents from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Connection(format!("{}: {}", path.display(), e)))?;
        let store = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), intents = store.len(), "Loaded intent pool");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }
}

impl CandidateStore for MemoryStore {
    async fn find(&self, predicate: &CandidatePredicate) -> Result<Vec<Intent>, StoreError> {
        let found: Vec<Intent> = self
            .intents
            .iter()
            .filter(|intent| predicate.matches(intent))
            .take(predicate.limit)
            .cloned()
            .collect();

        tracing::debug!(
            post_type = predicate.post_type.as_str(),
            category = predicate.category.as_str(),
            verb = ?predicate.verb,
            found = found.len(),
            "Memory store lookup"
        );
        Ok(found)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
