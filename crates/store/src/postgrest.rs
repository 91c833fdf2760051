//! PostgREST candidate store.

use std::time::Duration;

use intentmatch_model::Intent;
use intentmatch_query::{CandidatePredicate, PostgrestDialect, QueryDialect};
use serde::{Deserialize, Serialize};

use crate::{CandidateStore, StoreError};

/// PostgREST store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgrestConfig {
    /// Base URL of the REST endpoint, e.g. `https://db.example.com/rest/v1`
    pub base_url: String,
    /// Table holding the intents
    pub table_name: String,
    /// Sent as `apikey` and bearer token when present
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PostgrestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            table_name: "intents".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// Candidate store backed by a PostgREST endpoint.
pub struct PostgrestStore {
    config: PostgrestConfig,
    client: reqwest::Client,
}

impl PostgrestStore {
    /// Create a new PostgREST store.
    pub fn new(config: PostgrestConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table_name
        )
    }

    fn get(&self, params: &[(String, String)]) -> reqwest::RequestBuilder {
        let request = self.client.get(self.table_url()).query(params);
        match &self.config.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Parse a JSON array of rows, skipping rows that do not deserialize.
    fn parse_rows(&self, response: serde_json::Value) -> Result<Vec<Intent>, StoreError> {
        let rows = match response {
            serde_json::Value::Array(rows) => rows,
            _ => return Err(StoreError::ParseError("Expected a JSON array".to_string())),
        };

        let mut intents = Vec::with_capacity(rows.len());
        for row in rows {
            let embedded_name = owner_name(&row);
            match serde_json::from_value::<Intent>(row) {
                Ok(mut intent) => {
                    if intent.owner_name.is_none() {
                        intent.owner_name = embedded_name;
                    }
                    intents.push(intent);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping malformed intent row"),
            }
        }
        Ok(intents)
    }
}

/// Owner name from the embedded `users` resource.
fn owner_name(row: &serde_json::Value) -> Option<String> {
    row.get("users")?
        .get("name")?
        .as_str()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
}

impl CandidateStore for PostgrestStore {
    async fn find(&self, predicate: &CandidatePredicate) -> Result<Vec<Intent>, StoreError> {
        let params = PostgrestDialect.translate(predicate)?;

        tracing::debug!(table = %self.config.table_name, ?params, "Executing PostgREST query");

        let response = self
            .get(&params)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::QueryFailed(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::ParseError(e.to_string()))?;

        self.parse_rows(json)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let params = [
            ("select".to_string(), "intent_id".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        let response = self
            .get(&params)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn name(&self) -> &'static str {
        "postgrest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> PostgrestStore {
        PostgrestStore::new(PostgrestConfig {
            base_url: "http://localhost:3000/rest/v1/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_table_url_trims_slash() {
        assert_eq!(store().table_url(), "http://localhost:3000/rest/v1/intents");
    }

    #[test]
    fn test_parse_rows_skips_malformed() {
        let rows = json!([
            {"intent_id": "a", "user_id": "u1", "post_type": "supply",
             "category": "product", "raw_query": "Selling bike"},
            {"intent_id": "b", "post_type": "nonsense"}
        ]);
        let intents = store().parse_rows(rows).unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].intent_id, "a");
    }

    #[test]
    fn test_parse_rows_fills_owner_name_from_users() {
        let rows = json!([
            {"intent_id": "a", "user_id": "u1", "post_type": "supply",
             "category": "product", "raw_query": "Selling bike",
             "users": {"name": "Asha"}},
            {"intent_id": "b", "user_id": "u2", "post_type": "supply",
             "category": "product", "raw_query": "Selling scooter",
             "users": null},
            {"intent_id": "c", "user_id": "u3", "post_type": "supply",
             "category": "product", "raw_query": "Selling car",
             "owner_name": "Ravi", "users": {"name": "Someone else"}}
        ]);
        let intents = store().parse_rows(rows).unwrap();

        assert_eq!(intents[0].owner_name.as_deref(), Some("Asha"));
        assert_eq!(intents[0].display_name(), "Asha");
        assert_eq!(intents[1].display_name(), "Unknown");
        assert_eq!(intents[2].owner_name.as_deref(), Some("Ravi"));
    }

    #[test]
    fn test_parse_rows_requires_array() {
        assert!(matches!(
            store().parse_rows(json!({"message": "denied"})),
            Err(StoreError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let store = PostgrestStore::new(PostgrestConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(store.health_check().await, Err(StoreError::Connection(_))));
    }
}
