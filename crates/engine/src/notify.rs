//! Hand-off of match digests to downstream consumers.

use std::future::Future;

use intentmatch_explain::MatchDigest;
use intentmatch_model::Intent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Receives the digest of new matches for an originating intent.
pub trait NotificationSink: Send + Sync {
    fn notify(
        &self,
        query: &Intent,
        digest: &MatchDigest,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Sink that writes digests to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn notify(&self, query: &Intent, digest: &MatchDigest) -> Result<(), NotifyError> {
        tracing::info!(
            intent_id = %query.intent_id,
            owner_id = %query.owner_id,
            matches = digest.match_count(),
            best_match = %digest.best_match_id,
            title = %digest.title,
            "{}",
            digest.body
        );
        Ok(())
    }
}
