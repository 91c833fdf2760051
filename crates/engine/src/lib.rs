//! Strategy orchestration for intent matching.
//!
//! The `Engine` runs the fallback chain (advanced, ML-feature, basic) against a
//! `CandidateStore`. Each strategy fetches its own candidate pool and ranks it;
//! a store error, a ranking error or the request deadline moves on to the next
//! strategy. Callers always get a list back, possibly empty.

pub mod config;
pub mod notify;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use intentmatch_explain::MatchDigest;
use intentmatch_features::Embedder;
use intentmatch_model::{Intent, MatchResult};
use intentmatch_query::QueryInterpreter;
use intentmatch_rerank::{default_chain, MatchError, Matcher};
use intentmatch_store::{CandidateStore, StoreError};
use thiserror::Error;
use tokio::time::Instant;

pub use config::EngineConfig;
pub use notify::{LogSink, NotificationSink, NotifyError};

/// Errors raised while building an engine. Matching itself never fails.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot read config: {0}")]
    ConfigRead(String),

    #[error("Cannot parse config: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] intentmatch_rerank::ConfigError),
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Ranking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Fallback-chain matcher over a candidate store.
pub struct Engine<S> {
    store: S,
    chain: Vec<Arc<dyn Matcher>>,
    embedder: Option<Arc<dyn Embedder>>,
    interpreter: Option<Arc<dyn QueryInterpreter>>,
    config: EngineConfig,
}

impl<S: CandidateStore> Engine<S> {
    /// Build an engine running the default chain.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let chain = default_chain(&config.matching)?;
        Ok(Self {
            store,
            chain: chain.into_iter().map(Arc::from).collect(),
            embedder: None,
            interpreter: None,
            config,
        })
    }

    /// Replace the strategy chain.
    pub fn with_chain(mut self, chain: Vec<Box<dyn Matcher>>) -> Self {
        self.chain = chain.into_iter().map(Arc::from).collect();
        self
    }

    /// Embed intents that arrive without an embedding.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Interpret intents that arrive without a parameter set.
    pub fn with_interpreter(mut self, interpreter: Arc<dyn QueryInterpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked matches for `query`, evaluated now.
    pub async fn find_matches(&self, query: &Intent) -> Vec<MatchResult> {
        self.find_matches_at(query, Utc::now()).await
    }

    /// Ranked matches for `query`, evaluated at `now`.
    pub async fn find_matches_at(&self, query: &Intent, now: DateTime<Utc>) -> Vec<MatchResult> {
        let mut query = query.clone();
        self.enrich(&mut query);

        let deadline = Instant::now() + Duration::from_millis(self.config.request_timeout_ms);

        for matcher in &self.chain {
            let strategy = matcher.kind().name();
            let attempt = self.attempt(matcher, &query, now);

            match tokio::time::timeout_at(deadline, attempt).await {
                Ok(Ok(results)) => {
                    tracing::debug!(
                        intent_id = %query.intent_id,
                        strategy,
                        results = results.len(),
                        "Matching complete"
                    );
                    return results;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        intent_id = %query.intent_id,
                        strategy,
                        error = %e,
                        "Strategy failed, falling back"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        intent_id = %query.intent_id,
                        strategy,
                        timeout_ms = self.config.request_timeout_ms,
                        "Strategy timed out, falling back"
                    );
                }
            }
        }

        tracing::warn!(intent_id = %query.intent_id, "All strategies failed");
        Vec::new()
    }

    /// Match, then hand the digest of new high-scoring results to `sink`.
    ///
    /// Only results created after `last_check` are notified. Delivery failures
    /// are logged and do not affect the returned results.
    pub async fn match_and_notify<N: NotificationSink>(
        &self,
        query: &Intent,
        sink: &N,
        last_check: Option<DateTime<Utc>>,
    ) -> Vec<MatchResult> {
        let results = self.find_matches(query).await;

        let digest = MatchDigest::build(query, &results, self.config.notify_threshold, last_check);
        match digest {
            Some(digest) => {
                if let Err(e) = sink.notify(query, &digest).await {
                    tracing::warn!(intent_id = %query.intent_id, error = %e, "Notification failed");
                }
            }
            None => {
                tracing::debug!(intent_id = %query.intent_id, "Nothing new to notify");
            }
        }

        results
    }

    async fn attempt(
        &self,
        matcher: &Arc<dyn Matcher>,
        query: &Intent,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchResult>, AttemptError> {
        let predicate = matcher.predicate(query, now)?;
        let mut candidates = self.store.find(&predicate).await?;

        tracing::debug!(
            store = self.store.name(),
            strategy = matcher.kind().name(),
            fetched = candidates.len(),
            "Fetched candidates"
        );

        for candidate in &mut candidates {
            self.enrich(candidate);
        }

        // Ranking is CPU-bound; off the runtime the deadline can still fire.
        let matcher = Arc::clone(matcher);
        let query = query.clone();
        let ranked =
            tokio::task::spawn_blocking(move || matcher.rank(&query, candidates, now)).await??;
        Ok(ranked)
    }

    /// Fill a missing parameter set and embedding from the injected components.
    fn enrich(&self, intent: &mut Intent) {
        if intent.params.is_none() {
            if let Some(interpreter) = &self.interpreter {
                let params = interpreter.interpret(&intent.raw_text, intent.location_name.as_deref());
                intent.params = Some(params);
            }
        }
        if intent.embedding.is_none() {
            if let Some(embedder) = &self.embedder {
                intent.embedding = embedder.embed(&intent.raw_text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentmatch_features::HashingEmbedder;
    use intentmatch_model::{Category, ParamSet, PostType, StrategyKind};
    use intentmatch_query::{CandidatePredicate, RuleInterpreter};
    use intentmatch_store::MemoryStore;

    struct BrokenStore;

    impl CandidateStore for BrokenStore {
        async fn find(&self, _predicate: &CandidatePredicate) -> Result<Vec<Intent>, StoreError> {
            Err(StoreError::Unavailable)
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    struct SlowStore;

    impl CandidateStore for SlowStore {
        async fn find(&self, _predicate: &CandidatePredicate) -> Result<Vec<Intent>, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    /// Takes two seconds to rank anything.
    struct SlowRankMatcher;

    impl Matcher for SlowRankMatcher {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Basic
        }

        fn predicate(
            &self,
            query: &Intent,
            _now: DateTime<Utc>,
        ) -> Result<CandidatePredicate, MatchError> {
            Ok(CandidatePredicate::for_intent(query))
        }

        fn rank(
            &self,
            _query: &Intent,
            _candidates: Vec<Intent>,
            _now: DateTime<Utc>,
        ) -> Result<Vec<MatchResult>, MatchError> {
            std::thread::sleep(Duration::from_secs(2));
            Ok(Vec::new())
        }
    }

    fn query() -> Intent {
        Intent::new("q", "me", PostType::Demand, Category::Product, "Need a laptop")
            .with_location_name("Koramangala")
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_results() {
        let engine = Engine::new(MemoryStore::default(), EngineConfig::default()).unwrap();
        assert!(engine.find_matches(&query()).await.is_empty());
    }

    #[tokio::test]
    async fn test_all_strategies_failing_gives_empty_results() {
        let engine = Engine::new(BrokenStore, EngineConfig::default()).unwrap();
        assert!(engine.find_matches(&query()).await.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_abandons_slow_store() {
        let config = EngineConfig {
            request_timeout_ms: 50,
            ..Default::default()
        };
        let engine = Engine::new(SlowStore, config).unwrap();

        let started = std::time::Instant::now();
        assert!(engine.find_matches(&query()).await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_abandons_slow_ranking() {
        let config = EngineConfig {
            request_timeout_ms: 50,
            ..Default::default()
        };
        let candidate = Intent::new("s", "seller", PostType::Supply, Category::Product, "Selling laptop");
        let engine = Engine::new(MemoryStore::new(vec![candidate]), config)
            .unwrap()
            .with_chain(vec![Box::new(SlowRankMatcher)]);

        let started = std::time::Instant::now();
        assert!(engine.find_matches(&query()).await.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.matching.basic.top_k = 0;
        assert!(matches!(
            Engine::new(MemoryStore::default(), config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_enrich_fills_missing_fields_only() {
        let engine = Engine::new(MemoryStore::default(), EngineConfig::default())
            .unwrap()
            .with_interpreter(Arc::new(RuleInterpreter::new()))
            .with_embedder(Arc::new(HashingEmbedder::new(16)));

        let mut bare = query();
        engine.enrich(&mut bare);
        let params = bare.params.as_ref().unwrap();
        assert_eq!(params.category.as_deref(), Some("laptop"));
        assert_eq!(params.location.as_deref(), Some("Koramangala"));
        assert_eq!(bare.embedding.as_ref().map(Vec::len), Some(16));

        let preset = ParamSet {
            category: Some("notebook".into()),
            ..Default::default()
        };
        let mut filled = query().with_params(preset.clone()).with_embedding(vec![1.0]);
        engine.enrich(&mut filled);
        assert_eq!(filled.params, Some(preset));
        assert_eq!(filled.embedding, Some(vec![1.0]));
    }
}
