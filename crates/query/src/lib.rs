//! Candidate retrieval predicates and dialect generation.
//!
//! Converts a query intent into an abstract `CandidatePredicate` and the
//! predicate into backend-specific syntax:
//! - In-memory evaluation (`CandidatePredicate::matches`)
//! - PostgREST query parameters
//!
//! Also hosts the query interpreter seam that turns free text into a
//! structured `ParamSet`.

pub mod interpreter;

use chrono::{DateTime, SecondsFormat, Utc};
use intentmatch_model::{Category, Intent, PostType};
use thiserror::Error;

pub use interpreter::{QueryInterpreter, RuleInterpreter};

/// Default number of candidates fetched per strategy attempt.
pub const DEFAULT_FETCH_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Empty intent verb")]
    EmptyVerb,
    #[error("Invalid intent verb: {0}")]
    InvalidVerb(String),
    #[error("Fetch limit must be positive")]
    ZeroLimit,
}

/// Complementary intent verbs.
const INTENT_INVERSIONS: &[(&str, &str)] = &[
    ("buy", "sell"),
    ("rent", "rent_out"),
    ("looking", "offering"),
    ("need", "provide"),
    ("want", "have"),
];

/// The complementary verb of `verb`, in either direction of the table.
pub fn invert_intent(verb: &str) -> Option<&'static str> {
    let verb = verb.trim().to_lowercase();
    INTENT_INVERSIONS.iter().find_map(|(a, b)| {
        if *a == verb {
            Some(*b)
        } else if *b == verb {
            Some(*a)
        } else {
            None
        }
    })
}

/// Verbs are spliced into filter syntax, so only word characters pass.
fn check_verb(verb: &str) -> Result<&str, QueryError> {
    let trimmed = verb.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyVerb);
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(QueryError::InvalidVerb(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Verb to search candidates for: the inversion, or the verb itself when it
/// has none.
pub fn target_verb(verb: &str) -> Result<String, QueryError> {
    let trimmed = check_verb(verb)?;
    Ok(invert_intent(trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_lowercase()))
}

/// Filter applied by a candidate store.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePredicate {
    pub post_type: PostType,
    pub category: Category,
    /// Only `is_active` intents
    pub active_only: bool,
    /// Raw text contains this verb, or the structured verb equals it
    pub verb: Option<String>,
    /// Owner whose intents are left out
    pub exclude_owner: Option<String>,
    /// Only intents not expired at this instant
    pub live_at: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl CandidatePredicate {
    /// Opposite post type, same category, active.
    pub fn for_intent(query: &Intent) -> Self {
        Self {
            post_type: query.post_type.opposite(),
            category: query.category,
            active_only: true,
            verb: None,
            exclude_owner: None,
            live_at: None,
            limit: DEFAULT_FETCH_LIMIT,
        }
    }

    /// Additionally require the complementary verb of `verb`.
    pub fn with_inverted_verb(mut self, verb: &str) -> Result<Self, QueryError> {
        self.verb = Some(target_verb(verb)?);
        Ok(self)
    }

    pub fn excluding_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.exclude_owner = Some(owner_id.into());
        self
    }

    pub fn live_at(mut self, now: DateTime<Utc>) -> Self {
        self.live_at = Some(now);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Evaluate the predicate against one intent.
    pub fn matches(&self, intent: &Intent) -> bool {
        if intent.post_type != self.post_type || intent.category != self.category {
            return false;
        }
        if self.active_only && !intent.is_active {
            return false;
        }
        if let Some(now) = self.live_at {
            if !intent.is_live(now) {
                return false;
            }
        }
        if let Some(owner) = &self.exclude_owner {
            if &intent.owner_id == owner {
                return false;
            }
        }
        match &self.verb {
            Some(verb) => verb_matches(intent, verb),
            None => true,
        }
    }
}

fn verb_matches(intent: &Intent, verb: &str) -> bool {
    if intent.raw_text.to_lowercase().contains(verb) {
        return true;
    }
    intent
        .params
        .as_ref()
        .and_then(|p| p.intent.as_deref())
        .is_some_and(|v| v.eq_ignore_ascii_case(verb))
}

/// Trait for translating predicates to backend-specific syntax.
pub trait QueryDialect {
    /// The output type (usually String or a structured query)
    type Output;

    /// Translate a predicate to this dialect
    fn translate(&self, predicate: &CandidatePredicate) -> Result<Self::Output, QueryError>;
}

/// Columns requested from the intents table, with the owner's name embedded.
pub const POSTGREST_SELECT: &str = "*,users(name)";

/// PostgREST query-parameter generator for the intents table.
#[derive(Debug, Default)]
pub struct PostgrestDialect;

impl QueryDialect for PostgrestDialect {
    type Output = Vec<(String, String)>;

    fn translate(&self, predicate: &CandidatePredicate) -> Result<Self::Output, QueryError> {
        if predicate.limit == 0 {
            return Err(QueryError::ZeroLimit);
        }

        let mut params = vec![
            ("select".to_string(), POSTGREST_SELECT.to_string()),
            ("post_type".to_string(), format!("eq.{}", predicate.post_type.as_str())),
            ("category".to_string(), format!("eq.{}", predicate.category.as_str())),
        ];

        if predicate.active_only {
            params.push(("is_active".to_string(), "eq.true".to_string()));
        }

        if let Some(owner) = &predicate.exclude_owner {
            params.push(("user_id".to_string(), format!("neq.{}", owner)));
        }

        if let Some(now) = predicate.live_at {
            let ts = now.to_rfc3339_opts(SecondsFormat::Secs, true);
            params.push((
                "or".to_string(),
                format!("(expiry_date.is.null,expiry_date.gt.{})", ts),
            ));
        }

        if let Some(verb) = &predicate.verb {
            let verb = check_verb(verb)?;
            let filter = format!("(raw_query.ilike.*{verb}*,parsed_data->>intent.eq.{verb})");
            // PostgREST only accepts one `or` key; combine with the expiry filter.
            match params.iter_mut().find(|(k, _)| k == "or") {
                Some((key, value)) => {
                    *key = "and".to_string();
                    *value = format!("(or{},or{})", value, filter);
                }
                None => params.push(("or".to_string(), filter)),
            }
        }

        params.push(("limit".to_string(), predicate.limit.to_string()));
        Ok(params)
    }
}
