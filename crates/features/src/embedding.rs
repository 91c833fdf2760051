//! Embedding similarity and the embedder seam.

use std::sync::LazyLock;

use regex::Regex;

/// Dimensionality of the embeddings produced for intents.
pub const EMBEDDING_DIM: usize = 384;

/// Text → vector function supplied by the caller.
///
/// Implementations must be safe to share across concurrent match requests.
pub trait Embedder: Send + Sync {
    /// Embed a text. `None` when no embedding can be produced.
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// Length of the vectors returned by `embed`.
    fn dimension(&self) -> usize;
}

/// Cosine similarity of two embeddings.
///
/// Returns 0.0 if either side is absent, all-zero, or the lengths differ.
pub fn cosine_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    ((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32).clamp(-1.0, 1.0)
}

#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{10}\b").expect("valid regex"));

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+").expect("valid regex"));

#[allow(clippy::expect_used)]
static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b").expect("valid regex")
});

#[allow(clippy::expect_used)]
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}\s?\d{4}\s?\d{4}\b").expect("valid regex"));

/// Mask phone numbers, emails, card and ID numbers before embedding.
pub fn sanitize_text(text: &str) -> String {
    let text = PHONE_RE.replace_all(text, "[PHONE]");
    let text = EMAIL_RE.replace_all(&text, "[EMAIL]");
    let text = CARD_RE.replace_all(&text, "[CARD]");
    ID_RE.replace_all(&text, "[ID]").into_owned()
}

/// Deterministic hashed bag-of-words embedder.
///
/// Each lowercased token is hashed into one signed bucket; the result is
/// L2-normalised. Texts sharing vocabulary get positively correlated vectors,
/// which is enough for offline runs and tests without a model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let clean = sanitize_text(text).to_lowercase();
        let mut vector = vec![0.0_f32; self.dimension];
        let mut tokens = 0usize;

        for token in clean
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = md5::compute(token.as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimension;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return None;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Some(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
