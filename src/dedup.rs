//! Semantic near-duplicate detection.
//!
//! [`check`] embeds a candidate text and the existing texts of its category,
//! scores the candidate against each existing text by cosine similarity, and
//! flags the **first** item in corpus order whose score meets the threshold.
//!
//! The detector never fails. A missing model, an empty corpus, or an error
//! while encoding or scoring all produce a non-duplicate [`Verdict`] carrying a
//! [`SkipReason`], so a broken similarity check can never stop a contribution
//! from being saved.
//!
//! The whole corpus is re-embedded on every call. Cost grows linearly with
//! the number of stored items; there is no vector cache.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

use crate::embedding::{cosine_similarity, Embedder, EmbedderHandle};
use crate::models::{Category, Item};

/// Why a check finished without comparing anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    ModelUnavailable,
    EmptyCorpus,
    CheckFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ModelUnavailable => f.write_str("model unavailable"),
            SkipReason::EmptyCorpus => f.write_str("empty corpus"),
            SkipReason::CheckFailed(cause) => write!(f, "check failed: {}", cause),
        }
    }
}

/// Result of a duplicate check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub is_duplicate: bool,
    /// Text of the first existing item at or above the threshold.
    pub matched_text: Option<String>,
    /// Similarity of `matched_text` to the candidate.
    pub score: Option<f32>,
    /// Highest similarity seen when nothing matched. Informational only.
    pub best_score: Option<f32>,
    /// Set when no comparison took place.
    pub skipped: Option<SkipReason>,
}

impl Verdict {
    fn duplicate(matched_text: String, score: f32) -> Self {
        Self {
            is_duplicate: true,
            matched_text: Some(matched_text),
            score: Some(score),
            best_score: Some(score),
            skipped: None,
        }
    }

    fn unique(best_score: Option<f32>) -> Self {
        Self {
            is_duplicate: false,
            matched_text: None,
            score: None,
            best_score,
            skipped: None,
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            is_duplicate: false,
            matched_text: None,
            score: None,
            best_score: None,
            skipped: Some(reason),
        }
    }

    /// Human-readable reason when the check was skipped.
    pub fn reason(&self) -> Option<String> {
        self.skipped.as_ref().map(ToString::to_string)
    }
}

/// Check `candidate` against `corpus` for a near-duplicate.
///
/// `candidate` must already be trimmed and non-empty. `threshold` is the
/// minimum cosine similarity, in `[0, 1]`, at which two texts count as the
/// same entry.
pub async fn check(
    candidate: &str,
    category: Category,
    corpus: &[Item],
    embedder: &EmbedderHandle,
    threshold: f32,
) -> Verdict {
    let embedder = match embedder.embedder() {
        Some(embedder) => embedder,
        None => {
            tracing::debug!(%category, "duplicate check skipped: model unavailable");
            return Verdict::skipped(SkipReason::ModelUnavailable);
        }
    };

    let texts: Vec<String> = corpus
        .iter()
        .filter(|item| !item.text.is_empty())
        .map(|item| item.text.clone())
        .collect();

    if texts.is_empty() {
        tracing::debug!(%category, "duplicate check skipped: empty corpus");
        return Verdict::skipped(SkipReason::EmptyCorpus);
    }

    tracing::debug!(
        %category,
        corpus = texts.len(),
        threshold,
        model = embedder.model_name(),
        "running duplicate check"
    );

    let scores = match score_against(embedder, candidate, &texts).await {
        Ok(scores) => scores,
        Err(e) => {
            let cause = format!("{:#}", e);
            tracing::warn!(%category, %cause, "duplicate check failed");
            return Verdict::skipped(SkipReason::CheckFailed(cause));
        }
    };

    match first_match(&scores, threshold) {
        Some(index) => {
            tracing::info!(%category, score = scores[index], "potential duplicate found");
            Verdict::duplicate(texts[index].clone(), scores[index])
        }
        None => Verdict::unique(scores.iter().copied().reduce(f32::max)),
    }
}

/// Index of the first score at or above `threshold`, in input order.
pub fn first_match(scores: &[f32], threshold: f32) -> Option<usize> {
    scores.iter().position(|&score| score >= threshold)
}

/// Similarity of `candidate` to each of `texts`, in the same order.
async fn score_against(
    embedder: &dyn Embedder,
    candidate: &str,
    texts: &[String],
) -> Result<Vec<f32>> {
    let existing = embedder.encode(texts).await?;
    if existing.len() != texts.len() {
        bail!(
            "expected {} corpus embeddings, got {}",
            texts.len(),
            existing.len()
        );
    }

    let candidate_vec = embedder
        .encode(&[candidate.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no embedding returned for candidate"))?;
    validate_vector(&candidate_vec, None)?;

    existing
        .iter()
        .map(|vector| {
            validate_vector(vector, Some(candidate_vec.len()))?;
            let score = cosine_similarity(&candidate_vec, vector);
            if !score.is_finite() {
                bail!("non-finite similarity score");
            }
            Ok(score)
        })
        .collect()
}

fn validate_vector(vector: &[f32], expected_dims: Option<usize>) -> Result<()> {
    if vector.is_empty() {
        bail!("empty embedding vector");
    }
    if let Some(dims) = expected_dims {
        if vector.len() != dims {
            bail!(
                "embedding dimension mismatch: candidate has {}, corpus entry has {}",
                dims,
                vector.len()
            );
        }
    }
    if vector.iter().any(|x| !x.is_finite()) {
        bail!("embedding contains non-finite values");
    }
    let norm_sq: f32 = vector.iter().map(|x| x * x).sum();
    if norm_sq < f32::EPSILON {
        bail!("zero-norm embedding vector");
    }
    Ok(())
}
