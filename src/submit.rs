//! Submission flow: validate, check for duplicates, store.
//!
//! [`Collector`] ties a [`CorpusStore`], a [`SharedEmbedder`] and the dedup
//! policy together. The CLI and the HTTP server both go through it.
//!
//! ```text
//! text ─▶ trim/validate ─▶ load corpus ─▶ dedup::check ─▶ policy ─▶ append
//!              │                │                            │
//!          EmptyText     corpus_warning               Blocked (not saved)
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{DedupConfig, DuplicatePolicy};
use crate::dedup::{self, Verdict};
use crate::embedding::SharedEmbedder;
use crate::error::SubmitError;
use crate::models::{resolve_language, Category, Item};
use crate::store::CorpusStore;

/// A contribution as entered by a person.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub category: Category,
    pub text: String,
    /// One of the listed languages, `"Other"`, or a free-form name.
    #[serde(default)]
    pub language: String,
    /// Used when `language` is `"Other"`.
    #[serde(default)]
    pub other_language: Option<String>,
    #[serde(default)]
    pub region_hint: Option<String>,
    #[serde(default)]
    pub contributor: Option<String>,
    /// Save even when a potential duplicate is found.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Blocked,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitReport {
    pub outcome: Outcome,
    /// The stored item, when accepted.
    pub item: Option<Item>,
    pub verdict: Verdict,
    /// Set when existing items could not be loaded for comparison.
    pub corpus_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub category: Category,
    pub threshold: f32,
    pub verdict: Verdict,
    pub corpus_warning: Option<String>,
}

pub struct Collector {
    store: Arc<dyn CorpusStore>,
    embedder: SharedEmbedder,
    dedup: DedupConfig,
}

impl Collector {
    pub fn new(store: Arc<dyn CorpusStore>, embedder: SharedEmbedder, dedup: DedupConfig) -> Self {
        Self {
            store,
            embedder,
            dedup,
        }
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn embedder(&self) -> &SharedEmbedder {
        &self.embedder
    }

    /// Check `text` against its category without saving anything.
    pub async fn preview(&self, category: Category, text: &str) -> Result<CheckReport, SubmitError> {
        let candidate = validate_text(text)?;
        let threshold = self.dedup.threshold_for(category);
        let (verdict, corpus_warning) = self.run_check(category, candidate, threshold).await;
        Ok(CheckReport {
            category,
            threshold,
            verdict,
            corpus_warning,
        })
    }

    /// Validate, check and, unless blocked as a duplicate, store a contribution.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitReport, SubmitError> {
        let category = request.category;
        let candidate = validate_text(&request.text)?;
        let threshold = self.dedup.threshold_for(category);

        let (verdict, corpus_warning) = self.run_check(category, candidate, threshold).await;

        if verdict.is_duplicate && self.dedup.on_duplicate == DuplicatePolicy::Block && !request.force
        {
            tracing::info!(%category, score = ?verdict.score, "submission blocked as duplicate");
            return Ok(SubmitReport {
                outcome: Outcome::Blocked,
                item: None,
                verdict,
                corpus_warning,
            });
        }

        let language = resolve_language(&request.language, request.other_language.as_deref());
        let item = Item::new(
            category,
            candidate,
            language,
            request.region_hint.as_deref(),
            request.contributor.as_deref(),
        );

        self.store
            .append(category, item.clone())
            .await
            .map_err(|source| {
                tracing::error!(%category, error = %format!("{:#}", source), "failed to save submission");
                SubmitError::SaveFailed { category, source }
            })?;

        tracing::info!(%category, id = %item.id, duplicate = verdict.is_duplicate, "submission saved");

        Ok(SubmitReport {
            outcome: Outcome::Accepted,
            item: Some(item),
            verdict,
            corpus_warning,
        })
    }

    async fn run_check(
        &self,
        category: Category,
        candidate: &str,
        threshold: f32,
    ) -> (Verdict, Option<String>) {
        let (corpus, corpus_warning) = match self.store.load_all(category).await {
            Ok(items) => (items, None),
            Err(e) => {
                let message = format!("could not load existing {}: {:#}", category.plural(), e);
                tracing::warn!(%category, %message, "treating corpus as empty");
                (Vec::new(), Some(message))
            }
        };

        let handle = self.embedder.get().await;
        let verdict = dedup::check(candidate, category, &corpus, handle, threshold).await;
        (verdict, corpus_warning)
    }
}

/// Trim `text`, rejecting blank input before it reaches the detector.
pub fn validate_text(text: &str) -> Result<&str, SubmitError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::EmptyText);
    }
    Ok(trimmed)
}
