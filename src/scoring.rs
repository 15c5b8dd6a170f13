//! Scorer capability, registry and the page score cube.
//!
//! Metric algorithms live outside this crate. They plug in through the
//! [`Scorer`] trait and are looked up by id in a [`ScorerRegistry`]. The
//! registry is used twice per request at most: once over the whole candidate
//! set when sorting by a metric, and once over the page for display.

use crate::source::PageColumn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during scoring
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Metric {metric} returned {actual} sentence scores for {expected} hypotheses")]
    LengthMismatch {
        metric: String,
        expected: usize,
        actual: usize,
    },

    #[error("Metric {metric} failed: {reason}")]
    Failed { metric: String, reason: String },
}

/// Which levels a scorer should compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLevel {
    /// One aggregate over all examples
    pub corpus: bool,
    /// One score per example
    pub sentence: bool,
}

impl ScoreLevel {
    /// Sentence-level only, the level the viewer always asks for
    pub const SENTENCE: Self = Self {
        corpus: false,
        sentence: true,
    };
}

/// Output of one scorer invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    /// Corpus-level score, if requested
    pub corpus_score: Option<f64>,
    /// Per-example scores, if requested
    pub sent_scores: Vec<f64>,
}

/// Metric implementation.
///
/// `references` holds one list per reference channel, each aligned with
/// `hypotheses`.
pub trait Scorer: Send + Sync {
    /// Score hypotheses against references
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::Failed` if the metric cannot be computed.
    fn score(
        &self,
        hypotheses: &[String],
        references: &[Vec<String>],
        level: ScoreLevel,
    ) -> Result<ScoreOutput, ScoreError>;
}

/// Scorers by metric id
#[derive(Default)]
pub struct ScorerRegistry {
    scorers: BTreeMap<String, Box<dyn Scorer>>,
}

impl std::fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl ScorerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scorer, returning the one it replaces
    pub fn register(
        &mut self,
        id: impl Into<String>,
        scorer: impl Scorer + 'static,
    ) -> Option<Box<dyn Scorer>> {
        self.scorers.insert(id.into(), Box::new(scorer))
    }

    /// Builder-style [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, scorer: impl Scorer + 'static) -> Self {
        self.register(id, scorer);
        self
    }

    /// Look up a scorer by id
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::UnknownMetric` if no scorer is registered under `id`.
    pub fn resolve(&self, id: &str) -> Result<&dyn Scorer, ScoreError> {
        self.scorers
            .get(id)
            .map(AsRef::as_ref)
            .ok_or_else(|| ScoreError::UnknownMetric(id.to_string()))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.scorers.contains_key(id)
    }

    /// Registered metric ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.scorers.keys().map(String::as_str).collect()
    }

    /// Sentence-level scores of one hypothesis list, unrounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is unknown, fails, or returns the
    /// wrong number of scores.
    pub fn sentence_scores(
        &self,
        metric: &str,
        hypotheses: &[String],
        references: &[Vec<String>],
    ) -> Result<Vec<f64>, ScoreError> {
        let scorer = self.resolve(metric)?;
        let output = scorer.score(hypotheses, references, ScoreLevel::SENTENCE)?;
        if output.sent_scores.len() != hypotheses.len() {
            return Err(ScoreError::LengthMismatch {
                metric: metric.to_string(),
                expected: hypotheses.len(),
                actual: output.sent_scores.len(),
            });
        }
        Ok(output.sent_scores)
    }

    /// Sentence-level scores for page-aligned slots, unrounded.
    ///
    /// A position is scored only when the hypothesis and every reference
    /// channel have an item there; the rest stay `None`. Scores go back to
    /// the position they were computed for.
    ///
    /// # Errors
    ///
    /// Same as [`sentence_scores`](Self::sentence_scores). An unknown metric
    /// fails even when nothing is scorable.
    pub fn aligned_sentence_scores(
        &self,
        metric: &str,
        hypotheses: &[Option<String>],
        references: &[&[Option<String>]],
    ) -> Result<Vec<Option<f64>>, ScoreError> {
        let positions: Vec<usize> = hypotheses
            .iter()
            .enumerate()
            .filter(|(i, hypothesis)| {
                hypothesis.is_some()
                    && references
                        .iter()
                        .all(|channel| matches!(channel.get(*i), Some(Some(_))))
            })
            .map(|(i, _)| i)
            .collect();

        let mut aligned = vec![None; hypotheses.len()];
        if positions.is_empty() {
            self.resolve(metric)?;
            return Ok(aligned);
        }

        let present = |items: &[Option<String>]| -> Vec<String> {
            positions
                .iter()
                .filter_map(|&i| items.get(i).cloned().flatten())
                .collect()
        };
        let hyps = present(hypotheses);
        let refs: Vec<Vec<String>> = references.iter().map(|&channel| present(channel)).collect();

        let scores = self.sentence_scores(metric, &hyps, &refs)?;
        for (&i, score) in positions.iter().zip(scores) {
            aligned[i] = Some(score);
        }
        Ok(aligned)
    }
}

/// Round to two decimals, ties to even
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Page scores indexed by (metric, model, example).
///
/// Stored densely with axis order metric, model, example. An example is
/// `None` for a model when that model has no hypothesis for it or a
/// reference channel has no item for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreCube {
    metrics: Vec<String>,
    models: Vec<String>,
    n_examples: usize,
    values: Vec<Option<f64>>,
}

impl ScoreCube {
    /// Score every model on the page for every metric, rounded for display.
    ///
    /// `hypotheses` and `references` are already sliced to the page, one
    /// slot per page position.
    ///
    /// # Errors
    ///
    /// Propagates scorer errors, including unknown metric ids.
    pub fn compute(
        registry: &ScorerRegistry,
        metrics: &[String],
        hypotheses: &[PageColumn],
        references: &[PageColumn],
        n_examples: usize,
    ) -> Result<Self, ScoreError> {
        let models: Vec<String> = hypotheses.iter().map(|h| h.name.clone()).collect();
        let refs: Vec<&[Option<String>]> = references.iter().map(|r| r.items.as_slice()).collect();
        let mut values = vec![None; metrics.len() * models.len() * n_examples];

        for (m, metric) in metrics.iter().enumerate() {
            registry.resolve(metric)?;
            if n_examples == 0 {
                continue;
            }
            for (k, model) in hypotheses.iter().enumerate() {
                let scores = registry.aligned_sentence_scores(metric, &model.items, &refs)?;
                let base = (m * models.len() + k) * n_examples;
                for (i, score) in scores.into_iter().take(n_examples).enumerate() {
                    values[base + i] = score.map(round2);
                }
            }
        }

        Ok(Self {
            metrics: metrics.to_vec(),
            models,
            n_examples,
            values,
        })
    }

    /// Score of one model on one page example
    #[must_use]
    pub fn get(&self, metric: &str, model: &str, example: usize) -> Option<f64> {
        let m = self.metrics.iter().position(|x| x == metric)?;
        let k = self.models.iter().position(|x| x == model)?;
        if example >= self.n_examples {
            return None;
        }
        self.values[(m * self.models.len() + k) * self.n_examples + example]
    }

    /// All scores of one model for one metric, in page order
    #[must_use]
    pub fn series(&self, metric: &str, model: &str) -> Option<&[Option<f64>]> {
        let m = self.metrics.iter().position(|x| x == metric)?;
        let k = self.models.iter().position(|x| x == model)?;
        let base = (m * self.models.len() + k) * self.n_examples;
        Some(&self.values[base..base + self.n_examples])
    }

    /// Nested `metric -> model -> score` view of one page example
    #[must_use]
    pub fn example(&self, example: usize) -> BTreeMap<String, BTreeMap<String, f64>> {
        self.metrics
            .iter()
            .map(|metric| {
                let per_model = self
                    .models
                    .iter()
                    .filter_map(|model| {
                        self.get(metric, model, example)
                            .map(|score| (model.clone(), score))
                    })
                    .collect();
                (metric.clone(), per_model)
            })
            .collect()
    }

    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.models
    }

    #[must_use]
    pub const fn n_examples(&self) -> usize {
        self.n_examples
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
