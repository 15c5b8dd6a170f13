//! Candidate ordering strategies.
//!
//! Every strategy returns a permutation of its input. Length, alphabetical
//! and metric orders are stable, so equal keys keep their filtered order.

use crate::scoring::{ScoreError, ScorerRegistry};
use crate::source::{select_aligned, DataSource, ModelOutputs};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Sorting selector code or name that matches no strategy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown sorting type: {0}")]
pub struct UnknownSorting(pub String);

/// Ordering applied to the candidates before pagination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortingType {
    /// Keep the filtered (corpus) order
    #[default]
    None,
    /// Uniform random permutation
    Random,
    /// Reference length, shortest first
    RefLen,
    /// Reference text, lexicographic
    RefAlphabetical,
    /// Source length, shortest first
    SrcLen,
    /// Source text, lexicographic
    SrcAlphabetical,
    /// Mean sentence score across models, best first
    Metric,
    /// Score spread across models, largest disagreement first
    MetricDiff,
}

impl SortingType {
    /// All strategies in code order
    pub const ALL: [Self; 8] = [
        Self::None,
        Self::Random,
        Self::RefLen,
        Self::RefAlphabetical,
        Self::SrcLen,
        Self::SrcAlphabetical,
        Self::Metric,
        Self::MetricDiff,
    ];

    /// Numeric selector used by front ends
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Random => 1,
            Self::RefLen => 2,
            Self::RefAlphabetical => 3,
            Self::SrcLen => 4,
            Self::SrcAlphabetical => 5,
            Self::Metric => 6,
            Self::MetricDiff => 7,
        }
    }

    /// Whether this strategy scores the candidate set
    #[must_use]
    pub const fn needs_scores(self) -> bool {
        matches!(self, Self::Metric | Self::MetricDiff)
    }
}

impl TryFrom<i64> for SortingType {
    type Error = UnknownSorting;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|s| i64::from(s.code()) == code)
            .ok_or_else(|| UnknownSorting(code.to_string()))
    }
}

impl std::str::FromStr for SortingType {
    type Err = UnknownSorting;

    /// Parse a strategy name or numeric code
    ///
    /// # Errors
    ///
    /// Returns `UnknownSorting` if the string names no strategy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.trim().parse::<i64>() {
            return Self::try_from(code);
        }
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "none" | "original" => Ok(Self::None),
            "random" => Ok(Self::Random),
            "ref_len" => Ok(Self::RefLen),
            "ref_alphabetical" => Ok(Self::RefAlphabetical),
            "src_len" => Ok(Self::SrcLen),
            "src_alphabetical" => Ok(Self::SrcAlphabetical),
            "metric" => Ok(Self::Metric),
            "metric_diff" => Ok(Self::MetricDiff),
            _ => Err(UnknownSorting(s.to_string())),
        }
    }
}

/// Data the strategies may need
#[derive(Debug, Clone, Copy)]
pub struct SortContext<'a> {
    pub src: &'a DataSource,
    pub reference: &'a DataSource,
    pub hypo: &'a ModelOutputs,
    pub registry: &'a ScorerRegistry,
    /// Metric id for `Metric` and `MetricDiff`
    pub metric: &'a str,
}

/// Reorder the candidates with the selected strategy.
///
/// Length and alphabetical orders on a source or reference without text,
/// and metric orders on an unregistered metric, leave the order unchanged.
///
/// # Errors
///
/// Propagates scorer failures from the metric strategies.
pub fn apply_sorting<R: Rng + ?Sized>(
    sorting: SortingType,
    indices: Vec<usize>,
    ctx: &SortContext<'_>,
    rng: &mut R,
) -> Result<Vec<usize>, ScoreError> {
    let sorted = match sorting {
        SortingType::None => indices,
        SortingType::Random => shuffle(&indices, rng),
        SortingType::RefLen => match ctx.reference.main_text() {
            Some(text) => by_length(text, &indices),
            None => indices,
        },
        SortingType::RefAlphabetical => match ctx.reference.main_text() {
            Some(text) => alphabetical(text, &indices),
            None => indices,
        },
        SortingType::SrcLen => match ctx.src.main_text() {
            Some(text) => by_length(text, &indices),
            None => indices,
        },
        SortingType::SrcAlphabetical => match ctx.src.main_text() {
            Some(text) => alphabetical(text, &indices),
            None => indices,
        },
        SortingType::Metric | SortingType::MetricDiff => {
            if !ctx.registry.contains(ctx.metric) {
                tracing::warn!(
                    metric = %ctx.metric,
                    "Sorting metric is not registered, keeping filtered order"
                );
                return Ok(indices);
            }
            let scores = candidate_scores(ctx, &indices)?;
            if sorting == SortingType::Metric {
                by_metric(&scores, &indices)
            } else {
                by_metric_diff(&scores, &indices)
            }
        }
    };

    tracing::debug!(sorting = ?sorting, candidates = sorted.len(), "Candidates sorted");
    Ok(sorted)
}

/// Sentence scores of every model over the whole candidate set.
///
/// Outer index is the model, inner index the candidate position. A slot is
/// `None` where the model or a reference channel does not reach that
/// candidate.
///
/// # Errors
///
/// Propagates scorer failures.
pub fn candidate_scores(
    ctx: &SortContext<'_>,
    indices: &[usize],
) -> Result<Vec<Vec<Option<f64>>>, ScoreError> {
    let references: Vec<Vec<Option<String>>> = ctx
        .reference
        .text()
        .map(|channel| select_aligned(&channel.items, indices))
        .collect();
    let references: Vec<&[Option<String>]> = references.iter().map(Vec::as_slice).collect();

    ctx.hypo
        .models()
        .iter()
        .map(|model| {
            let hypotheses = select_aligned(&model.items, indices);
            ctx.registry
                .aligned_sentence_scores(ctx.metric, &hypotheses, &references)
        })
        .collect()
}

/// Uniform random permutation
pub fn shuffle<R: Rng + ?Sized>(indices: &[usize], rng: &mut R) -> Vec<usize> {
    let mut shuffled = indices.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Shortest text first, by whitespace token count. Missing text sorts last.
#[must_use]
pub fn by_length(text: &[String], indices: &[usize]) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_by_key(|&i| {
        text.get(i)
            .map_or(usize::MAX, |t| t.split_whitespace().count())
    });
    sorted
}

/// Lexicographic text order. Missing text sorts last.
#[must_use]
pub fn alphabetical(text: &[String], indices: &[usize]) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| match (text.get(a), text.get(b)) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

/// Mean score across models, highest first. Candidates no model scored go last.
#[must_use]
pub fn by_metric(scores: &[Vec<Option<f64>>], indices: &[usize]) -> Vec<usize> {
    order_by_key(indices, |pos| {
        let values = scores_at(scores, pos);
        if values.is_empty() {
            return f64::NEG_INFINITY;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        values.iter().sum::<f64>() / n
    })
}

/// Spread (max - min) across models, largest first. Candidates no model
/// scored go last.
#[must_use]
pub fn by_metric_diff(scores: &[Vec<Option<f64>>], indices: &[usize]) -> Vec<usize> {
    order_by_key(indices, |pos| {
        let values = scores_at(scores, pos);
        if values.is_empty() {
            return f64::NEG_INFINITY;
        }
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        max - min
    })
}

fn scores_at(scores: &[Vec<Option<f64>>], pos: usize) -> Vec<f64> {
    scores
        .iter()
        .filter_map(|series| series.get(pos).copied().flatten())
        .filter(|v| !v.is_nan())
        .collect()
}

/// Stable descending order of candidate positions by `key`
fn order_by_key<F: Fn(usize) -> f64>(indices: &[usize], key: F) -> Vec<usize> {
    let keys: Vec<f64> = (0..indices.len()).map(key).collect();
    let mut positions: Vec<usize> = (0..indices.len()).collect();
    positions.sort_by(|&a, &b| keys[b].partial_cmp(&keys[a]).unwrap_or(Ordering::Equal));
    positions.into_iter().map(|p| indices[p]).collect()
}
