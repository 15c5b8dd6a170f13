//! Rendering and annotation capabilities.
//!
//! Alignment highlighters and language detectors live outside the crate.
//! They plug in here and must keep the shape of what they are given: one
//! output row per input row, one output slot per input slot. An empty slot
//! stays empty so every later slot keeps its example.

use crate::source::PageColumn;
use std::collections::BTreeMap;

/// Turns raw page slices into display-ready structures
pub trait Renderer: Send + Sync {
    /// Source rows (one per example, one item per channel).
    ///
    /// `text_indices` marks which channel positions carry text.
    fn render_source(&self, rows: &[Vec<String>], text_indices: &[usize]) -> Vec<Vec<String>>;

    /// Reference channels aligned against the main source text of the page.
    fn render_references(
        &self,
        src_text: &[String],
        references: &[PageColumn],
        main_text_idx: usize,
    ) -> Vec<PageColumn>;

    /// Hypotheses of every model aligned against one reference column
    fn render_hypotheses(
        &self,
        reference: &[Option<String>],
        hypotheses: &[PageColumn],
    ) -> Vec<PageColumn>;

    /// One example's `model -> score` dictionary for a single metric
    fn render_scores(&self, scores: &[(&str, f64)]) -> String;
}

/// Renderer that leaves text untouched and prints scores as `model: 0.00`
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render_source(&self, rows: &[Vec<String>], _text_indices: &[usize]) -> Vec<Vec<String>> {
        rows.to_vec()
    }

    fn render_references(
        &self,
        _src_text: &[String],
        references: &[PageColumn],
        _main_text_idx: usize,
    ) -> Vec<PageColumn> {
        references.to_vec()
    }

    fn render_hypotheses(
        &self,
        _reference: &[Option<String>],
        hypotheses: &[PageColumn],
    ) -> Vec<PageColumn> {
        hypotheses.to_vec()
    }

    fn render_scores(&self, scores: &[(&str, f64)]) -> String {
        scores
            .iter()
            .map(|(model, score)| format!("{model}: {score:.2}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Language identification for a single sentence
pub trait LanguageTagger: Send + Sync {
    /// Language tag (ISO 639-1 or similar) of `text`
    fn tag_language(&self, text: &str) -> String;
}

/// Rendered score dictionaries of one example, keyed by metric
pub type RenderedScores = BTreeMap<String, String>;
