//! Page assembly.
//!
//! [`PageView::get`] turns one [`PageRequest`] into one [`PageData`]:
//!
//! ```text
//! query filter ─→ tag filter ─→ sort ─→ paginate ─→ slice sources
//!                                 │                      │
//!                     (full-set scoring for          page scores
//!                      metric orderings)                 │
//!                                                    rendering ─→ PageData
//! ```
//!
//! The view holds only read-only capabilities, so one instance can serve
//! concurrent requests over shared corpora.

use crate::config::{PageRequest, ViewConfig};
use crate::filter::{SubstringFilter, TextFilter};
use crate::paginate::{paginate, PaginationError};
use crate::render::{LanguageTagger, PlainRenderer, RenderedScores, Renderer};
use crate::scoring::{ScoreCube, ScoreError, ScorerRegistry};
use crate::selector::{corpus_len, select_candidates};
use crate::sorting::{apply_sorting, SortContext};
use crate::source::{select, select_aligned, DataSource, ModelOutputs, PageColumn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while building a page
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Invalid pagination: {0}")]
    Pagination(#[from] PaginationError),

    #[error("Scoring failed: {0}")]
    Score(#[from] ScoreError),
}

/// Everything a front end needs to draw one page.
///
/// Every per-example list is indexed by page position, in the order of
/// `indices`. Lists drawn from parallel inputs that may be shorter than the
/// corpus (references, hypotheses, tags, language tags) keep a `None` slot
/// where their input ends.
#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    /// Rendered source rows
    pub source_view: Vec<Vec<String>>,
    /// Rendered reference channels
    pub reference_view: Vec<PageColumn>,
    /// Rendered hypotheses, one column per model
    pub hypothesis_view: Vec<PageColumn>,
    /// Raw source rows (one per example, one item per channel)
    pub source_rows: Vec<Vec<String>>,
    /// Raw main source text, if the source has text
    pub source_text: Option<Vec<String>>,
    /// Raw reference text channels
    pub references: Vec<PageColumn>,
    /// Corpus indices shown on the page, in display order
    pub indices: Vec<usize>,
    /// Per-example tags, empty when the request carries none
    pub tags: Vec<Option<String>>,
    /// Rendered `metric -> scores` per example
    pub score_view: Vec<RenderedScores>,
    /// Page scores
    pub scores: ScoreCube,
    /// Reference language per example, when requested
    pub target_langs: Option<Vec<Option<String>>>,
    /// Page size after clamping to the view's maximum
    pub page_size: usize,
    /// Examples on this page
    pub examples_on_page: usize,
    /// Candidates after query and tag filtering
    pub candidates: usize,
    /// Examples in the corpus
    pub total_examples: usize,
}

/// Builds pages over parallel corpora
pub struct PageView {
    config: ViewConfig,
    registry: ScorerRegistry,
    filter: Box<dyn TextFilter>,
    renderer: Box<dyn Renderer>,
    tagger: Option<Box<dyn LanguageTagger>>,
}

impl std::fmt::Debug for PageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageView")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("has_tagger", &self.tagger.is_some())
            .finish_non_exhaustive()
    }
}

impl PageView {
    /// Create a view with default configuration
    #[must_use]
    pub fn new(registry: ScorerRegistry) -> Self {
        Self::with_config(ViewConfig::default(), registry)
    }

    /// Create a view with custom configuration
    #[must_use]
    pub fn with_config(config: ViewConfig, registry: ScorerRegistry) -> Self {
        let filter = SubstringFilter::new(config.case_sensitive_query);
        Self {
            config,
            registry,
            filter: Box::new(filter),
            renderer: Box::new(PlainRenderer),
            tagger: None,
        }
    }

    /// Replace the query filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl TextFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Replace the renderer
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Attach a language tagger
    #[must_use]
    pub fn with_tagger(mut self, tagger: impl LanguageTagger + 'static) -> Self {
        self.tagger = Some(Box::new(tagger));
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ViewConfig {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &ScorerRegistry {
        &self.registry
    }

    /// Build one page.
    ///
    /// The random ordering uses the configured seed, or fresh entropy when
    /// none is set.
    ///
    /// # Errors
    ///
    /// Returns an error on a zero page size or number, or when page scoring
    /// fails (including unknown page metric ids).
    pub fn get(
        &self,
        request: &PageRequest,
        src: &DataSource,
        reference: &DataSource,
        hypo: &ModelOutputs,
    ) -> Result<PageData, PageError> {
        let mut rng = self
            .config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        self.get_with_rng(request, src, reference, hypo, &mut rng)
    }

    /// Build one page with an explicit random source
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_with_rng<R: Rng + ?Sized>(
        &self,
        request: &PageRequest,
        src: &DataSource,
        reference: &DataSource,
        hypo: &ModelOutputs,
        rng: &mut R,
    ) -> Result<PageData, PageError> {
        if request.page_size == 0 {
            return Err(PaginationError::ZeroPageSize.into());
        }
        if request.page_no == 0 {
            return Err(PaginationError::ZeroPageNumber.into());
        }
        let page_size = request.page_size.min(self.config.max_page_size);

        let candidates = select_candidates(
            src,
            reference,
            &request.query,
            &request.is_tag_selected,
            request.filter_by_tags,
            self.filter.as_ref(),
        );
        let n_candidates = candidates.len();
        tracing::debug!(
            query = %request.query,
            filter_by_tags = request.filter_by_tags,
            candidates = n_candidates,
            "Candidates selected"
        );

        let ctx = SortContext {
            src,
            reference,
            hypo,
            registry: &self.registry,
            metric: &request.sorting_metric,
        };
        let sorted = apply_sorting(request.sorting, candidates, &ctx, rng)?;

        let indices = paginate(&sorted, page_size, request.page_no)?;
        let n_page = indices.len();

        let source_rows = src.cached(&indices);
        let source_text = src.main_text().map(|text| select(text, &indices));
        let references: Vec<PageColumn> = reference
            .text()
            .map(|channel| PageColumn::slice(channel, &indices))
            .collect();
        let hypotheses: Vec<PageColumn> = hypo
            .models()
            .iter()
            .map(|model| PageColumn::slice(model, &indices))
            .collect();

        let scores = ScoreCube::compute(
            &self.registry,
            &request.metrics,
            &hypotheses,
            &references,
            n_page,
        )?;

        let render_alignment = !request.disable_alignment;
        let source_view = if render_alignment {
            self.renderer.render_source(&source_rows, &src.text_indices())
        } else {
            source_rows.clone()
        };
        let reference_view = match (&source_text, render_alignment) {
            (Some(text), true) => {
                self.renderer
                    .render_references(text, &references, src.main_text_index())
            }
            _ => references.clone(),
        };
        let hypothesis_view = if render_alignment {
            let first_reference = references.first().map_or(&[][..], |r| r.items.as_slice());
            self.renderer.render_hypotheses(first_reference, &hypotheses)
        } else {
            hypotheses
        };
        let score_view = (0..n_page)
            .map(|i| self.render_example_scores(&scores, i))
            .collect();

        let target_langs = if request.need_lang_tags {
            self.tag_languages(reference, &indices)
        } else {
            None
        };

        let tags = if request.tags.is_empty() {
            Vec::new()
        } else {
            select_aligned(&request.tags, &indices)
        };

        let total_examples = corpus_len(src, reference);
        tracing::debug!(
            page_no = request.page_no,
            page_size,
            examples_on_page = n_page,
            candidates = n_candidates,
            total_examples,
            "Page assembled"
        );

        Ok(PageData {
            source_view,
            reference_view,
            hypothesis_view,
            source_rows,
            source_text,
            references,
            indices,
            tags,
            score_view,
            scores,
            target_langs,
            page_size,
            examples_on_page: n_page,
            candidates: n_candidates,
            total_examples,
        })
    }

    fn render_example_scores(&self, scores: &ScoreCube, example: usize) -> RenderedScores {
        scores
            .metrics()
            .iter()
            .map(|metric| {
                let per_model: Vec<(&str, f64)> = scores
                    .models()
                    .iter()
                    .filter_map(|model| {
                        scores
                            .get(metric, model, example)
                            .map(|score| (model.as_str(), score))
                    })
                    .collect();
                (metric.clone(), self.renderer.render_scores(&per_model))
            })
            .collect()
    }

    fn tag_languages(
        &self,
        reference: &DataSource,
        indices: &[usize],
    ) -> Option<Vec<Option<String>>> {
        let Some(tagger) = self.tagger.as_ref() else {
            tracing::warn!("Language tags requested but no tagger is attached");
            return None;
        };
        let text = reference.main_text()?;
        Some(
            select_aligned(text, indices)
                .into_iter()
                .map(|sentence| sentence.map(|s| tagger.tag_language(&s)))
                .collect(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::scoring::{ScoreLevel, ScoreOutput, Scorer};
    use crate::sorting::SortingType;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    /// 1.0 when the hypothesis equals the first reference
    struct Exact;

    impl Scorer for Exact {
        fn score(
            &self,
            hypotheses: &[String],
            references: &[Vec<String>],
            _level: ScoreLevel,
        ) -> Result<ScoreOutput, ScoreError> {
            Ok(ScoreOutput {
                corpus_score: None,
                sent_scores: hypotheses
                    .iter()
                    .zip(&references[0])
                    .map(|(h, r)| if h == r { 1.0 } else { 0.0 })
                    .collect(),
            })
        }
    }

    struct Brackets;

    impl Renderer for Brackets {
        fn render_source(&self, rows: &[Vec<String>], _text_indices: &[usize]) -> Vec<Vec<String>> {
            rows.iter()
                .map(|row| row.iter().map(|s| format!("[{s}]")).collect())
                .collect()
        }

        fn render_references(
            &self,
            _src_text: &[String],
            references: &[PageColumn],
            _main_text_idx: usize,
        ) -> Vec<PageColumn> {
            references.iter().map(bracket).collect()
        }

        fn render_hypotheses(
            &self,
            _reference: &[Option<String>],
            hypotheses: &[PageColumn],
        ) -> Vec<PageColumn> {
            hypotheses.iter().map(bracket).collect()
        }

        fn render_scores(&self, scores: &[(&str, f64)]) -> String {
            format!("{} models", scores.len())
        }
    }

    fn bracket(column: &PageColumn) -> PageColumn {
        PageColumn::text(
            column.name.clone(),
            column
                .items
                .iter()
                .map(|item| item.as_ref().map(|s| format!("[{s}]")))
                .collect(),
        )
    }

    fn slots(items: &[&str]) -> Vec<Option<String>> {
        items.iter().map(|s| Some((*s).to_string())).collect()
    }

    /// Echoes the hypothesis as its score
    struct Echo;

    impl Scorer for Echo {
        fn score(
            &self,
            hypotheses: &[String],
            _references: &[Vec<String>],
            _level: ScoreLevel,
        ) -> Result<ScoreOutput, ScoreError> {
            Ok(ScoreOutput {
                corpus_score: None,
                sent_scores: hypotheses
                    .iter()
                    .map(|h| h.parse().unwrap_or(f64::NAN))
                    .collect(),
            })
        }
    }

    struct FixedTagger;

    impl LanguageTagger for FixedTagger {
        fn tag_language(&self, _text: &str) -> String {
            "en".to_string()
        }
    }

    fn fixture() -> (DataSource, DataSource, ModelOutputs) {
        let src = DataSource::from_texts("de", texts(&["eins", "zwei", "drei"]));
        let reference = DataSource::from_texts("en", texts(&["one", "two", "three"]));
        let hypo = ModelOutputs::new(vec![
            ("good", texts(&["one", "two", "three"])),
            ("bad", texts(&["one", "too", "tree"])),
        ])
        .unwrap();
        (src, reference, hypo)
    }

    #[test]
    fn test_get_zero_page_size_fails() {
        let (src, reference, hypo) = fixture();
        let view = PageView::new(ScorerRegistry::new());
        let request = PageRequest::default().page(0, 1);
        let result = view.get(&request, &src, &reference, &hypo);
        assert!(matches!(
            result,
            Err(PageError::Pagination(PaginationError::ZeroPageSize))
        ));
    }

    #[test]
    fn test_get_zero_page_no_fails() {
        let (src, reference, hypo) = fixture();
        let view = PageView::new(ScorerRegistry::new());
        let request = PageRequest::default().page(10, 0);
        let result = view.get(&request, &src, &reference, &hypo);
        assert!(matches!(
            result,
            Err(PageError::Pagination(PaginationError::ZeroPageNumber))
        ));
    }

    #[test]
    fn test_get_clamps_page_size() {
        let texts_: Vec<String> = (0..150).map(|i| format!("s{i}")).collect();
        let src = DataSource::from_texts("en", texts_);
        let view = PageView::new(ScorerRegistry::new());
        let request = PageRequest::default().page(500, 1);
        let page = view
            .get(&request, &src, &DataSource::absent(), &ModelOutputs::default())
            .unwrap();
        assert_eq!(page.examples_on_page, 100);
        assert_eq!(page.candidates, 150);
    }

    #[test]
    fn test_get_scores_page() {
        let (src, reference, hypo) = fixture();
        let view = PageView::new(ScorerRegistry::new().with("exact", Exact));
        let request = PageRequest::default().page(2, 1).with_metrics(["exact"]);

        let page = view.get(&request, &src, &reference, &hypo).unwrap();

        assert_eq!(page.indices, vec![0, 1]);
        assert_eq!(page.scores.get("exact", "good", 1), Some(1.0));
        assert_eq!(page.scores.get("exact", "bad", 1), Some(0.0));
        assert_eq!(page.score_view[1]["exact"], "good: 1.00, bad: 0.00");
    }

    #[test]
    fn test_get_unknown_page_metric_fails() {
        let (src, reference, hypo) = fixture();
        let view = PageView::new(ScorerRegistry::new());
        let request = PageRequest::default().with_metrics(["bleu"]);
        let result = view.get(&request, &src, &reference, &hypo);
        assert!(matches!(
            result,
            Err(PageError::Score(ScoreError::UnknownMetric(ref m))) if m == "bleu"
        ));
    }

    #[test]
    fn test_get_renders_unless_disabled() {
        let (src, reference, hypo) = fixture();
        let view = PageView::new(ScorerRegistry::new()).with_renderer(Brackets);

        let rendered = view
            .get(&PageRequest::default().page(1, 1), &src, &reference, &hypo)
            .unwrap();
        assert_eq!(rendered.source_view, vec![texts(&["[eins]"])]);
        assert_eq!(rendered.reference_view[0].items, slots(&["[one]"]));
        assert_eq!(rendered.hypothesis_view[0].items, slots(&["[one]"]));
        assert_eq!(rendered.source_rows, vec![texts(&["eins"])]);

        let mut request = PageRequest::default().page(1, 1);
        request.disable_alignment = true;
        let raw = view.get(&request, &src, &reference, &hypo).unwrap();
        assert_eq!(raw.source_view, raw.source_rows);
        assert_eq!(raw.reference_view, raw.references);
        assert_eq!(raw.hypothesis_view[0].items, slots(&["one"]));
    }

    #[test]
    fn test_get_reference_rendering_needs_source_text() {
        let (_, reference, hypo) = fixture();
        let view = PageView::new(ScorerRegistry::new()).with_renderer(Brackets);
        let page = view
            .get(&PageRequest::default(), &DataSource::absent(), &reference, &hypo)
            .unwrap();
        assert_eq!(page.reference_view, page.references);
        assert_eq!(page.hypothesis_view[0].get(0), Some("[one]"));
        assert!(page.source_text.is_none());
        assert_eq!(page.total_examples, 3);
    }

    #[test]
    fn test_get_language_tags() {
        let (src, reference, hypo) = fixture();
        let mut request = PageRequest::default();
        request.need_lang_tags = true;

        let untagged = PageView::new(ScorerRegistry::new())
            .get(&request, &src, &reference, &hypo)
            .unwrap();
        assert!(untagged.target_langs.is_none());

        let tagged = PageView::new(ScorerRegistry::new())
            .with_tagger(FixedTagger)
            .get(&request, &src, &reference, &hypo)
            .unwrap();
        assert_eq!(tagged.target_langs, Some(slots(&["en", "en", "en"])));
    }

    #[test]
    fn test_get_tags_follow_page_indices() {
        let (src, reference, hypo) = fixture();
        let mut request = PageRequest::default().sorted_by(SortingType::SrcAlphabetical, "");
        request.tags = texts(&["t-eins", "t-zwei"]);

        let page = PageView::new(ScorerRegistry::new())
            .get(&request, &src, &reference, &hypo)
            .unwrap();
        // drei, eins, zwei; "drei" has no tag
        assert_eq!(page.indices, vec![2, 0, 1]);
        assert_eq!(
            page.tags,
            vec![None, Some("t-eins".to_string()), Some("t-zwei".to_string())]
        );
    }

    #[test]
    fn test_get_short_model_scores_stay_with_their_examples() {
        let src = DataSource::from_texts("en", texts(&["c", "b", "a"]));
        let reference = DataSource::from_texts("de", texts(&["r0", "r1", "r2"]));
        // hypotheses only for examples 0 and 1
        let hypo = ModelOutputs::new(vec![("m", texts(&["0.1", "0.2"]))]).unwrap();
        let view = PageView::new(ScorerRegistry::new().with("echo", Echo));
        let request = PageRequest::default()
            .with_metrics(["echo"])
            .sorted_by(SortingType::SrcAlphabetical, "");

        let page = view.get(&request, &src, &reference, &hypo).unwrap();

        assert_eq!(page.indices, vec![2, 1, 0]);
        assert_eq!(page.scores.get("echo", "m", 0), None);
        assert_eq!(page.scores.get("echo", "m", 1), Some(0.2));
        assert_eq!(page.scores.get("echo", "m", 2), Some(0.1));
        assert_eq!(
            page.hypothesis_view[0].items,
            vec![None, Some("0.2".to_string()), Some("0.1".to_string())]
        );
        assert_eq!(page.score_view[0]["echo"], "");
        assert_eq!(page.score_view[2]["echo"], "m: 0.10");
    }

    #[test]
    fn test_get_short_reference_keeps_slots() {
        let src = DataSource::from_texts("de", texts(&["c", "b", "a"]));
        let reference = DataSource::from_texts("en", texts(&["r0", "r1"]));
        let hypo = ModelOutputs::new(vec![("m", texts(&["0.5", "0.6", "0.7"]))]).unwrap();
        let view = PageView::new(ScorerRegistry::new().with("echo", Echo)).with_tagger(FixedTagger);
        let mut request = PageRequest::default()
            .with_metrics(["echo"])
            .sorted_by(SortingType::SrcAlphabetical, "");
        request.need_lang_tags = true;

        let page = view.get(&request, &src, &reference, &hypo).unwrap();

        assert_eq!(page.indices, vec![2, 1, 0]);
        assert_eq!(
            page.references[0].items,
            vec![None, Some("r1".to_string()), Some("r0".to_string())]
        );
        assert_eq!(
            page.target_langs,
            Some(vec![None, Some("en".to_string()), Some("en".to_string())])
        );
        // no reference for example 2, so it is not scored
        assert_eq!(page.scores.get("echo", "m", 0), None);
        assert_eq!(page.scores.get("echo", "m", 1), Some(0.6));
        assert_eq!(page.scores.get("echo", "m", 2), Some(0.5));
    }

    #[test]
    fn test_get_reports_clamped_page_size() {
        let src = DataSource::from_texts("en", (0..150).map(|i| format!("s{i}")).collect());
        let view = PageView::new(ScorerRegistry::new());
        let page = view
            .get(
                &PageRequest::default().page(500, 1),
                &src,
                &DataSource::absent(),
                &ModelOutputs::default(),
            )
            .unwrap();
        assert_eq!(page.page_size, 100);
    }

    #[test]
    fn test_seeded_random_sort_is_reproducible() {
        let texts_: Vec<String> = (0..40).map(|i| format!("s{i}")).collect();
        let src = DataSource::from_texts("en", texts_);
        let config = ViewConfig {
            seed: Some(3),
            ..ViewConfig::default()
        };
        let view = PageView::with_config(config, ScorerRegistry::new());
        let request = PageRequest::default()
            .page(40, 1)
            .sorted_by(SortingType::Random, "");

        let a = view.get(&request, &src, &DataSource::absent(), &ModelOutputs::default()).unwrap();
        let b = view.get(&request, &src, &DataSource::absent(), &ModelOutputs::default()).unwrap();
        assert_eq!(a.indices, b.indices);
        let mut sorted = a.indices.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..40).collect::<Vec<_>>());
    }
}
