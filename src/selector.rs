//! Candidate index selection: query filter, then tag filter.

use crate::filter::TextFilter;
use crate::source::DataSource;

/// Number of examples in the corpus.
///
/// The source defines the corpus; an absent source (no channels) defers to
/// the reference.
#[must_use]
pub fn corpus_len(src: &DataSource, reference: &DataSource) -> usize {
    if src.channels().is_empty() {
        reference.len()
    } else {
        src.len()
    }
}

/// Select the candidate indices for a request.
///
/// The query runs against the source's main text, or the reference's main
/// text when the source carries none. With no text anywhere every corpus
/// index is a candidate. Candidates never reach past [`corpus_len`].
///
/// When `filter_by_tags` is set, `tag_mask` is aligned with the *query-filtered*
/// list: entry `k` keeps or drops the `k`-th surviving candidate, not corpus
/// index `k`. A mask shorter than the candidate list drops the tail.
#[must_use]
pub fn select_candidates(
    src: &DataSource,
    reference: &DataSource,
    query: &str,
    tag_mask: &[bool],
    filter_by_tags: bool,
    filter: &dyn TextFilter,
) -> Vec<usize> {
    let candidates = match (src.main_text(), reference.main_text()) {
        (Some(text), _) => filter.filter(text, query),
        (None, Some(text)) => {
            let n = corpus_len(src, reference);
            filter
                .filter(text, query)
                .into_iter()
                .filter(|&idx| idx < n)
                .collect()
        }
        (None, None) => (0..corpus_len(src, reference)).collect(),
    };

    if !filter_by_tags {
        return candidates;
    }

    if tag_mask.len() != candidates.len() {
        tracing::warn!(
            mask_len = tag_mask.len(),
            candidates = candidates.len(),
            "Tag mask length differs from query-filtered candidate count"
        );
    }

    candidates
        .into_iter()
        .zip(tag_mask.iter())
        .filter(|(_, &keep)| keep)
        .map(|(idx, _)| idx)
        .collect()
}
