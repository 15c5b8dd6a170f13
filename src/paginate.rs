//! Page bounds over the candidate list.

use thiserror::Error;

/// Invalid pagination parameters
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    #[error("Page size must be positive")]
    ZeroPageSize,

    #[error("Page number must be positive (pages are 1-based)")]
    ZeroPageNumber,
}

/// Inclusive `(start, end)` positions of a page.
///
/// `start = min(size * (no - 1), n - 1)` and `end = max(size * no - 1, start)`,
/// with `end` clipped to the last candidate. A page past the end therefore
/// saturates to the last candidate instead of going out of bounds. Returns
/// `None` when there are no candidates.
///
/// # Errors
///
/// Returns an error if `page_size` or `page_no` is zero.
pub fn page_bounds(
    n_items: usize,
    page_size: usize,
    page_no: usize,
) -> Result<Option<(usize, usize)>, PaginationError> {
    if page_size == 0 {
        return Err(PaginationError::ZeroPageSize);
    }
    if page_no == 0 {
        return Err(PaginationError::ZeroPageNumber);
    }
    if n_items == 0 {
        return Ok(None);
    }

    let last = n_items - 1;
    let start = page_size.saturating_mul(page_no - 1).min(last);
    let end = page_size
        .saturating_mul(page_no)
        .saturating_sub(1)
        .max(start)
        .min(last);
    Ok(Some((start, end)))
}

/// The candidates that land on the requested page
///
/// # Errors
///
/// Returns an error if `page_size` or `page_no` is zero.
pub fn paginate(
    candidates: &[usize],
    page_size: usize,
    page_no: usize,
) -> Result<Vec<usize>, PaginationError> {
    Ok(page_bounds(candidates.len(), page_size, page_no)?
        .map_or_else(Vec::new, |(start, end)| candidates[start..=end].to_vec()))
}

/// Number of pages needed to show every candidate
#[must_use]
pub const fn page_count(n_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        n_items.div_ceil(page_size)
    }
}
