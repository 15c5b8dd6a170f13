//! Query filtering over a text channel.

/// Text filtering capability.
///
/// Returns the ascending positions of the items that match `query`. An empty
/// query matches everything.
pub trait TextFilter: Send + Sync {
    fn filter(&self, items: &[String], query: &str) -> Vec<usize>;
}

/// Substring match, optionally ignoring case
#[derive(Debug, Clone, Copy)]
pub struct SubstringFilter {
    case_sensitive: bool,
}

impl SubstringFilter {
    #[must_use]
    pub const fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl Default for SubstringFilter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TextFilter for SubstringFilter {
    fn filter(&self, items: &[String], query: &str) -> Vec<usize> {
        if query.is_empty() {
            return (0..items.len()).collect();
        }

        if self.case_sensitive {
            return items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.contains(query))
                .map(|(i, _)| i)
                .collect();
        }

        let needle = query.to_lowercase();
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }
}
