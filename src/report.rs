//! Page report rendering.
//!
//! Wraps a [`PageData`] with generation metadata and renders it as JSON,
//! markdown or a plain-text table, for logs, snapshots and terminal previews.

use crate::config::PageRequest;
use crate::paginate::page_count;
use crate::source::enumerate_rows;
use crate::view::PageData;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as FmtWrite;
use tabled::{Table, Tabled};

/// Page with request echo and metadata
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// The request that produced the page
    pub request: PageRequest,
    /// Page contents
    pub page: PageData,
}

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Crate version
    pub version: String,
    /// Pages available at the page size actually served
    pub total_pages: usize,
}

/// Table row for text/markdown output
#[derive(Tabled)]
struct ExampleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Hypotheses")]
    hypotheses: String,
    #[tabled(rename = "Scores")]
    scores: String,
}

impl PageReport {
    /// Build a report for a page
    #[must_use]
    pub fn new(title: &str, request: &PageRequest, page: PageData) -> Self {
        Self {
            metadata: ReportMetadata {
                title: title.to_string(),
                generated_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                total_pages: page_count(page.candidates, page.page_size),
            },
            request: request.clone(),
            page,
        }
    }

    /// Render report as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render report as markdown
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        writeln!(output, "# {}", self.metadata.title).ok();
        writeln!(output).ok();
        writeln!(
            output,
            "**Generated:** {}",
            self.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .ok();
        writeln!(output, "**Version:** {}", self.metadata.version).ok();
        writeln!(output).ok();

        writeln!(output, "## Summary").ok();
        writeln!(output).ok();
        writeln!(output, "| Field | Value |").ok();
        writeln!(output, "|-------|-------|").ok();
        writeln!(
            output,
            "| Page | {} / {} |",
            self.request.page_no, self.metadata.total_pages
        )
        .ok();
        writeln!(output, "| On Page | {} |", self.page.examples_on_page).ok();
        writeln!(output, "| Candidates | {} |", self.page.candidates).ok();
        writeln!(output, "| Total Examples | {} |", self.page.total_examples).ok();
        if !self.request.query.is_empty() {
            writeln!(output, "| Query | `{}` |", self.request.query).ok();
        }
        writeln!(output, "| Sorting | {:?} |", self.request.sorting).ok();
        writeln!(output).ok();

        writeln!(output, "## Examples").ok();
        writeln!(output).ok();
        writeln!(output, "{}", Table::new(self.rows())).ok();

        output
    }

    /// Render report as plain text table
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        writeln!(
            output,
            "═══════════════════════════════════════════════════════════════"
        )
        .ok();
        writeln!(output, "  {}", self.metadata.title).ok();
        writeln!(
            output,
            "═══════════════════════════════════════════════════════════════"
        )
        .ok();
        writeln!(
            output,
            "  Page {} of {}: {} shown, {} candidates, {} total",
            self.request.page_no,
            self.metadata.total_pages,
            self.page.examples_on_page,
            self.page.candidates,
            self.page.total_examples
        )
        .ok();
        writeln!(output).ok();
        writeln!(output, "{}", Table::new(self.rows())).ok();

        output
    }

    fn rows(&self) -> Vec<ExampleRow> {
        let page = &self.page;
        enumerate_rows(&page.indices)
            .into_iter()
            .map(|(i, index)| ExampleRow {
                index,
                source: page
                    .source_text
                    .as_ref()
                    .and_then(|text| text.get(i))
                    .cloned()
                    .unwrap_or_default(),
                reference: page
                    .references
                    .iter()
                    .filter_map(|channel| channel.get(i))
                    .collect::<Vec<_>>()
                    .join("\n"),
                hypotheses: page
                    .hypothesis_view
                    .iter()
                    .filter_map(|model| model.get(i).map(|h| format!("{}: {h}", model.name)))
                    .collect::<Vec<_>>()
                    .join("\n"),
                scores: page
                    .score_view
                    .get(i)
                    .map(|per_metric| {
                        per_metric
                            .iter()
                            .map(|(metric, rendered)| format!("{metric}: {rendered}"))
                            .collect::<Vec<_>>()
                            .join("\n")
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }
}
