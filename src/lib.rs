//! # seqview
//!
//! Page compiler for sequence-generation evaluation viewers.
//!
//! Given parallel corpora (sources, references, and the hypotheses of several
//! models) and a page request, builds everything a front end needs to draw one
//! page of examples: which examples, in what order, with their sentence-level
//! scores and rendered views.
//!
//! ## Architecture
//!
//! ```text
//! PageRequest + (source, reference, hypotheses)
//!        ↓
//! Index Selector (query filter, tag mask)
//!        ↓
//! Sorter (original, random, length, alphabetical, metric, metric spread)
//!        ↓
//! Paginator (1-based pages, clamped size)
//!        ↓
//! Scoring Aggregator (metric × model × example cube, 2 decimals)
//!        ↓
//! Page Assembler (rendering, language tags) → PageData → PageReport
//! ```
//!
//! Scoring, alignment rendering and language identification are pluggable
//! through [`Scorer`], [`Renderer`] and [`LanguageTagger`].

pub mod config;
pub mod filter;
pub mod paginate;
pub mod render;
pub mod report;
pub mod scoring;
pub mod selector;
pub mod sorting;
pub mod source;
pub mod view;

pub use config::{ConfigError, PageRequest, ViewConfig, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use filter::{SubstringFilter, TextFilter};
pub use paginate::{page_bounds, page_count, paginate, PaginationError};
pub use render::{LanguageTagger, PlainRenderer, RenderedScores, Renderer};
pub use report::{PageReport, ReportMetadata};
pub use scoring::{
    round2, ScoreCube, ScoreError, ScoreLevel, ScoreOutput, Scorer, ScorerRegistry,
};
pub use selector::{corpus_len, select_candidates};
pub use sorting::{apply_sorting, SortContext, SortingType, UnknownSorting};
pub use source::{
    enumerate_rows, select, select_aligned, Channel, ChannelKind, DataSource, ModelOutputs,
    PageColumn, SourceError,
};
pub use view::{PageData, PageError, PageView};
