//! Parallel data sources for the viewer.
//!
//! A [`DataSource`] bundles one or more channels aligned by example index:
//! source sentences in several language variants, image paths next to their
//! captions, one reference per channel, and so on. [`ModelOutputs`] is the
//! same structure where every channel holds one model's hypotheses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building a data source
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SourceError {
    #[error("Channel {name} has {actual} items, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Main text index {index} out of range ({text_channels} text channels)")]
    MainTextOutOfRange { index: usize, text_channels: usize },

    #[error("Duplicate model name: {0}")]
    DuplicateModel(String),
}

/// Kind of content carried by a channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Plain text, one sentence per example
    #[default]
    Text,
    /// Image path or URL
    Image,
    /// Audio path or URL
    Audio,
    /// Video path or URL
    Video,
}

/// One named column of per-example items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Channel name (language code, model id, file stem...)
    pub name: String,
    /// Content kind
    #[serde(default)]
    pub kind: ChannelKind,
    /// Items aligned by example index
    pub items: Vec<String>,
}

impl Channel {
    /// Create a text channel
    #[must_use]
    pub fn text(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Text,
            items,
        }
    }

    /// Create a channel of the given kind
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ChannelKind, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            items,
        }
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the channel is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self.kind, ChannelKind::Text)
    }
}

/// Parallel channels sharing one example index space
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DataSource {
    channels: Vec<Channel>,
    /// Position of the main channel among the text channels
    main_text_idx: usize,
}

impl DataSource {
    /// Build a data source, checking that every channel has the same length.
    ///
    /// The main text channel defaults to the first text channel.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::LengthMismatch` if channel lengths differ.
    pub fn new(channels: Vec<Channel>) -> Result<Self, SourceError> {
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().find(|c| c.len() != expected) {
                return Err(SourceError::LengthMismatch {
                    name: bad.name.clone(),
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self {
            channels,
            main_text_idx: 0,
        })
    }

    /// Single text channel source
    #[must_use]
    pub fn from_texts(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            channels: vec![Channel::text(name, items)],
            main_text_idx: 0,
        }
    }

    /// Source with no channels at all
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Choose which text channel is the main one.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::MainTextOutOfRange` if there is no such text channel.
    pub fn with_main_text(mut self, index: usize) -> Result<Self, SourceError> {
        let text_channels = self.text_indices().len();
        if index >= text_channels {
            return Err(SourceError::MainTextOutOfRange {
                index,
                text_channels,
            });
        }
        self.main_text_idx = index;
        Ok(self)
    }

    /// Number of examples
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Channel::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All channels, text or not
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Whether any channel carries text
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.channels.iter().any(Channel::is_text)
    }

    /// Positions of the text channels among all channels
    #[must_use]
    pub fn text_indices(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_text())
            .map(|(i, _)| i)
            .collect()
    }

    /// Text channels in channel order
    pub fn text(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.is_text())
    }

    /// Names of the text channels
    #[must_use]
    pub fn text_names(&self) -> Vec<&str> {
        self.text().map(|c| c.name.as_str()).collect()
    }

    /// Position of the main channel among the text channels
    #[must_use]
    pub const fn main_text_index(&self) -> usize {
        self.main_text_idx
    }

    /// Items of the main text channel, `None` if there is no text
    #[must_use]
    pub fn main_text(&self) -> Option<&[String]> {
        self.text()
            .nth(self.main_text_idx)
            .map(|c| c.items.as_slice())
    }

    /// Per-example rows across every channel for the given indices.
    ///
    /// Indices past the end are skipped.
    #[must_use]
    pub fn cached(&self, indices: &[usize]) -> Vec<Vec<String>> {
        indices
            .iter()
            .filter(|&&i| i < self.len())
            .map(|&i| self.channels.iter().map(|c| c.items[i].clone()).collect())
            .collect()
    }
}

/// Hypotheses of several models over the same examples
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ModelOutputs {
    source: DataSource,
}

impl ModelOutputs {
    /// Build from `(model name, hypotheses)` pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate model names or differing lengths.
    pub fn new<I, S>(models: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let mut channels: Vec<Channel> = Vec::new();
        for (name, items) in models {
            let name = name.into();
            if channels.iter().any(|c| c.name == name) {
                return Err(SourceError::DuplicateModel(name));
            }
            channels.push(Channel::text(name, items));
        }
        Ok(Self {
            source: DataSource::new(channels)?,
        })
    }

    /// Model identifiers in stable order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.source.text_names()
    }

    /// One channel per model
    #[must_use]
    pub fn models(&self) -> &[Channel] {
        self.source.channels()
    }

    /// Hypotheses of one model
    #[must_use]
    pub fn hypotheses(&self, name: &str) -> Option<&[String]> {
        self.source
            .channels()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.items.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Underlying data source
    #[must_use]
    pub const fn as_source(&self) -> &DataSource {
        &self.source
    }
}

/// One channel sliced to a page.
///
/// `items[k]` belongs to the `k`-th example on the page and is `None` when
/// the channel ends before that example.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageColumn {
    /// Channel name
    pub name: String,
    /// Content kind
    pub kind: ChannelKind,
    /// One slot per page position
    pub items: Vec<Option<String>>,
}

impl PageColumn {
    /// Slice a channel at the given corpus indices
    #[must_use]
    pub fn slice(channel: &Channel, indices: &[usize]) -> Self {
        Self {
            name: channel.name.clone(),
            kind: channel.kind,
            items: select_aligned(&channel.items, indices),
        }
    }

    /// Build a text column from page slots
    #[must_use]
    pub fn text(name: impl Into<String>, items: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Text,
            items,
        }
    }

    /// Item at a page position, if the channel covers it
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&str> {
        self.items.get(position).and_then(Option::as_deref)
    }

    /// Number of page positions the channel covers
    #[must_use]
    pub fn present(&self) -> usize {
        self.items.iter().filter(|item| item.is_some()).count()
    }
}

/// Pick `items[i]` for every index, skipping indices past the end.
///
/// Only for lists known to cover the indices, such as the main text of the
/// source the candidates were drawn from. Use [`select_aligned`] for any
/// list that may be shorter.
#[must_use]
pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices
        .iter()
        .filter_map(|&i| items.get(i).cloned())
        .collect()
}

/// Pick `items[i]` for every index, keeping one slot per index.
///
/// Parallel lists may be shorter than the corpus (tags, partial model
/// outputs, references). Indices past the end give `None` so later slots
/// stay with their own example.
#[must_use]
pub fn select_aligned<T: Clone>(items: &[T], indices: &[usize]) -> Vec<Option<T>> {
    indices.iter().map(|&i| items.get(i).cloned()).collect()
}

/// Pair every row with its position, for numbered table display
#[must_use]
pub fn enumerate_rows<T: Clone>(rows: &[T]) -> Vec<(usize, T)> {
    rows.iter().cloned().enumerate().collect()
}
