//! Viewer configuration and page requests.
//!
//! Both load from YAML or JSON with per-field defaults, so a front end only
//! needs to send the parameters it changes.

use crate::sorting::SortingType;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON request: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Largest page the viewer will serve
pub const MAX_PAGE_SIZE: usize = 100;
/// Page size when the request omits one
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Page number when the request omits one
pub const DEFAULT_PAGE_NO: usize = 1;

const fn default_max_page_size() -> usize {
    MAX_PAGE_SIZE
}
const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
const fn default_page_no() -> usize {
    DEFAULT_PAGE_NO
}
const fn default_case_sensitive() -> bool {
    true
}

/// Settings shared by every request served by one view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewConfig {
    /// Page sizes above this are clamped
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Seed for the random sorter; fresh entropy per request when unset
    #[serde(default)]
    pub seed: Option<u64>,
    /// Whether the query filter matches case
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive_query: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            seed: None,
            case_sensitive_query: default_case_sensitive(),
        }
    }
}

impl ViewConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `max_page_size` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "max_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of one page request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    /// Examples per page, clamped to the view's maximum
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// 1-based page number
    #[serde(default = "default_page_no")]
    pub page_no: usize,
    /// Metric ids to score on the page
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Free-text query
    #[serde(default)]
    pub query: String,
    /// Ordering strategy, by name or numeric code
    #[serde(default, deserialize_with = "deserialize_sorting")]
    pub sorting: SortingType,
    /// Metric id used by the metric orderings
    #[serde(default)]
    pub sorting_metric: String,
    /// Tag every page example with its reference language
    #[serde(default)]
    pub need_lang_tags: bool,
    /// Skip alignment rendering
    #[serde(default)]
    pub disable_alignment: bool,
    /// Per-example tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tag selection mask, aligned with the query-filtered candidates
    #[serde(default)]
    pub is_tag_selected: Vec<bool>,
    /// Apply `is_tag_selected`
    #[serde(default)]
    pub filter_by_tags: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_no: default_page_no(),
            metrics: Vec::new(),
            query: String::new(),
            sorting: SortingType::None,
            sorting_metric: String::new(),
            need_lang_tags: false,
            disable_alignment: false,
            tags: Vec::new(),
            is_tag_selected: Vec::new(),
            filter_by_tags: false,
        }
    }
}

impl PageRequest {
    /// Parse a request from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed or names an unknown sorting.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a request from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or names an unknown sorting.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Request a given page
    #[must_use]
    pub const fn page(mut self, page_size: usize, page_no: usize) -> Self {
        self.page_size = page_size;
        self.page_no = page_no;
        self
    }

    /// Request an ordering
    #[must_use]
    pub fn sorted_by(mut self, sorting: SortingType, metric: impl Into<String>) -> Self {
        self.sorting = sorting;
        self.sorting_metric = metric.into();
        self
    }

    /// Request page metrics
    #[must_use]
    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    /// Filter by query
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

fn deserialize_sorting<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SortingType, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Selector {
        Code(i64),
        Name(String),
    }

    match Selector::deserialize(deserializer)? {
        Selector::Code(code) => SortingType::try_from(code).map_err(serde::de::Error::custom),
        Selector::Name(name) => name.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_view_config_default_values() {
        let config = ViewConfig::default();
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.seed, None);
        assert!(config.case_sensitive_query);
    }

    #[test]
    fn test_view_config_serialization_roundtrip() {
        let config = ViewConfig {
            seed: Some(42),
            ..ViewConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        let parsed = ViewConfig::from_yaml(&yaml).expect("deserialize");
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_view_config_rejects_zero_max() {
        let result = ViewConfig::from_yaml("max_page_size: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_view_config_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_page_size: 50\nseed: 7\ncase_sensitive_query: false").unwrap();

        let config = ViewConfig::load(file.path()).unwrap();
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.seed, Some(7));
        assert!(!config.case_sensitive_query);
    }

    #[test]
    fn test_view_config_load_missing_file() {
        let result = ViewConfig::load("/nonexistent/view.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_page_request_minimal_yaml() {
        let request = PageRequest::from_yaml("query: cat\n").unwrap();
        assert_eq!(request.page_size, 10);
        assert_eq!(request.page_no, 1);
        assert_eq!(request.query, "cat");
        assert_eq!(request.sorting, SortingType::None);
        assert!(request.metrics.is_empty());
        assert!(!request.filter_by_tags);
    }

    #[test]
    fn test_page_request_sorting_by_code_and_name() {
        let by_code = PageRequest::from_json(r#"{"sorting": 7, "sorting_metric": "bleu"}"#).unwrap();
        assert_eq!(by_code.sorting, SortingType::MetricDiff);
        assert_eq!(by_code.sorting_metric, "bleu");

        let by_name = PageRequest::from_yaml("sorting: ref_alphabetical\n").unwrap();
        assert_eq!(by_name.sorting, SortingType::RefAlphabetical);
    }

    #[test]
    fn test_page_request_unknown_sorting_fails() {
        assert!(matches!(
            PageRequest::from_json(r#"{"sorting": 12}"#),
            Err(ConfigError::JsonError(_))
        ));
        assert!(matches!(
            PageRequest::from_yaml("sorting: shortest\n"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_page_request_full_yaml() {
        let yaml = r"
page_size: 25
page_no: 3
metrics: [bleu, chrf]
query: world
sorting: metric
sorting_metric: bleu
need_lang_tags: true
disable_alignment: true
tags: [news, chat]
is_tag_selected: [true, false]
filter_by_tags: true
";
        let request = PageRequest::from_yaml(yaml).unwrap();
        assert_eq!(request.page_size, 25);
        assert_eq!(request.page_no, 3);
        assert_eq!(request.metrics, vec!["bleu", "chrf"]);
        assert_eq!(request.sorting, SortingType::Metric);
        assert!(request.need_lang_tags);
        assert!(request.disable_alignment);
        assert_eq!(request.is_tag_selected, vec![true, false]);
        assert!(request.filter_by_tags);
    }

    #[test]
    fn test_page_request_builders() {
        let request = PageRequest::default()
            .page(5, 2)
            .with_query("x")
            .with_metrics(["bleu"])
            .sorted_by(SortingType::Random, "");
        assert_eq!(request.page_size, 5);
        assert_eq!(request.page_no, 2);
        assert_eq!(request.query, "x");
        assert_eq!(request.metrics, vec!["bleu"]);
        assert_eq!(request.sorting, SortingType::Random);
    }
}
