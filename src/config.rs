//! Run configuration.
//!
//! A run is described by a TOML file deserialized into [`RunFile`] (every optional
//! key has a default) and validated once into a fully typed [`SearchConfig`].
//! All validation happens here, before any query is sent or file written.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dataset::{DatasetConfig, DatasetOverrides};
use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// How frontier paths are scored by the ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    PredFreq,
    InversePredFreq,
    EntropyPredFreq,
    PredObjectFreq,
    InversePredObjectFreq,
    EntropyPredObjectFreq,
}

/// The comparison a strategy applies to occurrence counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// Highest count inside the threshold band.
    Frequency,
    /// Lowest count inside the threshold band.
    InverseFrequency,
    /// Highest `-p log p` contribution, no band.
    Entropy,
}

impl RankingStrategy {
    pub const ALL: [Self; 6] = [
        Self::PredFreq,
        Self::InversePredFreq,
        Self::EntropyPredFreq,
        Self::PredObjectFreq,
        Self::InversePredObjectFreq,
        Self::EntropyPredObjectFreq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PredFreq => "pred_freq",
            Self::InversePredFreq => "inverse_pred_freq",
            Self::EntropyPredFreq => "entropy_pred_freq",
            Self::PredObjectFreq => "pred_object_freq",
            Self::InversePredObjectFreq => "inverse_pred_object_freq",
            Self::EntropyPredObjectFreq => "entropy_pred_object_freq",
        }
    }

    /// Whether paths are keyed by (predicate, endpoint) rather than predicate alone.
    pub fn uses_objects(self) -> bool {
        matches!(
            self,
            Self::PredObjectFreq | Self::InversePredObjectFreq | Self::EntropyPredObjectFreq
        )
    }

    pub fn scoring(self) -> Scoring {
        match self {
            Self::PredFreq | Self::PredObjectFreq => Scoring::Frequency,
            Self::InversePredFreq | Self::InversePredObjectFreq => Scoring::InverseFrequency,
            Self::EntropyPredFreq | Self::EntropyPredObjectFreq => Scoring::Entropy,
        }
    }
}

impl FromStr for RankingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownRanking { name: s.into() })
    }
}

impl fmt::Display for RankingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the next batch of nodes is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkMode {
    /// Ranker-driven best-first expansion.
    #[default]
    Informed,
    /// Uniform sampling from the frontier (breadth-first when unbounded).
    Random,
}

/// What to do with the nodes sharing the winning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSelectionMode {
    #[default]
    All,
    Random,
}

/// Whether the search runs to budget or stops at a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Expand,
    SearchSpecificNode { target: String },
}

/// How a per-node retrieval failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failure aborts the run.
    Abort,
    /// Retry retryable failures, then skip the node.
    Skip { retries: u32 },
}

/// Narrative dimensions that can be switched on for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NarrativeFilters {
    pub who: bool,
    /// Carried through to run metadata; consumed by narrative-graph conversion.
    pub what: bool,
    pub r#where: bool,
    pub when: bool,
}

impl NarrativeFilters {
    pub fn any(&self) -> bool {
        self.who || self.r#where || self.when
    }
}

/// Inclusive date window around the seed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ConfigResult<Self> {
        if start > end {
            return Err(ConfigError::InvertedWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse an ISO `YYYY-MM-DD` pair.
    pub fn parse(start: &str, end: &str) -> ConfigResult<Self> {
        let parse = |key: &str, value: &str| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
                key: key.into(),
                value: value.into(),
            })
        };
        Self::new(parse("dates.start", start)?, parse("dates.end", end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.start.year() <= year && year <= self.end.year()
    }
}

/// Where triples come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfig {
    /// N-Triples dump (`.nt`) loaded into oxigraph, or a JSON triple array.
    File { path: PathBuf },
    Endpoint {
        url: String,
        timeout: Duration,
        delay: Duration,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookupPaths {
    pub domain: Option<PathBuf>,
    pub range: Option<PathBuf>,
    pub superclasses: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoldConfig {
    /// CSV file listing the gold-standard events.
    pub events: PathBuf,
    /// JSON map from IRI to canonical IRI (redirect resolution).
    pub referents: Option<PathBuf>,
    /// CSV header of the column holding event IRIs.
    #[serde(default = "default_gold_column")]
    pub column: String,
}

fn default_gold_column() -> String {
    "linkDBpedia".into()
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Fully typed configuration of one search run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchConfig {
    pub dataset: DatasetConfig,
    /// Full IRI of the seed node.
    pub start: String,
    /// Iteration budget.
    pub iterations: usize,
    pub ranking: RankingStrategy,
    /// Frequency strategies prefer counts strictly inside `(low, high)`.
    pub low_threshold: u64,
    pub high_threshold: u64,
    /// Stop once this many nodes have been expanded.
    pub max_uri: Option<usize>,
    pub walk: WalkMode,
    /// Random walk sample size; `None` expands the whole frontier.
    pub uri_limit: Option<usize>,
    pub node_selection: NodeSelectionMode,
    pub mode: SearchMode,
    pub seed: Option<u64>,
    /// Annotate frontier triples with domain/range superclasses.
    pub domain_range: bool,
    pub filters: NarrativeFilters,
    pub dates: Option<DateWindow>,
    pub source: Option<SourceConfig>,
    pub lookup: LookupPaths,
    pub gold: Option<GoldConfig>,
    pub failure: FailurePolicy,
    /// Expand the nodes of one iteration in parallel.
    pub parallel: bool,
    pub output: Option<PathBuf>,
}

impl SearchConfig {
    /// Defaults for everything but the dataset and the seed node.
    pub fn new(dataset: DatasetConfig, start: &str) -> Self {
        let start = dataset.expand_node(start);
        Self {
            dataset,
            start,
            iterations: 10,
            ranking: RankingStrategy::PredObjectFreq,
            low_threshold: 0,
            high_threshold: u64::MAX,
            max_uri: None,
            walk: WalkMode::Informed,
            uri_limit: None,
            node_selection: NodeSelectionMode::All,
            mode: SearchMode::Expand,
            seed: None,
            domain_range: true,
            filters: NarrativeFilters::default(),
            dates: None,
            source: None,
            lookup: LookupPaths::default(),
            gold: None,
            failure: FailurePolicy::Abort,
            parallel: false,
            output: None,
        }
    }

    /// Check the cross-field constraints a run depends on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.start.is_empty() {
            return Err(ConfigError::Missing {
                key: "start".into(),
            });
        }
        if self.iterations == 0 {
            return Err(invalid("iterations", "0", "a positive integer"));
        }
        if self.filters.when && self.dates.is_none() {
            return Err(ConfigError::WhenWithoutWindow);
        }
        if let Some(window) = self.dates {
            DateWindow::new(window.start, window.end)?;
        }
        if self.low_threshold >= self.high_threshold {
            return Err(invalid(
                "low_threshold",
                &self.low_threshold.to_string(),
                "a value below high_threshold",
            ));
        }
        if self.max_uri == Some(0) {
            return Err(invalid("max_uri", "0", "a positive integer"));
        }
        if self.uri_limit == Some(0) {
            return Err(invalid("uri_limit", "0", "a positive integer"));
        }
        if let SearchMode::SearchSpecificNode { target } = &self.mode {
            if target.is_empty() {
                return Err(ConfigError::Missing {
                    key: "target".into(),
                });
            }
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<Self> {
        let file: RunFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.into(),
            message: e.to_string(),
        })?;
        file.into_config()
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
        expected: expected.into(),
    }
}

fn flag(key: &str, value: u8) -> ConfigResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(invalid(key, &other.to_string(), "0 or 1")),
    }
}

// ---------------------------------------------------------------------------
// TOML run file
// ---------------------------------------------------------------------------

/// Raw run file as written by users.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default)]
    pub dataset_overrides: Option<DatasetOverrides>,
    pub start: Option<String>,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_ranking")]
    pub ranking: String,
    #[serde(default)]
    pub low_threshold: u64,
    pub high_threshold: Option<u64>,
    pub max_uri: Option<usize>,
    #[serde(default)]
    pub walk: WalkMode,
    pub uri_limit: Option<usize>,
    #[serde(default)]
    pub node_selection: NodeSelectionMode,
    pub seed: Option<u64>,
    #[serde(default = "default_domain_range")]
    pub domain_range: u8,
    pub target: Option<String>,
    #[serde(default)]
    pub filters: FiltersFile,
    pub dates: Option<DatesFile>,
    pub source: Option<SourceFile>,
    #[serde(default)]
    pub lookup: LookupPaths,
    pub gold: Option<GoldConfig>,
    #[serde(default)]
    pub failure: FailureFile,
    #[serde(default)]
    pub parallel: bool,
    pub output: Option<PathBuf>,
}

fn default_dataset() -> String {
    "dbpedia".into()
}

fn default_iterations() -> usize {
    10
}

fn default_ranking() -> String {
    RankingStrategy::PredObjectFreq.as_str().into()
}

fn default_domain_range() -> u8 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FiltersFile {
    #[serde(default)]
    pub who: u8,
    #[serde(default)]
    pub what: u8,
    #[serde(default, rename = "where")]
    pub r#where: u8,
    #[serde(default)]
    pub when: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatesFile {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceFile {
    File {
        path: PathBuf,
    },
    Endpoint {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default)]
        delay_ms: u64,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureFile {
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for FailureFile {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            retries: default_retries(),
        }
    }
}

fn default_policy() -> String {
    "abort".into()
}

fn default_retries() -> u32 {
    2
}

impl RunFile {
    /// Resolve defaults and validate into a [`SearchConfig`].
    pub fn into_config(self) -> ConfigResult<SearchConfig> {
        let mut dataset = DatasetConfig::preset(&self.dataset)?;
        if let Some(overrides) = self.dataset_overrides {
            dataset.apply(overrides);
        }
        let start = self.start.ok_or_else(|| ConfigError::Missing {
            key: "start".into(),
        })?;
        let mut config = SearchConfig::new(dataset, &start);

        config.iterations = self.iterations;
        config.ranking = self.ranking.parse()?;
        config.low_threshold = self.low_threshold;
        config.high_threshold = self.high_threshold.unwrap_or(u64::MAX);
        config.max_uri = self.max_uri;
        config.walk = self.walk;
        config.uri_limit = self.uri_limit;
        config.node_selection = self.node_selection;
        config.seed = self.seed;
        config.domain_range = flag("domain_range", self.domain_range)?;
        config.mode = match self.target {
            Some(target) => SearchMode::SearchSpecificNode {
                target: config.dataset.expand_node(&target),
            },
            None => SearchMode::Expand,
        };
        config.filters = NarrativeFilters {
            who: flag("filters.who", self.filters.who)?,
            what: flag("filters.what", self.filters.what)?,
            r#where: flag("filters.where", self.filters.r#where)?,
            when: flag("filters.when", self.filters.when)?,
        };
        config.dates = self
            .dates
            .map(|d| DateWindow::parse(&d.start, &d.end))
            .transpose()?;
        config.source = self.source.map(|s| match s {
            SourceFile::File { path } => SourceConfig::File { path },
            SourceFile::Endpoint {
                url,
                timeout_secs,
                delay_ms,
            } => SourceConfig::Endpoint {
                url,
                timeout: Duration::from_secs(timeout_secs),
                delay: Duration::from_millis(delay_ms),
            },
        });
        config.lookup = self.lookup;
        config.gold = self.gold;
        config.failure = match self.failure.policy.as_str() {
            "abort" => FailurePolicy::Abort,
            "skip" => FailurePolicy::Skip {
                retries: self.failure.retries,
            },
            other => return Err(invalid("failure.policy", other, "\"abort\" or \"skip\"")),
        };
        config.parallel = self.parallel;
        config.output = self.output;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        dataset = "dbpedia"
        start = "Category:French_Revolution"
        iterations = 2
        ranking = "entropy_pred_object_freq"
        max_uri = 50
        seed = 7

        [filters]
        who = 0
        what = 0
        where = 0
        when = 1

        [dates]
        start = "1789-05-05"
        end = "1799-12-31"

        [source]
        kind = "endpoint"
        url = "https://dbpedia.org/sparql"
        delay_ms = 250

        [failure]
        policy = "skip"
        retries = 3
    "#;

    #[test]
    fn parses_full_run_file() {
        let config = SearchConfig::from_toml_str(FULL, "test").unwrap();
        assert_eq!(
            config.start,
            "http://dbpedia.org/resource/Category:French_Revolution"
        );
        assert_eq!(config.iterations, 2);
        assert_eq!(config.ranking, RankingStrategy::EntropyPredObjectFreq);
        assert_eq!(config.max_uri, Some(50));
        assert!(config.filters.when);
        assert!(!config.filters.who);
        assert_eq!(
            config.dates.unwrap().start,
            NaiveDate::from_ymd_opt(1789, 5, 5).unwrap()
        );
        assert_eq!(config.failure, FailurePolicy::Skip { retries: 3 });
        assert!(matches!(
            config.source,
            Some(SourceConfig::Endpoint { timeout, delay, .. })
                if timeout == Duration::from_secs(30) && delay == Duration::from_millis(250)
        ));
    }

    #[test]
    fn defaults_are_resolved_at_load() {
        let config = SearchConfig::from_toml_str("start = \"Battle_of_Valmy\"", "test").unwrap();
        assert_eq!(config.iterations, 10);
        assert_eq!(config.ranking, RankingStrategy::PredObjectFreq);
        assert_eq!(config.high_threshold, u64::MAX);
        assert!(config.domain_range);
        assert_eq!(config.mode, SearchMode::Expand);
        assert_eq!(config.failure, FailurePolicy::Abort);
    }

    #[test]
    fn unknown_ranking_is_rejected() {
        let err = SearchConfig::from_toml_str("start = \"a\"\nranking = \"best\"", "test")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRanking { name } if name == "best"));
    }

    #[test]
    fn when_requires_a_window() {
        let err = SearchConfig::from_toml_str("start = \"a\"\n[filters]\nwhen = 1", "test")
            .unwrap_err();
        assert!(matches!(err, ConfigError::WhenWithoutWindow));
    }

    #[test]
    fn malformed_and_inverted_dates() {
        let err = SearchConfig::from_toml_str(
            "start = \"a\"\n[dates]\nstart = \"1789/05/05\"\nend = \"1799-12-31\"",
            "test",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDate { .. }));

        let err = DateWindow::parse("1799-12-31", "1789-05-05").unwrap_err();
        assert!(matches!(err, ConfigError::InvertedWindow { .. }));
    }

    #[test]
    fn filter_flags_must_be_binary() {
        let err = SearchConfig::from_toml_str("start = \"a\"\n[filters]\nwho = 2", "test")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "filters.who"));
    }

    #[test]
    fn missing_start_is_an_error() {
        let err = SearchConfig::from_toml_str("iterations = 3", "test").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key } if key == "start"));
    }

    #[test]
    fn target_switches_mode() {
        let config =
            SearchConfig::from_toml_str("start = \"a\"\ntarget = \"Battle_of_Valmy\"", "test")
                .unwrap();
        assert_eq!(
            config.mode,
            SearchMode::SearchSpecificNode {
                target: "http://dbpedia.org/resource/Battle_of_Valmy".into()
            }
        );
    }

    #[test]
    fn strategy_names_roundtrip() {
        for strategy in RankingStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<RankingStrategy>().unwrap(), strategy);
        }
        assert!(RankingStrategy::EntropyPredObjectFreq.uses_objects());
        assert_eq!(RankingStrategy::InversePredFreq.scoring(), Scoring::InverseFrequency);
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let window = DateWindow::parse("1789-05-05", "1799-12-31").unwrap();
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(NaiveDate::from_ymd_opt(1789, 5, 4).unwrap()));
        assert!(window.contains_year(1799));
        assert!(!window.contains_year(1800));
    }
}
