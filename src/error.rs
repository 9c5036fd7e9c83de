//! Rich diagnostic error types for the narrative search engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.
//!
//! Expected empty states (no type/date triples, an empty frontier, a ranker with
//! nothing to pick) are not errors; they surface as `Option`s or as a
//! [`TerminationReason`](crate::framework::TerminationReason).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a search run.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum NarrativeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persist(#[from] PersistError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Construction-time validation failures. None of these can happen mid-run.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read run config: {path}")]
    #[diagnostic(
        code(narrative::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run config {path}: {message}")]
    #[diagnostic(
        code(narrative::config::parse),
        help("Check the TOML syntax and the key names in the run config.")
    )]
    Parse { path: String, message: String },

    #[error("unknown ranking strategy: {name}")]
    #[diagnostic(
        code(narrative::config::ranking),
        help(
            "Valid strategies are: pred_freq, inverse_pred_freq, entropy_pred_freq, \
             pred_object_freq, inverse_pred_object_freq, entropy_pred_object_freq."
        )
    )]
    UnknownRanking { name: String },

    #[error("unknown dataset: {name}")]
    #[diagnostic(
        code(narrative::config::dataset),
        help("Valid datasets are: dbpedia, wikidata.")
    )]
    UnknownDataset { name: String },

    #[error("invalid value for `{key}`: {value}")]
    #[diagnostic(
        code(narrative::config::invalid_value),
        help("Expected {expected}.")
    )]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("invalid date `{value}` for `{key}`")]
    #[diagnostic(
        code(narrative::config::date),
        help("Dates must use the ISO format YYYY-MM-DD.")
    )]
    InvalidDate { key: String, value: String },

    #[error("date window is inverted: {start} is after {end}")]
    #[diagnostic(
        code(narrative::config::window),
        help("Swap `dates.start` and `dates.end`.")
    )]
    InvertedWindow { start: String, end: String },

    #[error("the `when` filter is enabled but no date window is configured")]
    #[diagnostic(
        code(narrative::config::when_without_window),
        help("Add a `[dates]` table with `start` and `end`, or set `filters.when = 0`.")
    )]
    WhenWithoutWindow,

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(narrative::config::missing),
        help("Add `{key}` to the run config.")
    )]
    Missing { key: String },
}

// ---------------------------------------------------------------------------
// Triple source errors
// ---------------------------------------------------------------------------

/// Data-retrieval failures, surfaced per node.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("SPARQL query error: {message}")]
    #[diagnostic(
        code(narrative::source::sparql),
        help(
            "The SPARQL query failed. Check the query syntax and ensure \
             the oxigraph store is initialized."
        )
    )]
    Sparql { message: String },

    #[error("endpoint {url} answered HTTP {status}")]
    #[diagnostic(
        code(narrative::source::http_status),
        help(
            "The endpoint rejected the query. 429/5xx statuses usually mean rate \
             limiting; raise `source.delay_ms` or retry later."
        )
    )]
    HttpStatus { url: String, status: u16 },

    #[error("endpoint {url} unreachable: {message}")]
    #[diagnostic(
        code(narrative::source::unreachable),
        help(
            "The request timed out or the connection failed. Check the URL and \
             network, or raise `source.timeout_secs`."
        )
    )]
    Unreachable { url: String, message: String },

    #[error("malformed response: {message}")]
    #[diagnostic(
        code(narrative::source::malformed),
        help("The source returned data that is not valid SPARQL JSON results.")
    )]
    Malformed { message: String },

    #[error("failed to load triples from {path}: {message}")]
    #[diagnostic(
        code(narrative::source::load),
        help("The dump must be valid N-Triples (one triple per line).")
    )]
    Load { path: String, message: String },

    #[error("triple pattern has no bound term")]
    #[diagnostic(
        code(narrative::source::unbound_pattern),
        help("Bind at least one of subject, predicate or object.")
    )]
    UnboundPattern,
}

impl SourceError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    #[error("failed to read lookup table: {path}")]
    #[diagnostic(
        code(narrative::lookup::read),
        help("Check the `[lookup]` paths in the run config.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse lookup table {path}: {message}")]
    #[diagnostic(
        code(narrative::lookup::parse),
        help("Lookup tables are JSON objects mapping an IRI to a list of IRIs.")
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Metrics errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MetricsError {
    #[error("failed to read gold standard: {path}")]
    #[diagnostic(
        code(narrative::metrics::gold_standard),
        help("The gold standard is a CSV file with one event IRI per row.")
    )]
    GoldStandard {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed gold standard {path}: {message}")]
    #[diagnostic(
        code(narrative::metrics::gold_standard_parse),
        help("Check the CSV quoting; every quoted field must be closed.")
    )]
    GoldStandardParse { path: String, message: String },

    #[error("failed to read referents: {path}")]
    #[diagnostic(
        code(narrative::metrics::referents_read),
        help("Check `gold.referents` in the run config.")
    )]
    ReferentsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse referents {path}: {message}")]
    #[diagnostic(
        code(narrative::metrics::referents_parse),
        help("Referents are a JSON object mapping an IRI to its canonical IRI.")
    )]
    ReferentsParse { path: String, message: String },

    #[error("gold standard {path} has no `{column}` column")]
    #[diagnostic(
        code(narrative::metrics::column),
        help("Set `gold.column` to the header holding event IRIs.")
    )]
    MissingColumn { path: String, column: String },
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(narrative::persist::io),
        help(
            "A filesystem operation failed. Check that the output directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error on {path}: {message}")]
    #[diagnostic(
        code(narrative::persist::serde),
        help(
            "Failed to serialize or deserialize run state. \
             A snapshot written by another version cannot be resumed."
        )
    )]
    Serialization { path: String, message: String },
}

/// Convenience alias for functions returning narrative search results.
pub type NarrativeResult<T> = std::result::Result<T, NarrativeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_narrative_error() {
        let err = ConfigError::WhenWithoutWindow;
        let top: NarrativeError = err.into();
        assert!(matches!(
            top,
            NarrativeError::Config(ConfigError::WhenWithoutWindow)
        ));
    }

    #[test]
    fn retryable_source_errors() {
        let timeout = SourceError::Unreachable {
            url: "http://localhost".into(),
            message: "timed out".into(),
        };
        assert!(timeout.is_retryable());

        let throttled = SourceError::HttpStatus {
            url: "http://localhost".into(),
            status: 429,
        };
        assert!(throttled.is_retryable());

        let bad_query = SourceError::HttpStatus {
            url: "http://localhost".into(),
            status: 400,
        };
        assert!(!bad_query.is_retryable());
        assert!(!SourceError::UnboundPattern.is_retryable());
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ConfigError::UnknownRanking {
            name: "best_guess".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("best_guess"));
    }
}
