//! Precision, recall and F1 of the discovered nodes against a gold-standard
//! event set, after redirect normalization through the referents map.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::GoldConfig;
use crate::error::MetricsError;
use crate::graph::is_literal;
use crate::state::SearchState;

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Metrics of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub iteration: usize,
    /// Distinct nodes compared against the gold standard.
    pub found: usize,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Iteration with the highest F1; the earliest one wins ties.
pub fn best_iteration(history: &[MetricsRecord]) -> Option<&MetricsRecord> {
    history.iter().fold(None, |best, record| match best {
        Some(b) if b.metrics.f1 >= record.metrics.f1 => Some(b),
        _ => Some(record),
    })
}

/// Metrics after each iteration of a persisted run, recomputed from its subgraph.
pub fn replay(state: &SearchState, gold: &GoldStandard) -> Vec<MetricsRecord> {
    (1..=state.iteration)
        .map(|iteration| {
            let found: BTreeSet<&str> = state
                .subgraph
                .iter()
                .filter(|e| e.iteration <= iteration)
                .flat_map(|e| [e.triple.subject.as_str(), e.triple.object.as_str()])
                .filter(|n| !is_literal(n))
                .collect();
            MetricsRecord {
                iteration,
                found: found.len(),
                metrics: gold.compute(found.iter().copied()),
            }
        })
        .collect()
}

/// Gold-standard events and the redirect map used to canonicalize IRIs.
#[derive(Debug, Clone, Default)]
pub struct GoldStandard {
    events: BTreeSet<String>,
    referents: HashMap<String, String>,
}

impl GoldStandard {
    pub fn new(events: impl IntoIterator<Item = String>, referents: HashMap<String, String>) -> Self {
        let events = events
            .into_iter()
            .map(|e| referents.get(&e).cloned().unwrap_or(e))
            .collect();
        Self { events, referents }
    }

    pub fn load(config: &GoldConfig) -> MetricsResult<Self> {
        let events = read_events(&config.events, &config.column)?;
        let referents = match &config.referents {
            Some(path) => read_referents(path)?,
            None => HashMap::new(),
        };
        tracing::info!(
            events = events.len(),
            referents = referents.len(),
            "loaded gold standard"
        );
        Ok(Self::new(events, referents))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn canonical<'a>(&'a self, iri: &'a str) -> &'a str {
        self.referents.get(iri).map(String::as_str).unwrap_or(iri)
    }

    /// Compare `found` against the gold standard. Zero denominators give zero.
    pub fn compute<'a>(&self, found: impl IntoIterator<Item = &'a str>) -> Metrics {
        let found: BTreeSet<&str> = found.into_iter().map(|n| self.canonical(n)).collect();
        let tp = found.iter().filter(|n| self.events.contains(**n)).count() as f64;
        let fp = found.len() as f64 - tp;
        let fn_ = self.events.len() as f64 - tp;

        let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };
        Metrics {
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            f1: ratio(tp, tp + 0.5 * (fp + fn_)),
        }
    }
}

fn read_events(path: &Path, column: &str) -> MetricsResult<Vec<String>> {
    let read_err = |source: std::io::Error| MetricsError::GoldStandard {
        path: path.display().to_string(),
        source,
    };
    let file = std::fs::File::open(path).map_err(read_err)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    if headers.iter().all(str::is_empty) {
        return Err(MetricsError::MissingColumn {
            path: path.display().to_string(),
            column: column.into(),
        });
    }
    // Single-column files without the expected header use their only column.
    let index = headers.iter().position(|h| h == column).unwrap_or(0);

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if let Some(value) = record.get(index).filter(|v| !v.is_empty()) {
            events.push(value.to_string());
        }
    }
    Ok(events)
}

fn csv_error(path: &Path, error: csv::Error) -> MetricsError {
    MetricsError::GoldStandardParse {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

fn read_referents(path: &Path) -> MetricsResult<HashMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|source| MetricsError::ReferentsRead {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| MetricsError::ReferentsParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn gold(events: &[&str]) -> GoldStandard {
        GoldStandard::new(events.iter().map(|e| e.to_string()), HashMap::new())
    }

    #[test]
    fn empty_inputs_give_zero() {
        assert_eq!(gold(&[]).compute([]), Metrics::default());
        assert_eq!(gold(&["a"]).compute([]), Metrics::default());
        assert_eq!(gold(&[]).compute(["a"]), Metrics::default());
    }

    #[test]
    fn perfect_match() {
        let g = gold(&["a", "b", "c"]);
        let m = g.compute(["a", "b", "c"]);
        assert_eq!(
            m,
            Metrics {
                precision: 1.0,
                recall: 1.0,
                f1: 1.0
            }
        );
    }

    #[test]
    fn partial_match() {
        let g = gold(&["a", "b", "c", "d"]);
        let m = g.compute(["a", "b", "x", "b"]);
        // tp = 2, fp = 1, fn = 2
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 0.5).abs() < 1e-12);
        assert!((m.f1 - 2.0 / 3.5).abs() < 1e-12);
    }

    #[test]
    fn referents_canonicalize_found_and_gold() {
        let referents = HashMap::from([
            ("Valmy".to_string(), "Battle_of_Valmy".to_string()),
            ("Old_Name".to_string(), "New_Name".to_string()),
        ]);
        let g = GoldStandard::new(["Battle_of_Valmy".into(), "Old_Name".into()], referents);
        let m = g.compute(["Valmy", "New_Name"]);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.precision, 1.0);
    }

    #[test]
    fn best_iteration_prefers_earliest_maximum() {
        let record = |iteration, f1| MetricsRecord {
            iteration,
            found: 0,
            metrics: Metrics {
                f1,
                ..Default::default()
            },
        };
        let history = [record(1, 0.2), record(2, 0.5), record(3, 0.5), record(4, 0.1)];
        assert_eq!(best_iteration(&history).unwrap().iteration, 2);
        assert!(best_iteration(&[]).is_none());
    }

    #[test]
    fn replay_is_cumulative() {
        use crate::graph::{Direction, Triple};
        use crate::state::SubgraphEntry;

        let mut state = SearchState::new("hub");
        state.iteration = 2;
        for (s, iteration) in [("a", 1), ("b", 2)] {
            state.subgraph.push(SubgraphEntry {
                triple: Triple::new(s, "p", "hub"),
                direction: Direction::Ingoing,
                iteration,
            });
        }
        let history = replay(&state, &gold(&["a", "b"]));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].metrics.recall, 0.5);
        assert_eq!(history[1].metrics.recall, 1.0);
        assert_eq!(history[1].found, 3);
    }

    #[test]
    fn loads_csv_and_referents() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = dir.path().join("events.csv");
        std::fs::write(
            &events,
            "label,linkDBpedia\n\"Valmy, battle of\",http://dbpedia.org/resource/Battle_of_Valmy\nToulon,http://dbpedia.org/resource/Siege_of_Toulon\n",
        )
        .unwrap();
        let referents = dir.path().join("referents.json");
        std::fs::write(
            &referents,
            r#"{"http://dbpedia.org/resource/Valmy": "http://dbpedia.org/resource/Battle_of_Valmy"}"#,
        )
        .unwrap();

        let g = GoldStandard::load(&GoldConfig {
            events,
            referents: Some(referents),
            column: "linkDBpedia".into(),
        })
        .unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.compute(["http://dbpedia.org/resource/Valmy"]).precision, 1.0);
    }

    #[test]
    fn unreadable_gold_standard_is_fatal() {
        let err = GoldStandard::load(&GoldConfig {
            events: "/nonexistent/events.csv".into(),
            referents: None,
            column: "linkDBpedia".into(),
        })
        .unwrap_err();
        assert!(matches!(err, MetricsError::GoldStandard { .. }));
    }

    #[test]
    fn quoted_fields_may_span_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = dir.path().join("events.csv");
        std::fs::write(
            &events,
            "label,linkDBpedia\n\"Valmy,\nbattle of\",http://dbpedia.org/resource/Battle_of_Valmy\n\"say \"\"hi\"\"\",http://dbpedia.org/resource/Siege_of_Toulon\n",
        )
        .unwrap();
        let g = GoldStandard::load(&GoldConfig {
            events,
            referents: None,
            column: "linkDBpedia".into(),
        })
        .unwrap();
        assert_eq!(g.len(), 2);
        let m = g.compute([
            "http://dbpedia.org/resource/Battle_of_Valmy",
            "http://dbpedia.org/resource/Siege_of_Toulon",
        ]);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn headerless_single_column_uses_first_column() {
        let dir = tempfile::TempDir::new().unwrap();
        let events = dir.path().join("events.csv");
        std::fs::write(&events, "event\nhttp://dbpedia.org/resource/Battle_of_Valmy\n").unwrap();
        let g = GoldStandard::load(&GoldConfig {
            events,
            referents: None,
            column: "linkDBpedia".into(),
        })
        .unwrap();
        assert_eq!(g.len(), 1);
    }

    proptest! {
        #[test]
        fn metrics_stay_in_unit_interval(
            gold_set in proptest::collection::btree_set("[a-h]", 0..8),
            found in proptest::collection::vec("[a-l]", 0..12),
        ) {
            let g = GoldStandard::new(gold_set, HashMap::new());
            let m = g.compute(found.iter().map(String::as_str));
            for v in [m.precision, m.recall, m.f1] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
            prop_assert!(m.f1 <= m.precision.max(m.recall) + 1e-12);
        }
    }
}
