//! Persistence and recovery tests.
//!
//! These tests verify that run artifacts land where expected, that a state
//! snapshot reproduces the same next ranking decision, and that a resumed run
//! continues exactly like an uninterrupted one.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use narrative_search::config::SourceConfig;
use narrative_search::framework::{Framework, RunSummary, TerminationReason};
use narrative_search::graph::Triple;
use narrative_search::graph::sparql::SparqlStore;
use narrative_search::persist::{self, read_json};
use narrative_search::ranker::Ranker;

#[test]
fn run_writes_iteration_and_final_artifacts() {
    let dir = tempfile::TempDir::new().unwrap();
    let out = dir.path().join("run");
    let mut config = common::config(common::write_lookup(dir.path()));
    config.output = Some(out.clone());

    let mut fw = Framework::new(config, Arc::new(common::source())).unwrap();
    let summary = fw.run().unwrap();

    for iteration in ["1", "2"] {
        for file in [
            "subgraph.json",
            "pending_ingoing.json",
            "pending_outgoing.json",
            "occurrences.json",
            "expanded.json",
            "discarded.json",
        ] {
            let path = out.join("iterations").join(iteration).join(file);
            assert!(path.exists(), "missing {}", path.display());
        }
    }
    for file in ["subgraph.json", "expanded.json", "metrics.json", "ordering.json", "metadata.json"] {
        assert!(out.join(file).exists(), "missing {file}");
    }

    let metadata: serde_json::Value = read_json(&out.join("metadata.json")).unwrap();
    assert_eq!(metadata["termination"]["reason"], "iteration_budget");
    assert_eq!(metadata["config"]["ranking"], "entropy_pred_object_freq");
    let reread: RunSummary = serde_json::from_value(metadata).unwrap();
    assert_eq!(reread.termination, summary.termination);

    assert_eq!(&persist::load_state(&out).unwrap(), fw.state());
}

#[test]
fn nothing_is_written_for_an_invalid_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let out = dir.path().join("run");
    let mut config = common::config(common::write_lookup(dir.path()));
    config.output = Some(out.clone());
    config.dates = None;
    config.filters.when = true;

    assert!(Framework::new(config, Arc::new(common::source())).is_err());
    assert!(!out.exists());
}

#[test]
fn snapshot_reproduces_next_ranking_decision() {
    let dir = tempfile::TempDir::new().unwrap();
    let out = dir.path().join("run");
    let mut config = common::config(common::write_lookup(dir.path()));
    config.iterations = 3;
    config.output = Some(out.clone());
    let ranker = Ranker::new(config.ranking, config.low_threshold, config.high_threshold);

    let mut fw = Framework::new(config, Arc::new(common::source())).unwrap();
    fw.run().unwrap();

    let original = fw.state();
    let loaded = persist::load_state(&out).unwrap();
    assert_eq!(loaded.frontier, original.frontier);
    assert_eq!(loaded.occurrences, original.occurrences);
    assert_eq!(loaded.next, original.next);
    assert_eq!(
        ranker.select_best(&loaded.occurrences),
        ranker.select_best(&original.occurrences)
    );
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let lookup = common::write_lookup(dir.path());

    let mut full = common::config(lookup.clone());
    full.iterations = 4;
    let mut uninterrupted = Framework::new(full.clone(), Arc::new(common::source())).unwrap();
    let expected = uninterrupted.run().unwrap();

    let out = dir.path().join("partial");
    let mut partial = common::config(lookup);
    partial.iterations = 2;
    partial.output = Some(out.clone());
    Framework::new(partial, Arc::new(common::source()))
        .unwrap()
        .run()
        .unwrap();

    let state = persist::load_state(&out).unwrap();
    assert_eq!(state.iteration, 2);
    let mut resumed = Framework::resume(full, Arc::new(common::source()), state).unwrap();
    let summary = resumed.run().unwrap();

    assert_eq!(summary.iterations, expected.iterations);
    assert_eq!(summary.termination, expected.termination);
    let (a, b) = (resumed.state(), uninterrupted.state());
    assert_eq!(a.subgraph, b.subgraph);
    assert_eq!(a.expanded, b.expanded);
    assert_eq!(a.frontier, b.frontier);
    assert_eq!(a.occurrences, b.occurrences);
}

#[test]
fn resuming_a_finished_run_stops_immediately() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = common::config(common::write_lookup(dir.path()));
    let mut fw = Framework::new(config.clone(), Arc::new(common::source())).unwrap();
    fw.run().unwrap();

    let state = fw.into_state();
    let mut again = Framework::resume(config, Arc::new(common::source()), state.clone()).unwrap();
    let summary = again.run().unwrap();
    assert_eq!(summary.termination, TerminationReason::IterationBudget);
    assert_eq!(again.state(), &state);
}

#[test]
fn oxigraph_source_finds_the_same_subgraph() {
    let dir = tempfile::TempDir::new().unwrap();
    let dump = dir.path().join("french_revolution.nt");
    std::fs::write(&dump, common::ntriples()).unwrap();

    let store = SparqlStore::from_ntriples(&dump).unwrap();
    assert_eq!(store.len().unwrap(), common::triples().len());

    let lookup = common::write_lookup(dir.path());
    let mut from_file = common::config(lookup.clone());
    from_file.source = Some(SourceConfig::File { path: dump });
    let mut oxigraph = Framework::from_config(from_file).unwrap();
    oxigraph.run().unwrap();

    let mut memory = Framework::new(common::config(lookup), Arc::new(common::source())).unwrap();
    memory.run().unwrap();

    let triples = |fw: &Framework| -> BTreeSet<(Triple, usize)> {
        fw.state()
            .subgraph
            .iter()
            .map(|e| (e.triple.clone(), e.iteration))
            .collect()
    };
    assert_eq!(triples(&oxigraph), triples(&memory));
    assert_eq!(
        oxigraph.state().nodes_expanded,
        memory.state().nodes_expanded
    );
}
