//! The search orchestrator.
//!
//! Each iteration runs the same fixed sequence:
//!
//! 1. **Expanding**: every node of the scheduled batch is expanded, in parallel
//!    when configured. Results are collected in batch order.
//! 2. **Merging**: subgraph triples are appended, frontier triples are annotated
//!    by the ordering engine, deduplicated and counted into the occurrence table,
//!    and the frontier is purged of expanded nodes.
//! 3. **Ranking**: the next batch is chosen, either by the ranker (informed walk)
//!    or by uniform sampling of the frontier (random walk).
//! 4. Metrics are computed, artifacts written and termination checked.
//!
//! All state lives in one [`SearchState`], mutated only by the merge and ranking
//! steps of the orchestrator itself.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{FailurePolicy, NodeSelectionMode, SearchConfig, SearchMode, SourceConfig, WalkMode};
use crate::error::{NarrativeResult, SourceError};
use crate::expansion::{Expansion, ExpansionResult};
use crate::filtering::Filtering;
use crate::graph::Direction;
use crate::graph::endpoint::SparqlEndpoint;
use crate::graph::memory::MemorySource;
use crate::graph::source::TripleSource;
use crate::graph::sparql::SparqlStore;
use crate::lookup::LookupTables;
use crate::metrics::{self, GoldStandard, MetricsRecord};
use crate::ordering::{Ordering, OrderingStats};
use crate::persist::RunWriter;
use crate::ranker::{PathKey, Ranker};
use crate::selecting::NodeSelector;
use crate::state::{
    Batch, DiscardedRecord, ExpandedRecord, FailedNode, FrontierEntry, SearchState, SubgraphEntry,
};

/// Why a run stopped, in decreasing priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    TargetFound { target: String },
    MaxUri { expanded: usize },
    IterationBudget,
    NothingLeft,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetFound { target } => write!(f, "target found: {target}"),
            Self::MaxUri { expanded } => write!(f, "node budget reached ({expanded} expanded)"),
            Self::IterationBudget => f.write_str("iteration budget exhausted"),
            Self::NothingLeft => f.write_str("nothing left to expand"),
        }
    }
}

/// Outcome of a finished run; also the body of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: usize,
    pub nodes_expanded: usize,
    pub subgraph_triples: usize,
    pub termination: TerminationReason,
    pub best_f1_iteration: Option<usize>,
    pub best: Option<MetricsRecord>,
    /// Expanded paths in order, for search-specific-node runs.
    pub path_chain: Vec<String>,
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    config: &'a SearchConfig,
}

enum NodeOutcome {
    Expanded(ExpansionResult),
    Skipped { node: String, error: SourceError },
}

/// Open the triple source a run file points at.
///
/// `.json` files load into memory, other files are read as N-Triples into a
/// local oxigraph store.
pub fn open_source(source: &SourceConfig) -> NarrativeResult<Arc<dyn TripleSource>> {
    let source: Arc<dyn TripleSource> = match source {
        SourceConfig::File { path } if path.extension().is_some_and(|e| e == "json") => {
            Arc::new(MemorySource::from_json_file(path)?)
        }
        SourceConfig::File { path } => Arc::new(SparqlStore::from_ntriples(path)?),
        SourceConfig::Endpoint {
            url,
            timeout,
            delay,
        } => Arc::new(SparqlEndpoint::new(url.as_str(), *timeout, *delay)),
    };
    Ok(source)
}

/// One search run.
pub struct Framework {
    config: SearchConfig,
    expansion: Expansion,
    ordering: Ordering,
    ranker: Ranker,
    gold: Option<GoldStandard>,
    state: SearchState,
}

impl Framework {
    /// Validate `config` and load every static input. No file is written here.
    pub fn new(config: SearchConfig, source: Arc<dyn TripleSource>) -> NarrativeResult<Self> {
        let state = SearchState::new(&config.start);
        Self::resume(config, source, state)
    }

    /// Like [`Framework::new`], with the source taken from `config.source`.
    pub fn from_config(config: SearchConfig) -> NarrativeResult<Self> {
        config.validate()?;
        let source = match &config.source {
            Some(source) => open_source(source)?,
            None => {
                return Err(crate::error::ConfigError::Missing {
                    key: "source".into(),
                }
                .into());
            }
        };
        Self::new(config, source)
    }

    /// Continue from a snapshot produced by an earlier run.
    pub fn resume(
        config: SearchConfig,
        source: Arc<dyn TripleSource>,
        state: SearchState,
    ) -> NarrativeResult<Self> {
        config.validate()?;
        let lookup = Arc::new(LookupTables::load(
            config.lookup.domain.as_deref(),
            config.lookup.range.as_deref(),
            config.lookup.superclasses.as_deref(),
        )?);
        let gold = config.gold.as_ref().map(GoldStandard::load).transpose()?;

        let filtering = Filtering::new(&config.dataset, config.filters, config.dates);
        let expansion = Expansion::new(source, &config.dataset, filtering, Arc::clone(&lookup));
        let ordering = Ordering::new(lookup, config.dataset.focus_types.clone(), config.domain_range);
        let ranker = Ranker::new(config.ranking, config.low_threshold, config.high_threshold);

        Ok(Self {
            config,
            expansion,
            ordering,
            ranker,
            gold,
            state,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn into_state(self) -> SearchState {
        self.state
    }

    /// Run to termination, writing artifacts when an output folder is configured.
    pub fn run(&mut self) -> NarrativeResult<RunSummary> {
        let started_at = Utc::now();
        let writer = self.config.output.as_deref().map(RunWriter::create).transpose()?;
        tracing::info!(
            start = %self.config.start,
            ranking = %self.config.ranking,
            iterations = self.config.iterations,
            resumed_at = self.state.iteration,
            "starting search"
        );

        // Checked first so a resumed run that already met a stop condition ends at once.
        let termination = loop {
            if let Some(reason) = self.check_termination() {
                break reason;
            }
            if let Some(reason) = self.step()? {
                break reason;
            }
            if let Some(writer) = &writer {
                writer.write_iteration(&self.state, self.state.iteration)?;
            }
        };

        let best = metrics::best_iteration(&self.state.metrics).copied();
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            iterations: self.state.iteration,
            nodes_expanded: self.state.nodes_expanded.len(),
            subgraph_triples: self.state.subgraph.len(),
            termination,
            best_f1_iteration: best.map(|b| b.iteration),
            best,
            path_chain: self.path_chain(),
        };
        if let Some(writer) = &writer {
            let metadata = RunMetadata {
                summary: &summary,
                config: &self.config,
            };
            writer.write_final(&self.state, &metadata)?;
        }
        tracing::info!(
            termination = %summary.termination,
            iterations = summary.iterations,
            nodes_expanded = summary.nodes_expanded,
            subgraph = summary.subgraph_triples,
            "search finished"
        );
        Ok(summary)
    }

    /// Run one iteration. Returns a reason when there was nothing to run.
    ///
    /// A failed expansion leaves the state untouched, with the batch still scheduled.
    pub fn step(&mut self) -> NarrativeResult<Option<TerminationReason>> {
        let Some(batch) = self.state.next.take() else {
            return Ok(Some(TerminationReason::NothingLeft));
        };
        let iteration = self.state.iteration + 1;

        let mut seen = HashSet::new();
        let nodes: Vec<String> = batch
            .nodes
            .iter()
            .filter(|n| !self.state.nodes_expanded.contains(*n) && seen.insert(n.as_str()))
            .cloned()
            .collect();
        if nodes.is_empty() {
            return Ok(Some(TerminationReason::NothingLeft));
        }

        let outcomes = match self.expand_batch(&nodes) {
            Ok(outcomes) => outcomes,
            Err(err) => {
                self.state.next = Some(batch);
                return Err(err);
            }
        };

        self.record_expanded(iteration, batch.path.as_ref().map(|p| (&p.key, p.score)), &nodes);
        self.state.nodes_expanded.extend(nodes.iter().cloned());
        self.merge(iteration, outcomes);
        self.state.next = self.next_batch(iteration);
        self.evaluate(iteration);
        self.state.iteration = iteration;

        tracing::info!(
            iteration,
            expanded = nodes.len(),
            nodes_expanded = self.state.nodes_expanded.len(),
            subgraph = self.state.subgraph.len(),
            frontier = self.state.frontier.len(),
            paths = self.state.occurrences.len(),
            "iteration complete"
        );
        Ok(None)
    }

    /// Termination conditions, in priority order.
    pub fn check_termination(&self) -> Option<TerminationReason> {
        if let SearchMode::SearchSpecificNode { target } = &self.config.mode {
            if self.target_reached(target) {
                return Some(TerminationReason::TargetFound {
                    target: target.clone(),
                });
            }
        }
        if let Some(max_uri) = self.config.max_uri {
            let expanded = self.state.nodes_expanded.len();
            if expanded >= max_uri {
                return Some(TerminationReason::MaxUri { expanded });
            }
        }
        if self.state.iteration >= self.config.iterations {
            return Some(TerminationReason::IterationBudget);
        }
        if self.state.next.is_none() {
            return Some(TerminationReason::NothingLeft);
        }
        None
    }

    fn target_reached(&self, target: &str) -> bool {
        self.state.nodes_expanded.contains(target)
            || self.state.subgraph_nodes().contains(target)
            || self.state.frontier.nodes().contains(target)
    }

    fn path_chain(&self) -> Vec<String> {
        self.state
            .expanded
            .iter()
            .filter_map(|r| r.path.as_ref().map(PathKey::to_string))
            .collect()
    }

    fn record_expanded(&mut self, iteration: usize, path: Option<(&PathKey, f64)>, nodes: &[String]) {
        match self.config.walk {
            WalkMode::Informed => self.state.expanded.push(ExpandedRecord {
                iteration,
                path: path.map(|(k, _)| k.clone()),
                node_count: nodes.len(),
                nodes: nodes.to_vec(),
                score: path.map(|(_, s)| s),
            }),
            WalkMode::Random => {
                self.state
                    .expanded
                    .extend(nodes.iter().map(|node| ExpandedRecord {
                        iteration,
                        path: None,
                        node_count: 1,
                        nodes: vec![node.clone()],
                        score: None,
                    }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expanding
    // -----------------------------------------------------------------------

    fn expand_batch(&self, nodes: &[String]) -> NarrativeResult<Vec<NodeOutcome>> {
        let expansion = &self.expansion;
        let policy = self.config.failure;
        let outcomes: Vec<Result<NodeOutcome, SourceError>> = if self.config.parallel {
            nodes
                .par_iter()
                .map(|node| expand_node(expansion, node, policy))
                .collect()
        } else {
            nodes
                .iter()
                .map(|node| expand_node(expansion, node, policy))
                .collect()
        };
        Ok(outcomes.into_iter().collect::<Result<Vec<_>, _>>()?)
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    fn merge(&mut self, iteration: usize, outcomes: Vec<NodeOutcome>) {
        let mut stats = OrderingStats::new(iteration);
        let mut in_subgraph: HashSet<_> = self.state.subgraph.iter().map(|e| e.triple.clone()).collect();
        let mut pending: Vec<FrontierEntry> = Vec::new();

        for outcome in outcomes {
            let result = match outcome {
                NodeOutcome::Expanded(result) => result,
                NodeOutcome::Skipped { node, error } => {
                    self.state.failed.push(FailedNode {
                        iteration,
                        node,
                        error: error.to_string(),
                    });
                    continue;
                }
            };

            for (triples, direction) in [
                (result.subgraph_ingoing, Direction::Ingoing),
                (result.subgraph_outgoing, Direction::Outgoing),
            ] {
                for triple in triples {
                    if in_subgraph.insert(triple.clone()) {
                        self.state.subgraph.push(SubgraphEntry {
                            triple,
                            direction,
                            iteration,
                        });
                    }
                }
            }
            for (triples, direction) in [
                (result.frontier_ingoing, Direction::Ingoing),
                (result.frontier_outgoing, Direction::Outgoing),
            ] {
                pending.extend(self.ordering.annotate(triples, direction, iteration, &mut stats));
            }
            if !result.discarded.is_empty() {
                self.state.discarded.push(DiscardedRecord {
                    iteration,
                    node: result.node,
                    discarded: result.discarded.into_iter().collect(),
                });
            }
        }

        // Counts track live frontier triples: purged entries leave the table
        // before new ones are counted.
        let uses_objects = self.config.ranking.uses_objects();
        let focus = &self.config.dataset.focus_types;
        let purged = self.state.frontier.purge(&self.state.nodes_expanded);
        for entry in &purged {
            self.state
                .occurrences
                .decrement(&PathKey::for_entry(entry, uses_objects, focus));
        }
        let added = self
            .state
            .frontier
            .extend_new(pending, &self.state.nodes_expanded);
        for entry in &added {
            self.state
                .occurrences
                .increment(PathKey::for_entry(entry, uses_objects, focus));
        }
        self.state.ordering.push(stats);

        tracing::debug!(
            iteration,
            added = added.len(),
            purged = purged.len(),
            relevant_ingoing = stats.ingoing.relevant,
            relevant_outgoing = stats.outgoing.relevant,
            "merged frontier"
        );
    }

    // -----------------------------------------------------------------------
    // Ranking
    // -----------------------------------------------------------------------

    fn next_batch(&mut self, iteration: usize) -> Option<Batch> {
        let next = iteration + 1;
        match self.config.walk {
            WalkMode::Random => {
                let nodes: Vec<String> = self
                    .state
                    .frontier
                    .nodes()
                    .into_iter()
                    .filter(|n| !self.state.nodes_expanded.contains(*n))
                    .map(str::to_string)
                    .collect();
                if nodes.is_empty() {
                    return None;
                }
                let mut selector = NodeSelector::for_iteration(NodeSelectionMode::All, self.config.seed, next);
                let nodes = selector.sample(nodes, self.config.uri_limit);
                Some(Batch { path: None, nodes })
            }
            WalkMode::Informed => self.rank(next),
        }
    }

    /// Pick the best path and the nodes to expand through it. Paths whose nodes
    /// have all been expanded already are dropped and ranking is retried.
    fn rank(&mut self, next: usize) -> Option<Batch> {
        let focus = &self.config.dataset.focus_types;
        loop {
            let best = self.ranker.select_best(&self.state.occurrences)?;
            let candidates: BTreeSet<&str> = self
                .state
                .frontier
                .entries()
                .filter(|e| best.key.matches(e, focus))
                .map(FrontierEntry::node)
                .filter(|n| !self.state.nodes_expanded.contains(*n))
                .collect();
            if candidates.is_empty() {
                tracing::debug!(path = %best.key, "dropping exhausted path");
                self.state.occurrences.remove(&best.key);
                continue;
            }

            let candidates: Vec<String> = candidates.into_iter().map(str::to_string).collect();
            let mut selector =
                NodeSelector::for_iteration(self.config.node_selection, self.config.seed, next);
            let (to_expand, remainder) = selector.choose(candidates);
            // A random pick leaves the bucket in place; purging the picked node's
            // triples at the next merge decrements it.
            if self.config.node_selection == NodeSelectionMode::All {
                self.state.occurrences.remove(&best.key);
            }
            tracing::debug!(
                path = %best.key,
                score = best.score,
                nodes = to_expand.len(),
                remaining = remainder.len(),
                "selected path"
            );
            return Some(Batch {
                path: Some(best),
                nodes: to_expand,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Metrics
    // -----------------------------------------------------------------------

    fn evaluate(&mut self, iteration: usize) {
        let Some(gold) = &self.gold else {
            return;
        };
        let found = self.state.subgraph_nodes();
        let metrics = gold.compute(found.iter().copied());
        tracing::info!(
            iteration,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            "metrics"
        );
        self.state.metrics.push(MetricsRecord {
            iteration,
            found: found.len(),
            metrics,
        });
    }
}

fn expand_node(
    expansion: &Expansion,
    node: &str,
    policy: FailurePolicy,
) -> Result<NodeOutcome, SourceError> {
    let retries = match policy {
        FailurePolicy::Abort => return expansion.expand(node).map(NodeOutcome::Expanded),
        FailurePolicy::Skip { retries } => retries,
    };
    let mut attempt = 0;
    loop {
        match expansion.expand(node) {
            Ok(result) => return Ok(NodeOutcome::Expanded(result)),
            Err(error) if error.is_retryable() && attempt < retries => {
                attempt += 1;
                tracing::warn!(node, attempt, %error, "retrying node expansion");
            }
            Err(error) => {
                tracing::warn!(node, %error, "skipping node");
                return Ok(NodeOutcome::Skipped {
                    node: node.to_string(),
                    error,
                });
            }
        }
    }
}
