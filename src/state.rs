//! Run state owned by the orchestrator: subgraph, frontier, occurrence table and
//! the append-only logs. Everything here serializes, so a snapshot fully captures
//! a run between iterations.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::{Direction, Triple};
use crate::metrics::MetricsRecord;
use crate::ordering::OrderingStats;
use crate::ranker::{OccurrenceTable, PathKey, RankedPath};

/// A triple accepted into the narrative subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphEntry {
    pub triple: Triple,
    /// Relative to the node that was expanded.
    pub direction: Direction,
    pub iteration: usize,
}

/// A triple leading to a not-yet-expanded candidate node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub triple: Triple,
    pub direction: Direction,
    pub iteration: usize,
    /// Domain (ingoing) or range (outgoing) classes with their ancestors.
    pub superclass: Vec<String>,
}

impl FrontierEntry {
    /// The candidate node: subject of ingoing triples, object of outgoing ones.
    pub fn node(&self) -> &str {
        self.triple.neighbour(self.direction)
    }

    pub fn is_relevant(&self, focus_types: &[String]) -> bool {
        self.superclass.iter().any(|c| focus_types.contains(c))
    }
}

/// Pending-ingoing and pending-outgoing triples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontier {
    pub ingoing: Vec<FrontierEntry>,
    pub outgoing: Vec<FrontierEntry>,
}

impl Frontier {
    pub fn len(&self) -> usize {
        self.ingoing.len() + self.outgoing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingoing.is_empty() && self.outgoing.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.ingoing.iter().chain(&self.outgoing)
    }

    /// Distinct candidate nodes, sorted.
    pub fn nodes(&self) -> BTreeSet<&str> {
        self.entries().map(FrontierEntry::node).collect()
    }

    /// Append the entries not already present, returning the ones actually added.
    ///
    /// Entries whose node is in `expanded` are dropped as well.
    pub fn extend_new(
        &mut self,
        entries: Vec<FrontierEntry>,
        expanded: &BTreeSet<String>,
    ) -> Vec<FrontierEntry> {
        let mut seen: HashSet<(Direction, Triple)> = self
            .entries()
            .map(|e| (e.direction, e.triple.clone()))
            .collect();
        let mut added = Vec::new();
        for entry in entries {
            if expanded.contains(entry.node()) {
                continue;
            }
            if !seen.insert((entry.direction, entry.triple.clone())) {
                continue;
            }
            match entry.direction {
                Direction::Ingoing => self.ingoing.push(entry.clone()),
                Direction::Outgoing => self.outgoing.push(entry.clone()),
            }
            added.push(entry);
        }
        added
    }

    /// Drop every entry whose node has been expanded, returning the removed entries.
    pub fn purge(&mut self, expanded: &BTreeSet<String>) -> Vec<FrontierEntry> {
        let mut removed = Vec::new();
        for side in [&mut self.ingoing, &mut self.outgoing] {
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(side)
                .into_iter()
                .partition(|e| expanded.contains(e.node()));
            *side = kept;
            removed.extend(gone);
        }
        removed
    }
}

/// One row of the expansion log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRecord {
    pub iteration: usize,
    /// Winning path; `None` for the start node and random-walk rows.
    pub path: Option<PathKey>,
    pub node_count: usize,
    pub nodes: Vec<String>,
    pub score: Option<f64>,
}

/// Neighbours discarded while expanding one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedRecord {
    pub iteration: usize,
    pub node: String,
    pub discarded: Vec<String>,
}

/// A node skipped after exhausting its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedNode {
    pub iteration: usize,
    pub node: String,
    pub error: String,
}

/// Nodes chosen for the coming iteration, and the path that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub path: Option<RankedPath>,
    pub nodes: Vec<String>,
}

/// Complete state of a run between two iterations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    /// Last completed iteration; 0 before the first.
    pub iteration: usize,
    pub subgraph: Vec<SubgraphEntry>,
    pub frontier: Frontier,
    pub occurrences: OccurrenceTable,
    pub expanded: Vec<ExpandedRecord>,
    pub nodes_expanded: BTreeSet<String>,
    pub discarded: Vec<DiscardedRecord>,
    pub ordering: Vec<OrderingStats>,
    pub metrics: Vec<MetricsRecord>,
    pub failed: Vec<FailedNode>,
    /// Decided at the end of the last iteration; consumed by the next one.
    pub next: Option<Batch>,
}

impl SearchState {
    /// Initial state: nothing expanded, only the start node scheduled.
    pub fn new(start: &str) -> Self {
        Self {
            next: Some(Batch {
                path: None,
                nodes: vec![start.to_string()],
            }),
            ..Default::default()
        }
    }

    pub fn subgraph_at(&self, iteration: usize) -> impl Iterator<Item = &SubgraphEntry> {
        self.subgraph.iter().filter(move |e| e.iteration == iteration)
    }

    /// Every subject and object of the subgraph, deduplicated.
    pub fn subgraph_nodes(&self) -> BTreeSet<&str> {
        self.subgraph
            .iter()
            .flat_map(|e| [e.triple.subject.as_str(), e.triple.object.as_str()])
            .filter(|n| !crate::graph::is_literal(n))
            .collect()
    }
}
