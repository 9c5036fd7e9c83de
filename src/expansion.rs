//! Node expansion: fetch one node's neighbourhood and split it into subgraph
//! triples, frontier triples and discarded neighbours.
//!
//! The subgraph and frontier outputs overlap on purpose: a neighbour of a focus
//! type enters the subgraph *and* stays expandable. Only discarded neighbours
//! are excluded from both.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::dataset::DatasetConfig;
use crate::filtering::Filtering;
use crate::graph::source::{SourceResult, TripleSource};
use crate::graph::{Direction, Triple, is_literal};
use crate::lookup::LookupTables;

/// Outcome of expanding one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionResult {
    pub node: String,
    pub subgraph_ingoing: Vec<Triple>,
    pub frontier_ingoing: Vec<Triple>,
    pub subgraph_outgoing: Vec<Triple>,
    pub frontier_outgoing: Vec<Triple>,
    pub discarded: BTreeSet<String>,
}

impl ExpansionResult {
    fn all_discarded(node: &str, ingoing: &[Triple], outgoing: &[Triple]) -> Self {
        Self {
            node: node.to_string(),
            discarded: ingoing
                .iter()
                .map(|t| t.neighbour(Direction::Ingoing))
                .chain(outgoing.iter().map(|t| t.neighbour(Direction::Outgoing)))
                .filter(|n| !is_literal(n))
                .map(str::to_string)
                .collect(),
            ..Default::default()
        }
    }

    /// Neighbours whose triples entered the subgraph.
    pub fn kept(&self) -> BTreeSet<&str> {
        self.subgraph_ingoing
            .iter()
            .map(|t| t.neighbour(Direction::Ingoing))
            .chain(self.subgraph_outgoing.iter().map(|t| t.neighbour(Direction::Outgoing)))
            .collect()
    }
}

/// Shared, read-only expansion context. Safe to call from several threads.
///
/// Type predicates are not narrative edges: they are fetched for neighbours only,
/// so ontology classes never become neighbours of an expanded node.
#[derive(Clone)]
pub struct Expansion {
    source: Arc<dyn TripleSource>,
    filtering: Filtering,
    lookup: Arc<LookupTables>,
    denylist: Vec<String>,
    specific: Vec<String>,
    type_predicates: Vec<String>,
    focus_types: Vec<String>,
}

impl Expansion {
    pub fn new(
        source: Arc<dyn TripleSource>,
        dataset: &DatasetConfig,
        filtering: Filtering,
        lookup: Arc<LookupTables>,
    ) -> Self {
        Self {
            source,
            filtering,
            lookup,
            denylist: dataset
                .predicate_denylist
                .iter()
                .chain(&dataset.rdf_type)
                .cloned()
                .collect(),
            specific: dataset.specific_predicates(),
            type_predicates: dataset.rdf_type.clone(),
            focus_types: dataset.focus_types.clone(),
        }
    }

    /// Expand `node`. Source failures propagate unchanged.
    pub fn expand(&self, node: &str) -> SourceResult<ExpansionResult> {
        let nb = self.source.neighbourhood(node, &self.denylist, &self.specific)?;

        if nb.type_date.is_empty() {
            tracing::debug!(node, "no type/date information, discarding all neighbours");
            return Ok(ExpansionResult::all_discarded(node, &nb.ingoing, &nb.outgoing));
        }

        let discarded = self
            .filtering
            .discard_nodes(&nb.ingoing, &nb.outgoing, &nb.type_date);
        let to_keep: BTreeSet<&str> = nb
            .type_date
            .iter()
            .filter(|t| self.type_predicates.contains(&t.predicate))
            .filter(|t| self.lookup.is_a(&t.object, &self.focus_types))
            .map(|t| t.subject.as_str())
            .filter(|n| !discarded.contains(*n))
            .collect();

        let split = |triples: &[Triple], direction: Direction| {
            let subgraph: Vec<Triple> = triples
                .iter()
                .filter(|t| to_keep.contains(t.neighbour(direction)))
                .cloned()
                .collect();
            let frontier: Vec<Triple> = triples
                .iter()
                .filter(|t| {
                    let n = t.neighbour(direction);
                    !is_literal(n) && !discarded.contains(n)
                })
                .cloned()
                .collect();
            (subgraph, frontier)
        };
        let (subgraph_ingoing, frontier_ingoing) = split(&nb.ingoing, Direction::Ingoing);
        let (subgraph_outgoing, frontier_outgoing) = split(&nb.outgoing, Direction::Outgoing);

        tracing::debug!(
            node,
            ingoing = nb.ingoing.len(),
            outgoing = nb.outgoing.len(),
            kept = to_keep.len(),
            discarded = discarded.len(),
            "expanded node"
        );

        Ok(ExpansionResult {
            node: node.to_string(),
            subgraph_ingoing,
            frontier_ingoing,
            subgraph_outgoing,
            frontier_outgoing,
            discarded,
        })
    }
}
