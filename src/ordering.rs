//! Frontier ordering: annotate pending triples with the superclasses implied by
//! their predicate's domain (ingoing) or range (outgoing).
//!
//! The annotation feeds the ranker's relevance tiers. The counters kept here are
//! diagnostics only and never prune anything.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::graph::{Direction, Triple};
use crate::lookup::LookupTables;
use crate::state::FrontierEntry;

/// Counters for one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionStats {
    /// Triples seen.
    pub total: usize,
    /// Triples with a non-empty superclass annotation.
    pub with_info: usize,
    /// Annotated triples whose superclasses include a focus type.
    pub relevant: usize,
}

/// Diagnostic counters for one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingStats {
    pub iteration: usize,
    pub ingoing: DirectionStats,
    pub outgoing: DirectionStats,
}

impl OrderingStats {
    pub fn new(iteration: usize) -> Self {
        Self {
            iteration,
            ..Default::default()
        }
    }

    fn direction_mut(&mut self, direction: Direction) -> &mut DirectionStats {
        match direction {
            Direction::Ingoing => &mut self.ingoing,
            Direction::Outgoing => &mut self.outgoing,
        }
    }
}

/// Ordering engine for one run.
#[derive(Debug, Clone)]
pub struct Ordering {
    lookup: Arc<LookupTables>,
    focus_types: Vec<String>,
    domain_range: bool,
}

impl Ordering {
    pub fn new(lookup: Arc<LookupTables>, focus_types: Vec<String>, domain_range: bool) -> Self {
        Self {
            lookup,
            focus_types,
            domain_range,
        }
    }

    /// Superclass annotation for one triple; empty when domain/range is disabled
    /// or the predicate is unknown.
    pub fn superclasses(&self, predicate: &str, direction: Direction) -> Vec<String> {
        if !self.domain_range {
            return Vec::new();
        }
        let classes = self.lookup.classes_for(predicate, direction);
        self.lookup
            .with_superclasses(classes.iter().map(String::as_str))
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Annotate `triples` discovered at `iteration`, updating `stats`.
    pub fn annotate(
        &self,
        triples: Vec<Triple>,
        direction: Direction,
        iteration: usize,
        stats: &mut OrderingStats,
    ) -> Vec<FrontierEntry> {
        let counters = stats.direction_mut(direction);
        triples
            .into_iter()
            .map(|triple| {
                let superclass = self.superclasses(&triple.predicate, direction);
                counters.total += 1;
                if !superclass.is_empty() {
                    counters.with_info += 1;
                    if superclass.iter().any(|c| self.focus_types.contains(c)) {
                        counters.relevant += 1;
                    }
                }
                FrontierEntry {
                    triple,
                    direction,
                    iteration,
                    superclass,
                }
            })
            .collect()
    }
}
