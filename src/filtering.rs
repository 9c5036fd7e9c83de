//! Narrative filters: decide which neighbours of an expanded node are off-topic.
//!
//! Three dimensions can be enabled independently:
//!
//! - **where**: neighbours typed as a place are discarded
//! - **who**: neighbours typed as a person are discarded
//! - **when**: neighbours dated outside the window are discarded, either from
//!   their temporal predicates or from a year embedded in their label
//!
//! Missing predicates never raise; they simply contribute nothing.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{DateWindow, NarrativeFilters};
use crate::dataset::DatasetConfig;
use crate::graph::{self, Direction, Triple};

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{4}").unwrap());

/// Filtering engine for one run. Immutable, shared by all expansions.
#[derive(Debug, Clone)]
pub struct Filtering {
    filters: NarrativeFilters,
    window: Option<DateWindow>,
    places: HashSet<String>,
    persons: HashSet<String>,
    start_dates: HashSet<String>,
    end_dates: HashSet<String>,
    point_in_time: HashSet<String>,
    lexical_years: bool,
}

impl Filtering {
    pub fn new(dataset: &DatasetConfig, filters: NarrativeFilters, window: Option<DateWindow>) -> Self {
        let set = |v: &[String]| v.iter().cloned().collect::<HashSet<_>>();
        Self {
            filters,
            window,
            places: set(&dataset.places),
            persons: set(&dataset.persons),
            start_dates: set(&dataset.start_dates),
            end_dates: set(&dataset.end_dates),
            point_in_time: set(&dataset.point_in_time),
            lexical_years: dataset.lexical_year_filter,
        }
    }

    /// Neighbour nodes to discard.
    ///
    /// An empty `type_date` frame discards every neighbour: without type or date
    /// information a node cannot be judged relevant. Literals are never neighbours.
    pub fn discard_nodes(
        &self,
        ingoing: &[Triple],
        outgoing: &[Triple],
        type_date: &[Triple],
    ) -> BTreeSet<String> {
        if type_date.is_empty() {
            return ingoing
                .iter()
                .map(|t| t.neighbour(Direction::Ingoing))
                .chain(outgoing.iter().map(|t| t.neighbour(Direction::Outgoing)))
                .filter(|n| !graph::is_literal(n))
                .map(str::to_string)
                .collect();
        }

        let mut discarded = BTreeSet::new();
        if !self.filters.any() {
            return discarded;
        }
        if self.filters.r#where {
            discarded.extend(typed_as(type_date, &self.places));
        }
        if self.filters.who {
            discarded.extend(typed_as(type_date, &self.persons));
        }
        if self.filters.when {
            if let Some(window) = self.window {
                discarded.extend(self.outside_window(type_date, window));
                if self.lexical_years {
                    discarded.extend(lexically_outside(ingoing, Direction::Ingoing, window));
                    discarded.extend(lexically_outside(outgoing, Direction::Outgoing, window));
                }
            }
        }
        discarded
    }

    /// Subjects whose temporal predicates place them outside the window.
    ///
    /// An end date before the window start, a start date after the window end, or a
    /// point in time outside the window all discard. Boundaries are inclusive.
    fn outside_window(&self, type_date: &[Triple], window: DateWindow) -> Vec<String> {
        type_date
            .iter()
            .filter(|t| {
                let Some(date) = graph::parse_date(&t.object) else {
                    return false;
                };
                (self.end_dates.contains(&t.predicate) && date < window.start)
                    || (self.start_dates.contains(&t.predicate) && date > window.end)
                    || (self.point_in_time.contains(&t.predicate) && !window.contains(date))
            })
            .map(|t| t.subject.clone())
            .collect()
    }
}

fn typed_as(type_date: &[Triple], classes: &HashSet<String>) -> Vec<String> {
    type_date
        .iter()
        .filter(|t| classes.contains(&t.object))
        .map(|t| t.subject.clone())
        .collect()
}

/// First four-digit number in the node's label, if any.
pub fn label_year(node: &str) -> Option<i32> {
    YEAR.find(graph::label(node))?.as_str().parse().ok()
}

fn lexically_outside(triples: &[Triple], direction: Direction, window: DateWindow) -> Vec<String> {
    triples
        .iter()
        .map(|t| t.neighbour(direction))
        .filter(|node| !graph::is_literal(node))
        .filter(|node| label_year(node).is_some_and(|year| !window.contains_year(year)))
        .map(str::to_string)
        .collect()
}
