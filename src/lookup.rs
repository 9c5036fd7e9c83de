//! Static domain/range/superclass tables, extracted offline and read once.
//!
//! Each table is a JSON object mapping an IRI to a list of IRIs:
//! `domain[predicate]`, `range[predicate]`, `superclasses[class]` (all ancestors).

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::LookupError;
use crate::graph::Direction;

pub type LookupResult<T> = std::result::Result<T, LookupError>;

type Table = HashMap<String, Vec<String>>;

/// Read-only lookup tables, shared by every expansion of a run.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    domain: Table,
    range: Table,
    superclasses: Table,
}

fn load_table(path: &Path) -> LookupResult<Table> {
    let content = std::fs::read_to_string(path).map_err(|source| LookupError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| LookupError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

impl LookupTables {
    pub fn new(domain: Table, range: Table, superclasses: Table) -> Self {
        Self {
            domain,
            range,
            superclasses,
        }
    }

    /// Load the tables that are configured; missing ones stay empty.
    pub fn load(
        domain: Option<&Path>,
        range: Option<&Path>,
        superclasses: Option<&Path>,
    ) -> LookupResult<Self> {
        let load = |path: Option<&Path>| path.map(load_table).transpose();
        let tables = Self {
            domain: load(domain)?.unwrap_or_default(),
            range: load(range)?.unwrap_or_default(),
            superclasses: load(superclasses)?.unwrap_or_default(),
        };
        tracing::debug!(
            domain = tables.domain.len(),
            range = tables.range.len(),
            superclasses = tables.superclasses.len(),
            "loaded lookup tables"
        );
        Ok(tables)
    }

    /// Classes expected on the neighbour's side of `predicate`: its domain for
    /// ingoing triples, its range for outgoing ones.
    pub fn classes_for(&self, predicate: &str, direction: Direction) -> &[String] {
        let table = match direction {
            Direction::Ingoing => &self.domain,
            Direction::Outgoing => &self.range,
        };
        table.get(predicate).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The given classes together with all of their ancestors.
    pub fn with_superclasses<'a>(
        &'a self,
        classes: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<&'a str> {
        let mut out = BTreeSet::new();
        for class in classes {
            out.insert(class);
            if let Some(ancestors) = self.superclasses.get(class) {
                out.extend(ancestors.iter().map(String::as_str));
            }
        }
        out
    }

    /// Whether `class` is, or descends from, one of `targets`.
    pub fn is_a(&self, class: &str, targets: &[String]) -> bool {
        if targets.iter().any(|t| t == class) {
            return true;
        }
        self.superclasses
            .get(class)
            .is_some_and(|ancestors| ancestors.iter().any(|a| targets.contains(a)))
    }
}
