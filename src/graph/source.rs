//! The triple-retrieval contract every storage backend satisfies.

use std::collections::BTreeSet;

use crate::error::SourceError;

use super::{Triple, is_literal};

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// A (subject?, predicate?, object?) pattern. At least one term must be bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

impl TriplePattern {
    pub fn subject(iri: impl Into<String>) -> Self {
        Self {
            subject: Some(iri.into()),
            ..Default::default()
        }
    }

    pub fn object(term: impl Into<String>) -> Self {
        Self {
            object: Some(term.into()),
            ..Default::default()
        }
    }

    pub fn with_predicate(mut self, iri: impl Into<String>) -> Self {
        self.predicate = Some(iri.into());
        self
    }

    /// Fails with [`SourceError::UnboundPattern`] when nothing is bound.
    pub fn ensure_bound(&self) -> SourceResult<()> {
        if self.subject.is_none() && self.predicate.is_none() && self.object.is_none() {
            return Err(SourceError::UnboundPattern);
        }
        Ok(())
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_deref().is_none_or(|s| s == triple.subject)
            && self.predicate.as_deref().is_none_or(|p| p == triple.predicate)
            && self.object.as_deref().is_none_or(|o| o == triple.object)
    }
}

/// The one-hop neighbourhood of a node, as needed by node expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbourhood {
    /// Triples whose object is the node.
    pub ingoing: Vec<Triple>,
    /// Triples whose subject is the node.
    pub outgoing: Vec<Triple>,
    /// Type and date triples describing the neighbours.
    pub type_date: Vec<Triple>,
}

impl Neighbourhood {
    /// IRIs adjacent to the node, in a stable order. Literals are not nodes.
    pub fn neighbours(&self) -> BTreeSet<&str> {
        self.ingoing
            .iter()
            .map(|t| t.subject.as_str())
            .chain(self.outgoing.iter().map(|t| t.object.as_str()))
            .filter(|n| !is_literal(n))
            .collect()
    }
}

/// Read-only access to a knowledge graph.
///
/// Implementations are shared across parallel node expansions, hence `Send + Sync`.
pub trait TripleSource: Send + Sync {
    /// All triples matching `pattern`.
    fn triples(&self, pattern: &TriplePattern) -> SourceResult<Vec<Triple>>;

    /// Ingoing and outgoing triples of `node` (predicates in `denylist` excluded),
    /// plus the triples of each neighbour whose predicate is in `specific`.
    fn neighbourhood(
        &self,
        node: &str,
        denylist: &[String],
        specific: &[String],
    ) -> SourceResult<Neighbourhood> {
        let allowed = |t: &Triple| !denylist.contains(&t.predicate);
        let ingoing: Vec<Triple> = self
            .triples(&TriplePattern::object(node))?
            .into_iter()
            .filter(allowed)
            .collect();
        let outgoing: Vec<Triple> = self
            .triples(&TriplePattern::subject(node))?
            .into_iter()
            .filter(allowed)
            .collect();

        let mut nb = Neighbourhood {
            ingoing,
            outgoing,
            type_date: Vec::new(),
        };
        let mut type_date = Vec::new();
        for neighbour in nb.neighbours() {
            for predicate in specific {
                let pattern = TriplePattern::subject(neighbour).with_predicate(predicate.as_str());
                type_date.extend(self.triples(&pattern)?);
            }
        }
        nb.type_date = type_date;
        Ok(nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_pattern_is_rejected() {
        assert!(matches!(
            TriplePattern::default().ensure_bound(),
            Err(SourceError::UnboundPattern)
        ));
        assert!(TriplePattern::subject("s").ensure_bound().is_ok());
    }

    #[test]
    fn pattern_matching() {
        let t = Triple::new("s", "p", "o");
        assert!(TriplePattern::subject("s").matches(&t));
        assert!(TriplePattern::object("o").with_predicate("p").matches(&t));
        assert!(!TriplePattern::object("o").with_predicate("q").matches(&t));
    }

    #[test]
    fn neighbours_skip_literals() {
        let nb = Neighbourhood {
            ingoing: vec![Triple::new("a", "p", "n")],
            outgoing: vec![
                Triple::new("n", "p", "b"),
                Triple::new("n", "label", "\"Name\"@en"),
            ],
            type_date: vec![],
        };
        let neighbours: Vec<&str> = nb.neighbours().into_iter().collect();
        assert_eq!(neighbours, vec!["a", "b"]);
    }
}
