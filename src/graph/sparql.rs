//! Local SPARQL store backed by oxigraph.
//!
//! Loads an N-Triples dump (or individual triples) and answers the search's
//! queries in-process, without a network round trip.

use std::io::BufReader;
use std::path::Path;

use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphNameRef, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::SourceError;

use super::query::{self, Bindings, SelectQuery};
use super::source::{Neighbourhood, SourceResult, TriplePattern, TripleSource};
use super::{Triple, is_literal, split_literal, unescape_literal};

/// SPARQL-capable RDF store.
pub struct SparqlStore {
    store: Store,
}

impl SparqlStore {
    /// Create a new in-memory SPARQL store (no persistence).
    pub fn in_memory() -> SourceResult<Self> {
        let store = Store::new().map_err(|e| SourceError::Sparql {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Create an in-memory store and load an N-Triples dump into it.
    pub fn from_ntriples(path: &Path) -> SourceResult<Self> {
        let load_err = |message: String| SourceError::Load {
            path: path.display().to_string(),
            message,
        };
        let file = std::fs::File::open(path).map_err(|e| load_err(e.to_string()))?;
        let store = Self::in_memory()?;
        store
            .store
            .load_from_reader(RdfFormat::NTriples, BufReader::new(file))
            .map_err(|e| load_err(e.to_string()))?;
        tracing::info!(path = %path.display(), "loaded N-Triples dump");
        Ok(store)
    }

    /// Insert a triple. Object terms in N-Triples literal form become literals.
    pub fn insert_triple(&self, triple: &Triple) -> SourceResult<()> {
        let quad = Quad::new(
            named_node(&triple.subject)?,
            named_node(&triple.predicate)?,
            object_term(&triple.object)?,
            GraphNameRef::DefaultGraph,
        );
        self.store.insert(&quad).map_err(|e| SourceError::Sparql {
            message: format!("insert failed: {e}"),
        })?;
        Ok(())
    }

    /// Number of triples in the store.
    pub fn len(&self) -> SourceResult<usize> {
        self.store.len().map_err(|e| SourceError::Sparql {
            message: format!("count failed: {e}"),
        })
    }

    pub fn is_empty(&self) -> SourceResult<bool> {
        self.len().map(|n| n == 0)
    }
}

fn named_node(iri: &str) -> SourceResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| SourceError::Sparql {
        message: format!("invalid IRI {iri}: {e}"),
    })
}

fn object_term(value: &str) -> SourceResult<Term> {
    if !is_literal(value) {
        return Ok(named_node(value)?.into());
    }
    let (escaped, suffix) = split_literal(value).ok_or_else(|| SourceError::Sparql {
        message: format!("unterminated literal {value}"),
    })?;
    let lexical = unescape_literal(escaped);
    let literal = if let Some(dt) = suffix.strip_prefix("^^<").and_then(|s| s.strip_suffix('>')) {
        Literal::new_typed_literal(lexical, named_node(dt)?)
    } else if let Some(lang) = suffix.strip_prefix('@') {
        Literal::new_language_tagged_literal(lexical, lang).map_err(|e| SourceError::Sparql {
            message: format!("invalid language tag {lang}: {e}"),
        })?
    } else {
        Literal::new_simple_literal(lexical)
    };
    Ok(literal.into())
}

/// Bare IRI for named nodes, N-Triples form for everything else.
fn term_to_string(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        other => other.to_string(),
    }
}

impl SelectQuery for SparqlStore {
    fn select(&self, sparql: &str) -> SourceResult<Vec<Bindings>> {
        let results = self.store.query(sparql).map_err(|e| SourceError::Sparql {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| SourceError::Sparql {
                        message: format!("solution error: {e}"),
                    })?;
                    let row: Bindings = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), term_to_string(term)))
                        .collect();
                    rows.push(row);
                }
                Ok(rows)
            }
            _ => Err(SourceError::Sparql {
                message: "expected SELECT solutions".into(),
            }),
        }
    }
}

impl TripleSource for SparqlStore {
    fn triples(&self, pattern: &TriplePattern) -> SourceResult<Vec<Triple>> {
        query::sparql_triples(self, pattern)
    }

    fn neighbourhood(
        &self,
        node: &str,
        denylist: &[String],
        specific: &[String],
    ) -> SourceResult<Neighbourhood> {
        query::sparql_neighbourhood(self, node, denylist, specific)
    }
}

impl std::fmt::Debug for SparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlStore").finish()
    }
}
