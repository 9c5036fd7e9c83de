//! SPARQL query construction shared by the SPARQL-backed sources.
//!
//! Both the local oxigraph store and remote endpoints answer the same SELECT
//! queries; they only differ in how a query string becomes binding rows.

use std::collections::BTreeMap;

use crate::error::SourceError;

use super::source::{Neighbourhood, SourceResult, TriplePattern};
use super::{Triple, is_literal};

/// One solution row: variable name to term (bare IRI or N-Triples literal).
pub type Bindings = BTreeMap<String, String>;

/// Neighbours per `VALUES` block in type/date queries.
pub const VALUES_BATCH: usize = 50;

/// Something that can evaluate a SPARQL SELECT query.
pub trait SelectQuery {
    fn select(&self, query: &str) -> SourceResult<Vec<Bindings>>;
}

/// Render a term for inclusion in a query.
pub fn term(value: &str) -> String {
    if is_literal(value) {
        value.to_string()
    } else {
        format!("<{value}>")
    }
}

fn not_in_filter(denylist: &[String]) -> String {
    if denylist.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = denylist.iter().map(|p| term(p)).collect();
    format!(" FILTER(?p NOT IN ({}))", listed.join(", "))
}

/// SELECT for an arbitrary pattern; bound positions are inlined.
pub fn pattern_query(pattern: &TriplePattern) -> SourceResult<String> {
    pattern.ensure_bound()?;
    let slot = |bound: &Option<String>, var: &str| match bound {
        Some(value) => term(value),
        None => format!("?{var}"),
    };
    Ok(format!(
        "SELECT * WHERE {{ {} {} {} }}",
        slot(&pattern.subject, "s"),
        slot(&pattern.predicate, "p"),
        slot(&pattern.object, "o"),
    ))
}

pub fn ingoing_query(node: &str, denylist: &[String]) -> String {
    format!(
        "SELECT ?s ?p WHERE {{ ?s ?p {} .{} }}",
        term(node),
        not_in_filter(denylist)
    )
}

pub fn outgoing_query(node: &str, denylist: &[String]) -> String {
    format!(
        "SELECT ?p ?o WHERE {{ {} ?p ?o .{} }}",
        term(node),
        not_in_filter(denylist)
    )
}

/// Type/date triples for a batch of neighbours.
pub fn specific_query(neighbours: &[&str], specific: &[String]) -> String {
    let subjects: Vec<String> = neighbours.iter().map(|n| term(n)).collect();
    let predicates: Vec<String> = specific.iter().map(|p| term(p)).collect();
    format!(
        "SELECT ?s ?p ?o WHERE {{ VALUES ?s {{ {} }} VALUES ?p {{ {} }} ?s ?p ?o }}",
        subjects.join(" "),
        predicates.join(" ")
    )
}

/// Turn solution rows into triples, filling bound positions from `pattern`.
pub fn rows_to_triples(rows: Vec<Bindings>, pattern: &TriplePattern) -> SourceResult<Vec<Triple>> {
    rows.into_iter()
        .map(|mut row| {
            let mut take = |bound: &Option<String>, var: &str| {
                bound
                    .clone()
                    .or_else(|| row.remove(var))
                    .ok_or_else(|| SourceError::Malformed {
                        message: format!("solution has no binding for ?{var}"),
                    })
            };
            Ok(Triple {
                subject: take(&pattern.subject, "s")?,
                predicate: take(&pattern.predicate, "p")?,
                object: take(&pattern.object, "o")?,
            })
        })
        .collect()
}

/// [`TripleSource::triples`](super::source::TripleSource::triples) over SPARQL.
pub fn sparql_triples<Q: SelectQuery + ?Sized>(
    runner: &Q,
    pattern: &TriplePattern,
) -> SourceResult<Vec<Triple>> {
    let rows = runner.select(&pattern_query(pattern)?)?;
    rows_to_triples(rows, pattern)
}

/// [`TripleSource::neighbourhood`](super::source::TripleSource::neighbourhood) over SPARQL,
/// with denylist filtering pushed into the query and batched type/date lookups.
pub fn sparql_neighbourhood<Q: SelectQuery + ?Sized>(
    runner: &Q,
    node: &str,
    denylist: &[String],
    specific: &[String],
) -> SourceResult<Neighbourhood> {
    let ingoing = rows_to_triples(
        runner.select(&ingoing_query(node, denylist))?,
        &TriplePattern::object(node),
    )?;
    let outgoing = rows_to_triples(
        runner.select(&outgoing_query(node, denylist))?,
        &TriplePattern::subject(node),
    )?;
    let mut nb = Neighbourhood {
        ingoing,
        outgoing,
        type_date: Vec::new(),
    };
    if specific.is_empty() {
        return Ok(nb);
    }

    let neighbours: Vec<&str> = nb.neighbours().into_iter().collect();
    let mut type_date = Vec::new();
    for batch in neighbours.chunks(VALUES_BATCH) {
        let rows = runner.select(&specific_query(batch, specific))?;
        type_date.extend(rows_to_triples(rows, &TriplePattern::default())?);
    }
    nb.type_date = type_date;
    Ok(nb)
}
