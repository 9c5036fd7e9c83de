//! Remote SPARQL endpoint (DBpedia, Wikidata Query Service, ...).
//!
//! Uses `ureq` for synchronous HTTP requests. Every request carries a timeout,
//! and an optional politeness delay is inserted before each request because
//! public endpoints rate-limit aggressive clients.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::SourceError;

use super::{Triple, literal};
use super::query::{self, Bindings, SelectQuery};
use super::source::{Neighbourhood, SourceResult, TriplePattern, TripleSource};

const SPARQL_JSON: &str = "application/sparql-results+json";
const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A SPARQL 1.1 protocol endpoint queried with GET requests.
pub struct SparqlEndpoint {
    url: String,
    agent: ureq::Agent,
    delay: Duration,
}

impl SparqlEndpoint {
    pub fn new(url: impl Into<String>, timeout: Duration, delay: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("narrative-search/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            url: url.into(),
            agent,
            delay,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SparqlJson {
    results: SparqlJsonResults,
}

#[derive(Debug, Deserialize)]
struct SparqlJsonResults {
    bindings: Vec<HashMap<String, SparqlJsonTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlJsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
}

impl SparqlJsonTerm {
    /// Bare IRI, `_:id` for blank nodes, N-Triples form for literals.
    fn into_term(self) -> String {
        match self.kind.as_str() {
            "uri" => self.value,
            "bnode" => format!("_:{}", self.value),
            _ => match (self.lang, self.datatype) {
                (Some(lang), _) => format!("{}@{lang}", literal(&self.value, None)),
                (None, Some(dt)) if dt != RDF_LANG_STRING => literal(&self.value, Some(&dt)),
                _ => literal(&self.value, None),
            },
        }
    }
}

fn parse_results(body: SparqlJson) -> Vec<Bindings> {
    body.results
        .bindings
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(var, term)| (var, term.into_term()))
                .collect()
        })
        .collect()
}

impl SelectQuery for SparqlEndpoint {
    fn select(&self, sparql: &str) -> SourceResult<Vec<Bindings>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        tracing::trace!(url = %self.url, query = sparql, "sending SPARQL query");

        let response = self
            .agent
            .get(&self.url)
            .query("query", sparql)
            .query("format", "json")
            .set("Accept", SPARQL_JSON)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => SourceError::HttpStatus {
                    url: self.url.clone(),
                    status,
                },
                ureq::Error::Transport(transport) => SourceError::Unreachable {
                    url: self.url.clone(),
                    message: transport.to_string(),
                },
            })?;

        let body: SparqlJson = response.into_json().map_err(|e| SourceError::Malformed {
            message: format!("{}: {e}", self.url),
        })?;
        Ok(parse_results(body))
    }
}

impl TripleSource for SparqlEndpoint {
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

impl std::fmt::Debug for SparqlEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlEndpoint")
            .field("url", &self.url)
            .field("delay", &self.delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sparql_json_terms() {
        let json = r#"{
            "head": {"vars": ["s", "o"]},
            "results": {"bindings": [
                {"s": {"type": "uri", "value": "http://dbpedia.org/resource/Battle_of_Valmy"},
                 "o": {"type": "typed-literal", "value": "1792-09-20",
                       "datatype": "http://www.w3.org/2001/XMLSchema#date"}},
                {"s": {"type": "bnode", "value": "b0"},
                 "o": {"type": "literal", "value": "Valmy", "xml:lang": "fr"}}
            ]}
        }"#;
        let body: SparqlJson = serde_json::from_str(json).unwrap();
        let rows = parse_results(body);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["s"], "http://dbpedia.org/resource/Battle_of_Valmy");
        assert_eq!(
            rows[0]["o"],
            "\"1792-09-20\"^^<http://www.w3.org/2001/XMLSchema#date>"
        );
        assert_eq!(rows[1]["s"], "_:b0");
        assert_eq!(rows[1]["o"], "\"Valmy\"@fr");
    }

    #[test]
    fn unreachable_endpoint_is_retryable() {
        let endpoint = SparqlEndpoint::new(
            "http://127.0.0.1:9/sparql",
            Duration::from_millis(200),
            Duration::ZERO,
        );
        let err = endpoint
            .triples(&TriplePattern::subject("http://example.org/a"))
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
