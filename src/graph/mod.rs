//! Triples and triple sources.
//!
//! The search never owns the knowledge graph: it reads it lazily through a
//! [`TripleSource`](source::TripleSource), one neighbourhood at a time.
//!
//! - **In-memory source** ([`memory::MemorySource`]): indexed maps, for fixtures and small dumps
//! - **Local store** ([`sparql::SparqlStore`]): `oxigraph` loaded from an N-Triples dump
//! - **Remote endpoint** ([`endpoint::SparqlEndpoint`]): SPARQL over HTTP via `ureq`
//!
//! Terms are plain strings: IRIs are stored bare, literals keep their N-Triples
//! form (`"1789-07-14"^^<http://www.w3.org/2001/XMLSchema#date>`).

pub mod endpoint;
pub mod memory;
pub mod query;
pub mod source;
pub mod sparql;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A triple (subject, predicate, object) read from the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    /// Subject IRI.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: String,
    /// Object IRI or literal.
    pub object: String,
}

impl Triple {
    /// Create a new triple.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// The node on the far side of the triple, seen from the expanded node.
    ///
    /// Ingoing triples point at the expanded node, so the neighbour is the subject;
    /// outgoing triples start from it, so the neighbour is the object.
    pub fn neighbour(&self, direction: Direction) -> &str {
        match direction {
            Direction::Ingoing => &self.subject,
            Direction::Outgoing => &self.object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Direction of a triple relative to the node being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The expanded node is the object.
    Ingoing,
    /// The expanded node is the subject.
    Outgoing,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingoing => "ingoing",
            Self::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a term is a literal rather than an IRI.
pub fn is_literal(term: &str) -> bool {
    term.starts_with('"')
}

/// Build a literal term in N-Triples form.
pub fn literal(value: &str, datatype: Option<&str>) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    match datatype {
        Some(dt) => format!("\"{escaped}\"^^<{dt}>"),
        None => format!("\"{escaped}\""),
    }
}

/// Split an N-Triples literal into its still-escaped lexical form and the suffix
/// after the closing quote (`^^<dt>`, `@lang` or empty). `None` if unterminated.
pub fn split_literal(term: &str) -> Option<(&str, &str)> {
    let body = term.strip_prefix('"')?;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some((&body[..i], &body[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Undo N-Triples string escapes.
pub fn unescape_literal(lexical: &str) -> String {
    let mut out = String::with_capacity(lexical.len());
    let mut chars = lexical.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0C}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lexical value of a literal, or the term itself for IRIs.
pub fn literal_value(term: &str) -> &str {
    match split_literal(term) {
        Some((lexical, _)) => lexical,
        None => term,
    }
}

/// Human-readable label derived from a term: the last IRI segment, or a literal's value.
pub fn label(term: &str) -> &str {
    if is_literal(term) {
        return literal_value(term);
    }
    let trimmed = term.trim_end_matches('/');
    match trimmed.rfind(['/', '#']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Parse a date literal (`xsd:date`, `xsd:dateTime`, Wikidata `+YYYY-MM-DDT..Z`, or a bare year).
pub fn parse_date(term: &str) -> Option<NaiveDate> {
    let value = literal_value(term).trim().trim_start_matches('+');
    if value.len() >= 10 {
        if let Ok(date) = NaiveDate::parse_from_str(&value[..10], "%Y-%m-%d") {
            return Some(date);
        }
    }
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

    #[test]
    fn neighbour_depends_on_direction() {
        let t = Triple::new("s", "p", "o");
        assert_eq!(t.neighbour(Direction::Ingoing), "s");
        assert_eq!(t.neighbour(Direction::Outgoing), "o");
    }

    #[test]
    fn labels_from_iris_and_literals() {
        assert_eq!(
            label("http://dbpedia.org/resource/Storming_of_the_Bastille"),
            "Storming_of_the_Bastille"
        );
        assert_eq!(label("http://example.org/onto#Event"), "Event");
        assert_eq!(label(&literal("1789", None)), "1789");
    }

    #[test]
    fn literal_roundtrip_keeps_value() {
        let lit = literal("1789-07-14", Some(XSD_DATE));
        assert!(is_literal(&lit));
        assert_eq!(literal_value(&lit), "1789-07-14");
    }

    #[test]
    fn split_respects_escaped_quotes() {
        let lit = literal("say \"hi\"", Some(XSD_DATE));
        let (lexical, suffix) = split_literal(&lit).unwrap();
        assert_eq!(unescape_literal(lexical), "say \"hi\"");
        assert_eq!(suffix, format!("^^<{XSD_DATE}>"));
        assert_eq!(split_literal("\"abc"), None);
        assert_eq!(split_literal("\"abc\\\""), None);
        assert_eq!(literal_value("\"abc"), "\"abc");
    }

    #[test]
    fn parses_common_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(1789, 7, 14);
        assert_eq!(parse_date(&literal("1789-07-14", Some(XSD_DATE))), expected);
        assert_eq!(parse_date(&literal("+1789-07-14T00:00:00Z", None)), expected);
        assert_eq!(
            parse_date(&literal("1789", None)),
            NaiveDate::from_ymd_opt(1789, 1, 1)
        );
        assert_eq!(parse_date(&literal("July 1789", None)), None);
        assert_eq!(parse_date("http://dbpedia.org/resource/Paris"), None);
    }
}
