//! In-memory triple source with subject/object indexes.
//!
//! Used for fixtures and for small extracted corpora stored as JSON
//! (`[{"subject": .., "predicate": .., "object": ..}, ...]`).

use std::collections::HashMap;
use std::path::Path;

use crate::error::SourceError;

use super::Triple;
use super::source::{SourceResult, TriplePattern, TripleSource};

/// Triples held in memory, indexed by subject and by object.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    triples: Vec<Triple>,
    by_subject: HashMap<String, Vec<usize>>,
    by_object: HashMap<String, Vec<usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut source = Self::new();
        for triple in triples {
            source.insert(triple);
        }
        source
    }

    /// Load a JSON array of triples.
    pub fn from_json_file(path: &Path) -> SourceResult<Self> {
        let load_err = |message: String| SourceError::Load {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let triples: Vec<Triple> =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        Ok(Self::from_triples(triples))
    }

    /// Insert a triple. Exact duplicates are ignored.
    pub fn insert(&mut self, triple: Triple) {
        if let Some(ids) = self.by_subject.get(&triple.subject) {
            if ids.iter().any(|&i| self.triples[i] == triple) {
                return;
            }
        }
        let id = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(id);
        self.by_object
            .entry(triple.object.clone())
            .or_default()
            .push(id);
        self.triples.push(triple);
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

impl TripleSource for MemorySource {
    fn triples(&self, pattern: &TriplePattern) -> SourceResult<Vec<Triple>> {
        pattern.ensure_bound()?;
        let candidates: Box<dyn Iterator<Item = &Triple>> =
            match (pattern.subject.as_ref(), pattern.object.as_ref()) {
                (Some(s), _) => Box::new(
                    self.by_subject
                        .get(s)
                        .into_iter()
                        .flatten()
                        .map(|&i| &self.triples[i]),
                ),
                (None, Some(o)) => Box::new(
                    self.by_object
                        .get(o)
                        .into_iter()
                        .flatten()
                        .map(|&i| &self.triples[i]),
                ),
                (None, None) => Box::new(self.triples.iter()),
            };
        Ok(candidates
            .filter(|t| pattern.matches(t))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        MemorySource::from_triples([
            Triple::new("a", "p", "b"),
            Triple::new("b", "p", "c"),
            Triple::new("b", "type", "Event"),
            Triple::new("a", "p", "b"),
        ])
    }

    #[test]
    fn duplicates_are_ignored() {
        assert_eq!(source().len(), 3);
    }

    #[test]
    fn lookups_by_subject_and_object() {
        let src = source();
        assert_eq!(src.triples(&TriplePattern::subject("b")).unwrap().len(), 2);
        assert_eq!(src.triples(&TriplePattern::object("b")).unwrap().len(), 1);
        let typed = src
            .triples(&TriplePattern::subject("b").with_predicate("type"))
            .unwrap();
        assert_eq!(typed, vec![Triple::new("b", "type", "Event")]);
    }

    #[test]
    fn neighbourhood_collects_type_date() {
        let src = source();
        let nb = src
            .neighbourhood("a", &[], &["type".to_string()])
            .unwrap();
        assert!(nb.ingoing.is_empty());
        assert_eq!(nb.outgoing.len(), 1);
        assert_eq!(nb.type_date, vec![Triple::new("b", "type", "Event")]);
    }

    #[test]
    fn denylisted_predicates_are_dropped() {
        let src = source();
        let nb = src.neighbourhood("b", &["p".to_string()], &[]).unwrap();
        assert!(nb.ingoing.is_empty());
        assert_eq!(nb.outgoing, vec![Triple::new("b", "type", "Event")]);
    }

    #[test]
    fn loads_json_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("triples.json");
        std::fs::write(
            &path,
            r#"[{"subject":"a","predicate":"p","object":"b"}]"#,
        )
        .unwrap();
        let src = MemorySource::from_json_file(&path).unwrap();
        assert_eq!(src.len(), 1);
    }
}
