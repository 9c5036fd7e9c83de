//! Path keys, the occurrence table, and the ranker choosing the next path.
//!
//! A *path* groups frontier nodes reachable the same way: through one predicate,
//! or through one predicate from one specific expanded node. The occurrence
//! table counts frontier triples per path; the ranker picks the path to expand.
//!
//! Ties are resolved deterministically: among equally scored paths, the smallest
//! key in [`PathKey`] order wins.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{RankingStrategy, Scoring};
use crate::graph::Direction;
use crate::state::FrontierEntry;

/// Relevance tier of a path. Lower tiers are always preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Superclass annotation intersects the focus types.
    Focus,
    /// Reserved for manually curated paths.
    Reserved,
    Other,
}

impl Tier {
    pub fn of(entry: &FrontierEntry, focus_types: &[String]) -> Self {
        if entry.is_relevant(focus_types) {
            Self::Focus
        } else {
            Self::Other
        }
    }

    fn prefix(self) -> char {
        match self {
            Self::Focus => '1',
            Self::Reserved => '2',
            Self::Other => '3',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Focus),
            '2' => Some(Self::Reserved),
            '3' => Some(Self::Other),
            _ => None,
        }
    }
}

/// Key of the occurrence table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKey {
    /// Every frontier triple using `predicate`, in either direction.
    Predicate { tier: Tier, predicate: String },
    /// Frontier triples using `predicate` whose expanded-side term is `endpoint`:
    /// the object of ingoing triples, the subject of outgoing ones.
    PredicateObject {
        tier: Tier,
        direction: Direction,
        predicate: String,
        endpoint: String,
    },
}

impl PathKey {
    pub fn tier(&self) -> Tier {
        match self {
            Self::Predicate { tier, .. } | Self::PredicateObject { tier, .. } => *tier,
        }
    }

    pub fn predicate(&self) -> &str {
        match self {
            Self::Predicate { predicate, .. } | Self::PredicateObject { predicate, .. } => {
                predicate
            }
        }
    }

    /// Key under which a frontier entry is counted.
    pub fn for_entry(entry: &FrontierEntry, uses_objects: bool, focus_types: &[String]) -> Self {
        let tier = Tier::of(entry, focus_types);
        let predicate = entry.triple.predicate.clone();
        if !uses_objects {
            return Self::Predicate { tier, predicate };
        }
        Self::PredicateObject {
            tier,
            direction: entry.direction,
            predicate,
            endpoint: expanded_side(entry).to_string(),
        }
    }

    /// Whether `entry` is counted under this key.
    pub fn matches(&self, entry: &FrontierEntry, focus_types: &[String]) -> bool {
        match self {
            Self::Predicate { tier, predicate } => {
                entry.triple.predicate == *predicate && Tier::of(entry, focus_types) == *tier
            }
            Self::PredicateObject {
                tier,
                direction,
                predicate,
                endpoint,
            } => {
                entry.direction == *direction
                    && entry.triple.predicate == *predicate
                    && expanded_side(entry) == endpoint
                    && Tier::of(entry, focus_types) == *tier
            }
        }
    }
}

/// The term on the expanded node's side of the triple.
fn expanded_side(entry: &FrontierEntry) -> &str {
    match entry.direction {
        Direction::Ingoing => &entry.triple.object,
        Direction::Outgoing => &entry.triple.subject,
    }
}

/// `<tier>-<predicate>`, `<tier>-ingoing-<predicate>;<object>`, or
/// `<tier>-outgoing-<subject>;<predicate>`.
impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate { tier, predicate } => write!(f, "{}-{predicate}", tier.prefix()),
            Self::PredicateObject {
                tier,
                direction: Direction::Ingoing,
                predicate,
                endpoint,
            } => write!(f, "{}-ingoing-{predicate};{endpoint}", tier.prefix()),
            Self::PredicateObject {
                tier,
                direction: Direction::Outgoing,
                predicate,
                endpoint,
            } => write!(f, "{}-outgoing-{endpoint};{predicate}", tier.prefix()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePathKeyError(String);

impl fmt::Display for ParsePathKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed path key: {}", self.0)
    }
}

impl std::error::Error for ParsePathKeyError {}

impl FromStr for PathKey {
    type Err = ParsePathKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePathKeyError(s.to_string());
        let mut chars = s.chars();
        let tier = chars.next().and_then(Tier::from_prefix).ok_or_else(err)?;
        let rest = s.get(1..).and_then(|r| r.strip_prefix('-')).ok_or_else(err)?;

        // Predicates never contain ';', so split on the side of the predicate.
        if let Some(body) = rest.strip_prefix("ingoing-") {
            let (predicate, endpoint) = body.split_once(';').ok_or_else(err)?;
            return Ok(Self::PredicateObject {
                tier,
                direction: Direction::Ingoing,
                predicate: predicate.into(),
                endpoint: endpoint.into(),
            });
        }
        if let Some(body) = rest.strip_prefix("outgoing-") {
            let (endpoint, predicate) = body.rsplit_once(';').ok_or_else(err)?;
            return Ok(Self::PredicateObject {
                tier,
                direction: Direction::Outgoing,
                predicate: predicate.into(),
                endpoint: endpoint.into(),
            });
        }
        if rest.is_empty() {
            return Err(err());
        }
        Ok(Self::Predicate {
            tier,
            predicate: rest.into(),
        })
    }
}

impl Serialize for PathKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Count of frontier triples per path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OccurrenceTable(BTreeMap<PathKey, u64>);

impl OccurrenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: PathKey) {
        *self.0.entry(key).or_insert(0) += 1;
    }

    /// Decrement by one, dropping the entry when it reaches zero.
    pub fn decrement(&mut self, key: &PathKey) {
        if let Some(count) = self.0.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.0.remove(key);
            }
        }
    }

    pub fn remove(&mut self, key: &PathKey) -> Option<u64> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &PathKey) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathKey, u64)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(PathKey, u64)> for OccurrenceTable {
    fn from_iter<I: IntoIterator<Item = (PathKey, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The path chosen for the next iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPath {
    pub key: PathKey,
    pub score: f64,
}

/// Stateless path ranker.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    strategy: RankingStrategy,
    low_threshold: u64,
    high_threshold: u64,
}

impl Ranker {
    pub fn new(strategy: RankingStrategy, low_threshold: u64, high_threshold: u64) -> Self {
        Self {
            strategy,
            low_threshold,
            high_threshold,
        }
    }

    /// Best path of the highest-priority tier present, or `None` for an empty table.
    pub fn select_best(&self, table: &OccurrenceTable) -> Option<RankedPath> {
        let best_tier = table.iter().filter(|(_, c)| *c > 0).map(|(k, _)| k.tier()).min()?;
        let candidates: Vec<(&PathKey, u64)> = table
            .iter()
            .filter(|(k, c)| *c > 0 && k.tier() == best_tier)
            .collect();

        let (key, score) = match self.strategy.scoring() {
            Scoring::Frequency => {
                let (k, c) = first_by(self.banded(&candidates).into_iter(), |a, b| a > b)?;
                (k, c as f64)
            }
            Scoring::InverseFrequency => {
                let (k, c) = first_by(self.banded(&candidates).into_iter(), |a, b| a < b)?;
                (k, c as f64)
            }
            Scoring::Entropy => {
                let total: u64 = candidates.iter().map(|(_, c)| c).sum();
                let scored = candidates.iter().map(|&(k, c)| {
                    let p = c as f64 / total as f64;
                    (k, -p * p.ln())
                });
                first_by(scored, |a, b| a > b)?
            }
        };
        Some(RankedPath {
            key: key.clone(),
            score,
        })
    }

    /// Candidates strictly inside `(low, high)`, or all of them if none are.
    fn banded<'a>(&self, candidates: &[(&'a PathKey, u64)]) -> Vec<(&'a PathKey, u64)> {
        let inside: Vec<(&PathKey, u64)> = candidates
            .iter()
            .copied()
            .filter(|(_, c)| self.low_threshold < *c && *c < self.high_threshold)
            .collect();
        if inside.is_empty() {
            candidates.to_vec()
        } else {
            inside
        }
    }
}

/// First item whose score strictly beats every earlier one under `better`.
fn first_by<K, S: Copy>(
    items: impl Iterator<Item = (K, S)>,
    better: impl Fn(S, S) -> bool,
) -> Option<(K, S)> {
    let mut best: Option<(K, S)> = None;
    for (key, score) in items {
        match &best {
            Some((_, current)) if !better(score, *current) => {}
            _ => best = Some((key, score)),
        }
    }
    best
}
