//! Per-dataset vocabulary: which predicates carry types and dates, which classes
//! count as places, persons and events, and which predicates are never followed.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const DBO: &str = "http://dbpedia.org/ontology/";
const WD: &str = "http://www.wikidata.org/entity/";
const WDT: &str = "http://www.wikidata.org/prop/direct/";

fn iris(prefix: &str, locals: &[&str]) -> Vec<String> {
    locals.iter().map(|l| format!("{prefix}{l}")).collect()
}

/// Static dataset configuration. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// Prefix prepended to start/target nodes given by local name.
    pub resource_prefix: String,
    /// Predicates linking an entity to its class.
    pub rdf_type: Vec<String>,
    pub start_dates: Vec<String>,
    pub end_dates: Vec<String>,
    pub point_in_time: Vec<String>,
    /// Classes whose instances the WHERE filter discards.
    pub places: Vec<String>,
    /// Classes whose instances the WHO filter discards.
    pub persons: Vec<String>,
    /// Classes a neighbour must belong to for its triples to enter the subgraph.
    pub focus_types: Vec<String>,
    /// Predicates never followed during expansion.
    pub predicate_denylist: Vec<String>,
    /// Whether node labels carry years (`1792_in_France`), enabling the lexical date check.
    pub lexical_year_filter: bool,
}

impl DatasetConfig {
    pub fn dbpedia() -> Self {
        let mut denylist = vec![
            "http://www.w3.org/2002/07/owl#sameAs".to_string(),
            "http://www.w3.org/2000/01/rdf-schema#seeAlso".to_string(),
            "http://www.w3.org/ns/prov#wasDerivedFrom".to_string(),
            "http://xmlns.com/foaf/0.1/isPrimaryTopicOf".to_string(),
            "http://xmlns.com/foaf/0.1/primaryTopic".to_string(),
        ];
        denylist.extend(iris(
            DBO,
            &[
                "wikiPageWikiLink",
                "wikiPageRedirects",
                "wikiPageDisambiguates",
                "wikiPageExternalLink",
                "wikiPageID",
                "wikiPageRevisionID",
                "wikiPageLength",
                "thumbnail",
                "abstract",
            ],
        ));
        Self {
            name: "dbpedia".into(),
            resource_prefix: "http://dbpedia.org/resource/".into(),
            rdf_type: vec![RDF_TYPE.into()],
            start_dates: iris(DBO, &["startDate"]),
            end_dates: iris(DBO, &["endDate"]),
            point_in_time: iris(DBO, &["date"]),
            places: iris(DBO, &["Place", "Location", "PopulatedPlace", "Settlement"]),
            persons: vec![
                format!("{DBO}Person"),
                "http://xmlns.com/foaf/0.1/Person".into(),
            ],
            focus_types: iris(DBO, &["Event"]),
            predicate_denylist: denylist,
            lexical_year_filter: true,
        }
    }

    pub fn wikidata() -> Self {
        Self {
            name: "wikidata".into(),
            resource_prefix: WD.into(),
            rdf_type: iris(WDT, &["P31"]),
            start_dates: iris(WDT, &["P580"]),
            end_dates: iris(WDT, &["P582"]),
            point_in_time: iris(WDT, &["P585"]),
            // geographic location, city, country
            places: iris(WD, &["Q2221906", "Q515", "Q6256"]),
            // human
            persons: iris(WD, &["Q5"]),
            // event, occurrence
            focus_types: iris(WD, &["Q1656682", "Q1190554"]),
            predicate_denylist: vec![
                "http://schema.org/about".into(),
                "http://schema.org/description".into(),
                "http://www.w3.org/2000/01/rdf-schema#label".into(),
                "http://www.w3.org/2004/02/skos/core#altLabel".into(),
            ],
            lexical_year_filter: false,
        }
    }

    /// Built-in dataset by name.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "dbpedia" => Ok(Self::dbpedia()),
            "wikidata" => Ok(Self::wikidata()),
            _ => Err(ConfigError::UnknownDataset { name: name.into() }),
        }
    }

    /// Predicates fetched for every neighbour: types and all temporal predicates.
    pub fn specific_predicates(&self) -> Vec<String> {
        self.rdf_type
            .iter()
            .chain(&self.start_dates)
            .chain(&self.end_dates)
            .chain(&self.point_in_time)
            .cloned()
            .collect()
    }

    /// Full IRI for a node given either as an IRI or as a local name.
    pub fn expand_node(&self, node: &str) -> String {
        if node.starts_with("http://") || node.starts_with("https://") {
            node.to_string()
        } else {
            format!("{}{node}", self.resource_prefix)
        }
    }

    pub fn apply(&mut self, overrides: DatasetOverrides) {
        let DatasetOverrides {
            resource_prefix,
            rdf_type,
            start_dates,
            end_dates,
            point_in_time,
            places,
            persons,
            focus_types,
            predicate_denylist,
            lexical_year_filter,
        } = overrides;
        if let Some(v) = resource_prefix {
            self.resource_prefix = v;
        }
        for (slot, value) in [
            (&mut self.rdf_type, rdf_type),
            (&mut self.start_dates, start_dates),
            (&mut self.end_dates, end_dates),
            (&mut self.point_in_time, point_in_time),
            (&mut self.places, places),
            (&mut self.persons, persons),
            (&mut self.focus_types, focus_types),
            (&mut self.predicate_denylist, predicate_denylist),
        ] {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(v) = lexical_year_filter {
            self.lexical_year_filter = v;
        }
    }
}

/// `[dataset_overrides]` table of a run file. Any present key replaces the preset's value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetOverrides {
    pub resource_prefix: Option<String>,
    pub rdf_type: Option<Vec<String>>,
    pub start_dates: Option<Vec<String>>,
    pub end_dates: Option<Vec<String>>,
    pub point_in_time: Option<Vec<String>>,
    pub places: Option<Vec<String>>,
    pub persons: Option<Vec<String>>,
    pub focus_types: Option<Vec<String>>,
    pub predicate_denylist: Option<Vec<String>>,
    pub lexical_year_filter: Option<bool>,
}
