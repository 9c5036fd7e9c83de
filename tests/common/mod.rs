//! French Revolution fixture shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;

use narrative_search::config::{DateWindow, LookupPaths, RankingStrategy, SearchConfig};
use narrative_search::dataset::DatasetConfig;
use narrative_search::graph::memory::MemorySource;
use narrative_search::graph::{Triple, is_literal, literal};

pub const DBR: &str = "http://dbpedia.org/resource/";
pub const DBO: &str = "http://dbpedia.org/ontology/";
pub const DCT_SUBJECT: &str = "http://purl.org/dc/terms/subject";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

pub fn dbr(local: &str) -> String {
    format!("{DBR}{local}")
}

pub fn dbo(local: &str) -> String {
    format!("{DBO}{local}")
}

fn dated(node: &str, predicate: &str, date: &str) -> Triple {
    Triple::new(dbr(node), dbo(predicate), literal(date, Some(XSD_DATE)))
}

fn typed(node: &str, class: &str) -> Triple {
    Triple::new(dbr(node), RDF_TYPE, dbo(class))
}

/// Events filed under the French Revolution category, one war among them with
/// its battles, plus places, people and links the search must not follow.
pub fn triples() -> Vec<Triple> {
    let category = dbr("Category:French_Revolution");
    let war = dbr("War_of_the_First_Coalition");
    let mut triples = Vec::new();

    for event in [
        "Storming_of_the_Bastille",
        "War_of_the_First_Coalition",
        "Women's_March_on_Versailles",
        "Reign_of_Terror",
    ] {
        triples.push(Triple::new(dbr(event), DCT_SUBJECT, &category));
    }
    triples.extend([
        typed("Storming_of_the_Bastille", "Event"),
        dated("Storming_of_the_Bastille", "date", "1789-07-14"),
        Triple::new(dbr("Storming_of_the_Bastille"), dbo("place"), dbr("Paris")),
        typed("Women's_March_on_Versailles", "Event"),
        dated("Women's_March_on_Versailles", "date", "1789-10-05"),
        typed("Reign_of_Terror", "Event"),
        dated("Reign_of_Terror", "startDate", "1793-09-05"),
        dated("Reign_of_Terror", "endDate", "1794-07-28"),
        typed("War_of_the_First_Coalition", "MilitaryConflict"),
        dated("War_of_the_First_Coalition", "startDate", "1792-04-20"),
        dated("War_of_the_First_Coalition", "endDate", "1797-10-17"),
        typed("Paris", "Place"),
        typed("Maximilien_Robespierre", "Person"),
        Triple::new(dbr("Maximilien_Robespierre"), dbo("wikiPageWikiLink"), &category),
        Triple::new(dbr("Reign_of_Terror"), dbo("commander"), dbr("Maximilien_Robespierre")),
    ]);

    for (battle, date) in [
        ("Battle_of_Valmy", "1792-09-20"),
        ("Siege_of_Toulon", "1793-09-18"),
        ("Battle_of_Jemappes", "1792-11-06"),
        ("Battle_of_Waterloo", "1815-06-18"),
    ] {
        triples.push(Triple::new(dbr(battle), dbo("isPartOfMilitaryConflict"), &war));
        triples.push(typed(battle, "MilitaryConflict"));
        triples.push(dated(battle, "date", date));
    }
    triples
}

pub fn source() -> MemorySource {
    MemorySource::from_triples(triples())
}

/// The fixture as an N-Triples document.
pub fn ntriples() -> String {
    let term = |t: &str| {
        if is_literal(t) {
            t.to_string()
        } else {
            format!("<{t}>")
        }
    };
    triples()
        .iter()
        .map(|t| format!("{} {} {} .\n", term(&t.subject), term(&t.predicate), term(&t.object)))
        .collect()
}

/// Write the domain/range/superclass tables into `dir`.
pub fn write_lookup(dir: &Path) -> LookupPaths {
    let domain = dir.join("domain.json");
    let superclasses = dir.join("superclasses.json");
    std::fs::write(
        &domain,
        format!(r#"{{"{}": ["{}"]}}"#, dbo("isPartOfMilitaryConflict"), dbo("MilitaryConflict")),
    )
    .unwrap();
    std::fs::write(
        &superclasses,
        format!(
            r#"{{"{}": ["{}", "{}"]}}"#,
            dbo("MilitaryConflict"),
            dbo("SocietalEvent"),
            dbo("Event")
        ),
    )
    .unwrap();
    LookupPaths {
        domain: Some(domain),
        range: None,
        superclasses: Some(superclasses),
    }
}

/// Two iterations from the French Revolution category, filters off.
pub fn config(lookup: LookupPaths) -> SearchConfig {
    let mut config = SearchConfig::new(DatasetConfig::dbpedia(), "Category:French_Revolution");
    config.iterations = 2;
    config.ranking = RankingStrategy::EntropyPredObjectFreq;
    config.dates = Some(DateWindow::parse("1789-05-05", "1799-12-31").unwrap());
    config.lookup = lookup;
    config
}
