// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # narrative-search
//!
//! Informed, iterative traversal of a large knowledge graph (DBpedia, Wikidata)
//! that reconstructs the narrative graph around a seed event.
//!
//! ## Architecture
//!
//! - **Triple sources** (`graph`): in-memory, oxigraph-backed and remote SPARQL
//!   sources behind one `TripleSource` trait
//! - **Filtering** (`filtering`): who/where/when pruning of neighbours
//! - **Ordering** (`ordering`): domain/range superclass annotation of the frontier
//! - **Expansion** (`expansion`): one node's neighbourhood split into subgraph,
//!   frontier and discarded nodes
//! - **Ranking** (`ranker`, `selecting`): six frequency/entropy strategies over
//!   tiered path keys
//! - **Orchestration** (`framework`, `state`, `persist`): the iteration loop,
//!   termination and per-iteration artifacts
//! - **Evaluation** (`metrics`): precision/recall/F1 against a gold standard
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use narrative_search::config::SearchConfig;
//! use narrative_search::dataset::DatasetConfig;
//! use narrative_search::framework::Framework;
//! use narrative_search::graph::memory::MemorySource;
//!
//! let source = MemorySource::from_json_file("triples.json".as_ref()).unwrap();
//! let config = SearchConfig::new(DatasetConfig::dbpedia(), "Category:French_Revolution");
//! let mut framework = Framework::new(config, Arc::new(source)).unwrap();
//! let summary = framework.run().unwrap();
//! println!("{}", summary.termination);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod expansion;
pub mod filtering;
pub mod framework;
pub mod graph;
pub mod lookup;
pub mod metrics;
pub mod ordering;
pub mod persist;
pub mod ranker;
pub mod selecting;
pub mod state;
