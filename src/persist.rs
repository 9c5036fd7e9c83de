//! Run artifacts on disk.
//!
//! Layout of an output folder:
//!
//! ```text
//! <output>/
//!   state.json               complete SearchState, rewritten after every iteration
//!   iterations/<i>/          what iteration i added or left pending
//!     subgraph.json  pending_ingoing.json  pending_outgoing.json
//!     occurrences.json  expanded.json  discarded.json
//!   subgraph.json  expanded.json  metrics.json  ordering.json  metadata.json
//! ```
//!
//! The final files are only written once a run terminates. Iteration folders are
//! self-contained, so a run that fails mid-way leaves every finished iteration intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PersistError;
use crate::state::SearchState;

pub type PersistResult<T> = std::result::Result<T, PersistError>;

pub const STATE_FILE: &str = "state.json";

/// Writes the artifacts of one run below its output folder.
#[derive(Debug, Clone)]
pub struct RunWriter {
    root: PathBuf,
}

impl RunWriter {
    pub fn create(root: &Path) -> PersistResult<Self> {
        create_dir(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn iteration_dir(&self, iteration: usize) -> PathBuf {
        self.root.join("iterations").join(iteration.to_string())
    }

    /// Artifacts of `iteration` plus the state snapshot.
    pub fn write_iteration(&self, state: &SearchState, iteration: usize) -> PersistResult<()> {
        let dir = self.iteration_dir(iteration);
        create_dir(&dir)?;

        let subgraph: Vec<_> = state.subgraph_at(iteration).collect();
        let expanded: Vec<_> = state
            .expanded
            .iter()
            .filter(|r| r.iteration == iteration)
            .collect();
        let discarded: Vec<_> = state
            .discarded
            .iter()
            .filter(|r| r.iteration == iteration)
            .collect();

        write_json(&dir.join("subgraph.json"), &subgraph)?;
        write_json(&dir.join("pending_ingoing.json"), &state.frontier.ingoing)?;
        write_json(&dir.join("pending_outgoing.json"), &state.frontier.outgoing)?;
        write_json(&dir.join("occurrences.json"), &state.occurrences)?;
        write_json(&dir.join("expanded.json"), &expanded)?;
        write_json(&dir.join("discarded.json"), &discarded)?;
        self.write_state(state)
    }

    pub fn write_state(&self, state: &SearchState) -> PersistResult<()> {
        write_json(&self.root.join(STATE_FILE), state)
    }

    /// Final artifacts. `metadata` is written as-is.
    pub fn write_final(&self, state: &SearchState, metadata: &impl Serialize) -> PersistResult<()> {
        write_json(&self.root.join("subgraph.json"), &state.subgraph)?;
        write_json(&self.root.join("expanded.json"), &state.expanded)?;
        write_json(&self.root.join("metrics.json"), &state.metrics)?;
        write_json(&self.root.join("ordering.json"), &state.ordering)?;
        write_json(&self.root.join("metadata.json"), metadata)?;
        self.write_state(state)
    }
}

/// Load a snapshot written by [`RunWriter`]. `path` may be the output folder or
/// the `state.json` file itself.
pub fn load_state(path: &Path) -> PersistResult<SearchState> {
    let file = if path.is_dir() {
        path.join(STATE_FILE)
    } else {
        path.to_path_buf()
    };
    read_json(&file)
}

fn create_dir(path: &Path) -> PersistResult<()> {
    std::fs::create_dir_all(path).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_json(path: &Path, value: &impl Serialize) -> PersistResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| PersistError::Serialization {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> PersistResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| PersistError::Serialization {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
