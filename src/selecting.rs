//! Node selection: which of the nodes sharing the winning path get expanded,
//! and uniform frontier sampling for random walks.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::NodeSelectionMode;

/// Chooses nodes to expand. Seeded selectors are reproducible.
#[derive(Debug, Clone)]
pub struct NodeSelector {
    mode: NodeSelectionMode,
    rng: StdRng,
}

impl NodeSelector {
    pub fn new(mode: NodeSelectionMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { mode, rng }
    }

    /// Selector for one iteration of a run seeded with `seed`.
    ///
    /// Deriving the stream from the iteration keeps a resumed run on the same
    /// random choices as an uninterrupted one.
    pub fn for_iteration(mode: NodeSelectionMode, seed: Option<u64>, iteration: usize) -> Self {
        Self::new(mode, seed.map(|s| s.wrapping_add(iteration as u64)))
    }

    /// Split `nodes` into `(to_expand, remainder)`.
    pub fn choose(&mut self, mut nodes: Vec<String>) -> (Vec<String>, Vec<String>) {
        match self.mode {
            NodeSelectionMode::All => (nodes, Vec::new()),
            NodeSelectionMode::Random if nodes.is_empty() => (nodes, Vec::new()),
            NodeSelectionMode::Random => {
                let picked = nodes.swap_remove(self.rng.gen_range(0..nodes.len()));
                nodes.sort();
                (vec![picked], nodes)
            }
        }
    }

    /// Uniform sample of at most `limit` nodes, or all of them when `limit` is `None`.
    /// The result is sorted.
    pub fn sample(&mut self, nodes: Vec<String>, limit: Option<usize>) -> Vec<String> {
        let mut picked = match limit {
            Some(limit) if limit < nodes.len() => nodes
                .choose_multiple(&mut self.rng, limit)
                .cloned()
                .collect(),
            _ => nodes,
        };
        picked.sort();
        picked
    }
}
