//! The consolidated proof data of one block.
//!
//! A [`BlockProofSet`] holds, for the state before and after the block, one
//! [`TrieGraph`] and one [`LeafList`] per touched trie. Proofs only enter the
//! set after they have been verified against the root of their phase.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use ethereum_types::{H160, H256};
use log::debug;

use crate::{
    graph::{TrieGraph, TrieId},
    leaf::{classify_account_leaves, classify_storage_leaves, LeafList},
    proof::AccountProof,
    verifier::{verify_state_proof, ProofError},
};

/// Which side of the block a proof is about.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Phase {
    /// The state before the block, i.e. after its parent.
    PreState,
    /// The state after the block.
    PostState,
}

impl Phase {
    /// Both phases, pre-state first.
    pub const ALL: [Phase; 2] = [Phase::PreState, Phase::PostState];

    /// The block whose state root this phase is checked against.
    pub fn state_block(&self, block_number: u64) -> u64 {
        match self {
            Phase::PreState => block_number.saturating_sub(1),
            Phase::PostState => block_number,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreState => write!(f, "pre-state"),
            Phase::PostState => write!(f, "post-state"),
        }
    }
}

/// Graphs and leaves of all tries touched in one phase.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseProofs {
    /// The state root every account proof of this phase is verified against.
    pub root: H256,
    graphs: BTreeMap<TrieId, TrieGraph>,
    leaves: BTreeMap<TrieId, LeafList>,
}

impl PhaseProofs {
    /// Creates an empty phase with an (empty) account trie graph.
    pub fn new(root: H256) -> Self {
        Self {
            root,
            graphs: BTreeMap::from([(TrieId::AccountTrie, TrieGraph::new(root))]),
            leaves: BTreeMap::from([(TrieId::AccountTrie, LeafList::default())]),
        }
    }

    /// Verifies `proof` (account and storage) against this phase's root and
    /// merges its paths and leaves. Nothing is merged if verification fails.
    pub fn absorb(&mut self, proof: &AccountProof) -> Result<(), ProofError> {
        verify_state_proof(proof, self.root)?;

        let root = self.root;
        let added = self
            .graph_mut(TrieId::AccountTrie, root)
            .accumulate(&proof.account_proof);
        self.leaves_mut(TrieId::AccountTrie)
            .extend(classify_account_leaves(proof));

        if !proof.storage_proof.is_empty() {
            let id = TrieId::Storage(proof.address);
            let graph = self.graph_mut(id, proof.storage_hash);
            for entry in proof.storage_proof.iter() {
                graph.accumulate(&entry.proof);
            }
            self.leaves_mut(id).extend(classify_storage_leaves(proof));
        }

        debug!(
            "Absorbed {:#x} ({} new account nodes, {} slots)",
            proof.address,
            added,
            proof.storage_proof.len()
        );

        Ok(())
    }

    fn graph_mut(&mut self, id: TrieId, root: H256) -> &mut TrieGraph {
        self.graphs.entry(id).or_insert_with(|| TrieGraph::new(root))
    }

    fn leaves_mut(&mut self, id: TrieId) -> &mut LeafList {
        self.leaves.entry(id).or_default()
    }

    /// The account trie graph.
    pub fn account_graph(&self) -> &TrieGraph {
        // Inserted on construction and never removed.
        &self.graphs[&TrieId::AccountTrie]
    }

    /// The account trie leaves.
    pub fn account_leaves(&self) -> &LeafList {
        &self.leaves[&TrieId::AccountTrie]
    }

    /// The storage trie graphs, sorted by address.
    pub fn storage_graphs(&self) -> impl Iterator<Item = (H160, &TrieGraph)> {
        self.graphs.iter().filter_map(|(id, graph)| match id {
            TrieId::AccountTrie => None,
            TrieId::Storage(address) => Some((*address, graph)),
        })
    }

    /// The storage trie leaves, sorted by address.
    pub fn storage_leaves(&self) -> impl Iterator<Item = (H160, &LeafList)> {
        self.leaves.iter().filter_map(|(id, leaves)| match id {
            TrieId::AccountTrie => None,
            TrieId::Storage(address) => Some((*address, leaves)),
        })
    }

    /// The graph of a trie, if it was touched.
    pub fn graph(&self, id: &TrieId) -> Option<&TrieGraph> {
        self.graphs.get(id)
    }
}

/// Everything extracted from the proofs of one block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockProofSet {
    /// The traced block.
    pub block_number: u64,
    /// State before the block.
    pub pre: PhaseProofs,
    /// State after the block.
    pub post: PhaseProofs,
}

impl BlockProofSet {
    /// Creates an empty set for a block given its parent's and its own state
    /// roots.
    pub fn new(block_number: u64, pre_root: H256, post_root: H256) -> Self {
        Self {
            block_number,
            pre: PhaseProofs::new(pre_root),
            post: PhaseProofs::new(post_root),
        }
    }

    /// The data of one phase.
    pub fn phase(&self, phase: Phase) -> &PhaseProofs {
        match phase {
            Phase::PreState => &self.pre,
            Phase::PostState => &self.post,
        }
    }

    /// Verifies and merges a proof into the given phase.
    pub fn absorb(&mut self, phase: Phase, proof: &AccountProof) -> Result<(), ProofError> {
        match phase {
            Phase::PreState => self.pre.absorb(proof),
            Phase::PostState => self.post.absorb(proof),
        }
    }
}
