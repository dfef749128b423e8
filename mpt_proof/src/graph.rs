//! Content addressed graphs of the trie nodes seen in verified proofs.
//!
//! A [`TrieGraph`] collects the nodes of many proofs against the same root.
//! Nodes are keyed by their hash, so adding a path twice (or two paths that
//! share a prefix) never duplicates a node. The order in which nodes were
//! first seen is kept so that serialization is reproducible.

use std::fmt::{self, Display};

use ethereum_types::{H160, H256};
use hashbrown::HashSet;
use log::trace;
use serde::Serialize;

use crate::{
    node::TrieNode,
    utils::{address_key, bare_hex},
};

/// Identifies one logical trie of the state.
///
/// The account trie sorts before every storage trie, and storage tries sort by
/// address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TrieId {
    /// The state (account) trie.
    AccountTrie,
    /// The storage trie of the contract at an address.
    Storage(H160),
}

impl Display for TrieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieId::AccountTrie => write!(f, "account trie"),
            TrieId::Storage(address) => write!(f, "storage trie of {}", address_key(address)),
        }
    }
}

/// A node of a [`TrieGraph`], identified by its hash.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TrieNodeRecord {
    /// Keccak of the node's canonical encoding.
    #[serde(with = "bare_hex")]
    pub hash: H256,
    /// The node's fields.
    pub inners: TrieNode,
}

/// The deduplicated union of proof paths against one root.
#[derive(Clone, Debug, Serialize)]
pub struct TrieGraph {
    /// Root all paths were verified against.
    #[serde(with = "bare_hex")]
    pub root: H256,
    nodes: Vec<TrieNodeRecord>,
    #[serde(skip)]
    index: HashSet<H256>,
}

impl PartialEq for TrieGraph {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.nodes == other.nodes
    }
}

impl Eq for TrieGraph {}

impl TrieGraph {
    /// Creates an empty graph for the trie with the given root.
    pub fn new(root: H256) -> Self {
        Self {
            root,
            nodes: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Adds every node of a verified path that is not in the graph yet.
    ///
    /// Returns the number of nodes that were new.
    pub fn accumulate(&mut self, path: &[TrieNode]) -> usize {
        let before = self.nodes.len();

        for node in path.iter() {
            let hash = node.hash();
            if self.index.insert(hash) {
                self.nodes.push(TrieNodeRecord {
                    hash,
                    inners: node.clone(),
                });
            }
        }

        let added = self.nodes.len() - before;
        trace!("Added {} of {} path nodes under {:#x}", added, path.len(), self.root);

        added
    }

    /// Returns `true` if a node with this hash is in the graph.
    pub fn contains(&self, hash: &H256) -> bool {
        self.index.contains(hash)
    }

    /// The nodes in the order they were first added.
    pub fn nodes(&self) -> &[TrieNodeRecord] {
        &self.nodes
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been added yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A copy of the graph without any leaf shaped node.
    pub fn without_leaves(&self) -> Self {
        let mut graph = Self::new(self.root);
        for record in self.nodes.iter().filter(|r| !r.inners.is_leaf_shaped()) {
            graph.index.insert(record.hash);
            graph.nodes.push(record.clone());
        }

        graph
    }
}
