//! Verification and consolidation of Ethereum Merkle Patricia Trie state
//! proofs.
//!
//! Proofs as returned by `eth_getProof` are first decoded into
//! [`TrieNode`][node::TrieNode]s (see [`proof`]), then authenticated against a
//! state root by walking them along the hashed key (see [`verifier`]).
//! Verified paths are merged into content addressed
//! [`TrieGraph`][graph::TrieGraph]s, one per touched trie, and their terminal
//! nodes are recorded separately as [`LeafRecord`][leaf::LeafRecord]s.
//!
//! [`BlockProofSet`][proof_set::BlockProofSet] ties this together for the
//! state before and after a block. It only accepts proofs that verify, so
//! everything it holds is authenticated by one of the two state roots.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod account;
pub mod graph;
pub mod leaf;
pub mod nibbles;
pub mod node;
pub mod proof;
pub mod proof_set;
pub mod utils;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing_utils;
