//! Authentication of account and storage proofs against a trie root.
//!
//! All proofs go through the same walk: starting from the root hash, every
//! proof node must hash to the reference its parent holds for it, and the key
//! is consumed nibble by nibble until it either resolves to a value or
//! provably diverges from every path in the trie (a proof of absence).
//!
//! The walk is strict. A proof that ends before the key is resolved, or that
//! carries nodes which the walk never reaches, is rejected, so every node of
//! an accepted proof is authenticated by the root.

use std::borrow::Cow;

use ethereum_types::{H160, H256};
use keccak_hash::keccak;
use log::trace;
use thiserror::Error;

use crate::{
    account::storage_expected_value,
    nibbles::Nibbles,
    node::{ChildRef, NodeDecodeError, NodeKind, TrieNode},
    proof::{AccountProof, ProofSubject, StorageProof},
    utils::is_empty_trie_root,
};

/// Why a proof failed to verify.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProofErrorKind {
    #[error("proof node {index} hashes to {actual:#x} but its parent references {expected:#x}")]
    /// A proof node does not hash to the reference held by its parent.
    HashMismatch {
        /// Position of the node in the proof.
        index: usize,
        /// The reference held by the parent (or the root).
        expected: H256,
        /// The hash of the node.
        actual: H256,
    },

    #[error(
        "proof resolves to 0x{} but 0x{} was expected",
        hex::encode(.actual),
        hex::encode(.expected)
    )]
    /// The value the proof resolves to differs from the expected one.
    ValueMismatch {
        /// The value the proof was checked for.
        expected: Vec<u8>,
        /// The value the proof resolves to (empty if absent).
        actual: Vec<u8>,
    },

    #[error("proof ends after {index} nodes but node {expected:#x} is still needed")]
    /// The proof does not contain all nodes on the key's path.
    MissingNode {
        /// Position the missing node would have in the proof.
        index: usize,
        /// Hash of the missing node.
        expected: H256,
    },

    #[error("{count} proof nodes are not on the key's path")]
    /// The proof contains nodes after the key was resolved.
    TrailingNodes {
        /// How many nodes were left over.
        count: usize,
    },

    #[error("embedded trie node is malformed: {0}")]
    /// A child embedded in a proof node is not a valid node.
    MalformedEmbeddedNode(NodeDecodeError),
}

/// A proof failed to verify against a root.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("proof for {subject} does not verify against root {root:#x}: {kind}")]
pub struct ProofError {
    /// Whose proof failed.
    pub subject: ProofSubject,
    /// The root the proof was checked against.
    pub root: H256,
    /// What went wrong.
    pub kind: ProofErrorKind,
}

/// Verifies that `proof` shows `hashed_key` maps to `expected_value` in the
/// trie with root `root`. An empty `expected_value` asks for a proof of
/// absence.
pub fn verify_proof(
    root: H256,
    hashed_key: H256,
    proof: &[TrieNode],
    expected_value: &[u8],
) -> Result<(), ProofErrorKind> {
    let key = Nibbles::from_bytes_be(hashed_key.as_bytes());
    let resolved = resolve(root, key, proof)?;
    let actual = resolved.unwrap_or_default();

    match actual == expected_value {
        true => Ok(()),
        false => Err(ProofErrorKind::ValueMismatch {
            expected: expected_value.to_vec(),
            actual,
        }),
    }
}

/// Verifies an account proof against a state root.
///
/// The account's own fields determine the expected leaf value. The storage
/// proofs are not looked at; see [`verify_state_proof`].
pub fn verify_account_proof(proof: &AccountProof, root: H256) -> Result<(), ProofError> {
    let expected = proof.account_record().expected_value();
    let hashed_key = keccak(proof.address.as_bytes());

    verify_proof(root, hashed_key, &proof.account_proof, &expected).map_err(|kind| ProofError {
        subject: ProofSubject::Account(proof.address),
        root,
        kind,
    })
}

/// Verifies one storage slot proof of `address` against the account's storage
/// root.
pub fn verify_storage_proof(
    address: H160,
    entry: &StorageProof,
    storage_root: H256,
) -> Result<(), ProofError> {
    let expected = storage_expected_value(&entry.value);
    let hashed_key = keccak(entry.key.as_bytes());

    verify_proof(storage_root, hashed_key, &entry.proof, &expected).map_err(|kind| ProofError {
        subject: ProofSubject::Storage {
            address,
            slot: entry.key,
        },
        root: storage_root,
        kind,
    })
}

/// Verifies an account proof and then each of its storage proofs against the
/// (now authenticated) storage root of the account.
pub fn verify_state_proof(proof: &AccountProof, root: H256) -> Result<(), ProofError> {
    verify_account_proof(proof, root)?;

    for entry in proof.storage_proof.iter() {
        verify_storage_proof(proof.address, entry, proof.storage_hash)?;
    }

    trace!(
        "Verified {:#x} with {} slots against {:#x}",
        proof.address,
        proof.storage_proof.len(),
        root
    );

    Ok(())
}

/// Walks `proof` from `root` along `key` and returns the value stored under
/// `key`, or `None` if the proof shows there is none.
pub(crate) fn resolve(
    root: H256,
    mut key: Nibbles,
    proof: &[TrieNode],
) -> Result<Option<Vec<u8>>, ProofErrorKind> {
    if is_empty_trie_root(&root) && proof.is_empty() {
        return Ok(None);
    }

    let mut nodes = proof.iter().enumerate();
    let mut next = ChildRef::Hash(root);

    let resolved = loop {
        let node: Cow<'_, TrieNode> = match &next {
            ChildRef::Empty => break None,
            ChildRef::Hash(expected) => {
                let (index, node) = nodes.next().ok_or(ProofErrorKind::MissingNode {
                    index: proof.len(),
                    expected: *expected,
                })?;

                let actual = node.hash();
                if actual != *expected {
                    return Err(ProofErrorKind::HashMismatch {
                        index,
                        expected: *expected,
                        actual,
                    });
                }

                Cow::Borrowed(node)
            }
            ChildRef::Embedded(raw) => Cow::Owned(
                TrieNode::decode(raw).map_err(ProofErrorKind::MalformedEmbeddedNode)?,
            ),
        };

        next = match node.kind() {
            NodeKind::Branch { children, value } => match key.pop_next_nibble_front() {
                Some(nibble) => ChildRef::from_field(&children[nibble as usize]),
                None => break (!value.is_empty()).then(|| value.to_vec()),
            },
            NodeKind::Extension { path, child } => match key.strip_prefix(&path) {
                true => ChildRef::from_field(child),
                false => break None,
            },
            NodeKind::Leaf { path, value } => match key == path {
                true => break Some(value.to_vec()),
                false => break None,
            },
        };
    };

    let count = nodes.count();
    if count > 0 {
        return Err(ProofErrorKind::TrailingNodes { count });
    }

    Ok(resolved)
}
