//! Account and storage proofs, both as returned by `eth_getProof` and in
//! their normalized form where every proof entry is a decoded [`TrieNode`].

use std::fmt::{self, Display};

use ethereum_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    account::AccountRecord,
    node::{NodeDecodeError, TrieNode},
    utils::{prefixed_hex, slot_hex},
};

/// What a proof is about.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProofSubject {
    /// The account at an address.
    Account(H160),
    /// One storage slot of a contract.
    Storage {
        /// The contract.
        address: H160,
        /// The slot, left padded to `32` bytes.
        slot: H256,
    },
}

impl Display for ProofSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofSubject::Account(address) => write!(f, "account {:#x}", address),
            ProofSubject::Storage { address, slot } => {
                write!(f, "storage slot {:#x} of account {:#x}", slot, address)
            }
        }
    }
}

/// A proof entry could not be decoded into a trie node.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("malformed proof entry {index} for {subject}: {reason}")]
pub struct MalformedProofError {
    /// Whose proof the entry belongs to.
    pub subject: ProofSubject,
    /// Position of the entry in its proof.
    pub index: usize,
    /// Why decoding failed.
    pub reason: NodeDecodeError,
}

/// One RLP encoded proof entry as it appears on the wire.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawNode(#[serde(with = "prefixed_hex")] pub Vec<u8>);

/// A storage proof as returned by `eth_getProof`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RawStorageProof {
    /// The requested slot.
    #[serde(with = "slot_hex")]
    pub key: H256,
    /// The slot's value.
    pub value: U256,
    /// Root to leaf proof nodes.
    pub proof: Vec<RawNode>,
}

/// The result of `eth_getProof`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountProof {
    /// The account.
    pub address: H160,
    /// The account's nonce.
    pub nonce: U256,
    /// The account's balance.
    pub balance: U256,
    /// Root of the account's storage trie.
    pub storage_hash: H256,
    /// Hash of the account's code.
    pub code_hash: H256,
    /// Root to leaf proof nodes in the state trie.
    pub account_proof: Vec<RawNode>,
    /// One proof per requested slot.
    #[serde(default)]
    pub storage_proof: Vec<RawStorageProof>,
}

/// A storage proof with decoded nodes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageProof {
    /// The slot, left padded to `32` bytes.
    pub key: H256,
    /// The slot's value.
    pub value: U256,
    /// Root to leaf proof nodes.
    pub proof: Vec<TrieNode>,
}

/// An account proof with decoded nodes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountProof {
    /// The account.
    pub address: H160,
    /// The account's nonce.
    pub nonce: U256,
    /// The account's balance.
    pub balance: U256,
    /// Root of the account's storage trie.
    pub storage_hash: H256,
    /// Hash of the account's code.
    pub code_hash: H256,
    /// Root to leaf proof nodes in the state trie.
    pub account_proof: Vec<TrieNode>,
    /// One proof per requested slot.
    pub storage_proof: Vec<StorageProof>,
}

impl AccountProof {
    /// The account as it is stored in the state trie.
    pub fn account_record(&self) -> AccountRecord {
        AccountRecord {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: self.storage_hash,
            code_hash: self.code_hash,
        }
    }
}

impl RawAccountProof {
    /// Decodes every proof entry, failing on the first one that is not a
    /// well formed trie node.
    pub fn normalize(self) -> Result<AccountProof, MalformedProofError> {
        let address = self.address;
        let account_proof = decode_nodes(self.account_proof, ProofSubject::Account(address))?;

        let storage_proof = self
            .storage_proof
            .into_iter()
            .map(|entry| {
                let subject = ProofSubject::Storage {
                    address,
                    slot: entry.key,
                };

                Ok(StorageProof {
                    key: entry.key,
                    value: entry.value,
                    proof: decode_nodes(entry.proof, subject)?,
                })
            })
            .collect::<Result<_, MalformedProofError>>()?;

        Ok(AccountProof {
            address,
            nonce: self.nonce,
            balance: self.balance,
            storage_hash: self.storage_hash,
            code_hash: self.code_hash,
            account_proof,
            storage_proof,
        })
    }
}

fn decode_nodes(
    raw: Vec<RawNode>,
    subject: ProofSubject,
) -> Result<Vec<TrieNode>, MalformedProofError> {
    raw.iter()
        .enumerate()
        .map(|(index, RawNode(bytes))| {
            TrieNode::decode(bytes).map_err(|reason| MalformedProofError {
                subject,
                index,
                reason,
            })
        })
        .collect()
}
