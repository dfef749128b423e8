//! Isolation of the terminal nodes of verified paths.
//!
//! Downstream consumers prove individual account fields or storage values and
//! need the leaf of each path without re-deriving node kinds themselves.

use hashbrown::HashSet;
use serde::{Serialize, Serializer};

use crate::{
    node::TrieNode,
    proof::AccountProof,
    utils::address_key,
};

/// The account field a leaf record stands for.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum AccountField {
    /// The nonce.
    Nonce = 0,
    /// The balance.
    Balance = 1,
    /// The code.
    Code = 2,
    /// The storage root (the account has storage proofs).
    Storage = 3,
}

impl Serialize for AccountField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// A terminal node of a verified path.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct LeafRecord {
    /// The unhashed key: the address for accounts, the padded slot for
    /// storage. Lowercase hex without prefix.
    pub original_key: String,
    /// The leaf node.
    pub node: TrieNode,
    /// Always `0`.
    pub offset: usize,
    /// Set for account trie leaves only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<AccountField>,
}

/// Leaf records of one trie, without duplicates, in discovery order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LeafList {
    records: Vec<LeafRecord>,
    index: HashSet<LeafRecord>,
}

impl LeafList {
    /// Adds `records` that are not in the list yet. Returns how many were new.
    pub fn extend(&mut self, records: impl IntoIterator<Item = LeafRecord>) -> usize {
        let before = self.records.len();

        for record in records {
            if self.index.insert(record.clone()) {
                self.records.push(record);
            }
        }

        self.records.len() - before
    }

    /// The records in discovery order.
    pub fn records(&self) -> &[LeafRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for LeafList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

/// Leaf records for the account trie path of `proof`.
///
/// Only the last node of the path is looked at. If it is leaf shaped, it is
/// recorded once per field the account has: nonce and balance always, code if
/// the proven code hash is not the empty one, and storage if any storage proof
/// was requested.
pub fn classify_account_leaves(proof: &AccountProof) -> Vec<LeafRecord> {
    let Some(node) = proof
        .account_proof
        .last()
        .filter(|node| node.is_leaf_shaped())
    else {
        return Vec::new();
    };

    let fields = [
        Some(AccountField::Nonce),
        Some(AccountField::Balance),
        proof
            .account_record()
            .has_code()
            .then_some(AccountField::Code),
        (!proof.storage_proof.is_empty()).then_some(AccountField::Storage),
    ];

    let original_key = address_key(&proof.address);
    fields
        .into_iter()
        .flatten()
        .map(|selector| LeafRecord {
            original_key: original_key.clone(),
            node: node.clone(),
            offset: 0,
            selector: Some(selector),
        })
        .collect()
}

/// Leaf records for the storage trie paths of `proof`, one per slot whose path
/// ends in a leaf shaped node.
pub fn classify_storage_leaves(proof: &AccountProof) -> Vec<LeafRecord> {
    proof
        .storage_proof
        .iter()
        .filter_map(|entry| {
            let node = entry.proof.last().filter(|node| node.is_leaf_shaped())?;

            Some(LeafRecord {
                original_key: hex::encode(entry.key.as_bytes()),
                node: node.clone(),
                offset: 0,
                selector: None,
            })
        })
        .collect()
}
