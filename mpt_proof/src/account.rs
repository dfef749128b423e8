//! The fixed layout of an account as it is stored in the state trie.

use ethereum_types::{H256, U256};
use rlp_derive::{RlpDecodable, RlpEncodable};

use crate::utils::{EMPTY_CODE_HASH, EMPTY_TRIE_HASH};

/// An account leaf value: `[nonce, balance, storage_root, code_hash]`.
///
/// Integers are encoded as minimal big endian byte strings, hashes as fixed
/// `32` byte strings.
#[derive(RlpEncodable, RlpDecodable, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccountRecord {
    /// Number of transactions sent (or contracts created) by the account.
    pub nonce: U256,
    /// Balance in wei.
    pub balance: U256,
    /// Root of the account's storage trie.
    pub storage_root: H256,
    /// Hash of the account's code.
    pub code_hash: H256,
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self {
            nonce: U256::zero(),
            balance: U256::zero(),
            storage_root: EMPTY_TRIE_HASH,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl AccountRecord {
    /// Returns `true` if the account has neither a nonce nor a balance.
    ///
    /// Such accounts are never stored in the state trie, so a proof for one
    /// has to be a proof of absence.
    pub fn is_blank(&self) -> bool {
        self.nonce.is_zero() && self.balance.is_zero()
    }

    /// Returns `true` if the account has code. Some clients report the zero
    /// hash instead of [`EMPTY_CODE_HASH`] for accounts without code.
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH && !self.code_hash.is_zero()
    }

    /// The value a proof for this account has to resolve to. Blank accounts
    /// resolve to the empty byte string.
    pub fn expected_value(&self) -> Vec<u8> {
        match self.is_blank() {
            true => Vec::new(),
            false => rlp::encode(self).to_vec(),
        }
    }
}

/// The value a storage proof has to resolve to: nothing for the zero word,
/// otherwise the RLP of the minimal big endian integer.
pub fn storage_expected_value(value: &U256) -> Vec<u8> {
    match value.is_zero() {
        true => Vec::new(),
        false => rlp::encode(value).to_vec(),
    }
}
