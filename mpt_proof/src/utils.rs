//! Various types and logic that don't fit well into any other module.

use ethereum_types::{H160, H256};

/// The hash of an empty Merkle Patricia trie.
/// 0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421
pub const EMPTY_TRIE_HASH: H256 = keccak_hash::KECCAK_NULL_RLP;

/// The hash value of an account empty EVM code.
/// 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
pub const EMPTY_CODE_HASH: H256 = keccak_hash::KECCAK_EMPTY;

/// Returns `true` if `root` denotes a trie without any node.
///
/// Some clients report the zero hash instead of [`EMPTY_TRIE_HASH`] for
/// accounts without storage.
pub fn is_empty_trie_root(root: &H256) -> bool {
    *root == EMPTY_TRIE_HASH || root.is_zero()
}

/// Renders an address the way artifacts key it: lowercase hex, no prefix.
pub fn address_key(address: &H160) -> String {
    hex::encode(address.as_bytes())
}

/// Left pads `bytes` with zeros up to `32` bytes.
///
/// Returns `None` if `bytes` is longer than `32` bytes.
pub fn left_pad32(bytes: &[u8]) -> Option<H256> {
    if bytes.len() > 32 {
        return None;
    }

    let mut padded = [0; 32];
    padded[32 - bytes.len()..].copy_from_slice(bytes);
    Some(H256(padded))
}

/// Decodes hex with or without a leading `0x`. An odd number of digits is
/// treated as having an implicit leading `0`.
pub(crate) fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    match digits.len() % 2 {
        0 => hex::decode(digits),
        _ => hex::decode(format!("0{digits}")),
    }
}

/// Like `#[serde(with = "::hex")]`, but tolerates and emits leading `0x`
/// prefixes. This is the RPC wire format.
pub(crate) mod prefixed_hex {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(data)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_hex(&s).map_err(D::Error::custom)
    }
}

/// Storage slots are quantities on the wire (`"0x0"` is valid), but always 32
/// bytes once they are keys.
pub(crate) mod slot_hex {
    use ethereum_types::H256;
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(slot: &H256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", slot))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<H256, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = super::decode_hex(&s).map_err(D::Error::custom)?;
        super::left_pad32(&bytes)
            .ok_or_else(|| D::Error::custom(format!("storage slot {s} is longer than 32 bytes")))
    }
}

/// Lowercase hex without a prefix. This is the artifact format.
pub(crate) mod bare_hex {
    use ethereum_types::H256;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(hash: &H256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash.as_bytes()))
    }
}
