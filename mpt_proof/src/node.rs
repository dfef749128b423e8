//! Trie nodes as they appear in proofs: the ordered fields of one RLP-encoded
//! node.
//!
//! A node is either a branch (`17` fields: one child reference per nibble plus
//! a value) or a short node (`2` fields: a hex prefix encoded path plus either
//! a child reference (extension) or a value (leaf)).
//!
//! Child references are either empty, a `32` byte hash, or, when the child
//! encodes to fewer than `32` bytes, the child node itself. Embedded children
//! are kept as their raw RLP so that [`TrieNode::encode`] reproduces the
//! original bytes exactly.

use ethereum_types::H256;
use keccak_hash::keccak;
use rlp::{DecoderError, Prototype, Rlp, RlpStream};
use serde::{ser::SerializeSeq, Serialize, Serializer};
use thiserror::Error;

use crate::nibbles::{FromHexPrefixError, Nibbles};

/// Number of fields in a branch node.
pub const BRANCH_FIELD_COUNT: usize = 17;

/// Number of fields in an extension or leaf node.
pub const SHORT_FIELD_COUNT: usize = 2;

/// Errors encountered when decoding a trie node.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NodeDecodeError {
    #[error("invalid RLP: {0}")]
    /// The bytes are not valid RLP.
    Rlp(#[from] DecoderError),

    #[error("trie node is not an RLP list")]
    /// The node is a byte string instead of a list.
    NotAList,

    #[error("trie node has {0} fields (expected 2 or 17)")]
    /// The list has a shape that no trie node has.
    UnexpectedFieldCount(usize),

    #[error("{0} trailing bytes after the trie node")]
    /// The node is followed by bytes that are not part of it.
    TrailingBytes(usize),

    #[error("field {index} is not a valid child reference ({len} bytes)")]
    /// A child reference is neither empty, a hash, nor an embedded node.
    InvalidChildReference {
        /// Position of the field in the node.
        index: usize,
        /// Length of the offending field.
        len: usize,
    },

    #[error("field {0} is a nested list but holds a value")]
    /// A value position holds a list.
    UnexpectedList(usize),

    #[error("invalid node path: {0}")]
    /// The path of a short node is not a valid hex prefix encoding.
    Path(#[from] FromHexPrefixError),
}

/// A decoded trie node.
///
/// Construction always goes through [`TrieNode::decode`] or
/// [`TrieNode::from_fields`], so every instance has a valid shape.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TrieNode {
    fields: Vec<Vec<u8>>,
}

/// Structured view of a [`TrieNode`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeKind<'a> {
    /// Branch node.
    Branch {
        /// One reference per nibble `0..=15`.
        children: &'a [Vec<u8>],
        /// Value stored at the branch itself (empty if none).
        value: &'a [u8],
    },

    /// Extension node.
    Extension {
        /// Shared key piece.
        path: Nibbles,
        /// Reference to the single child.
        child: &'a [u8],
    },

    /// Leaf node.
    Leaf {
        /// Remainder of the key.
        path: Nibbles,
        /// The stored value.
        value: &'a [u8],
    },
}

/// Where the next node of a walk comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChildRef {
    /// No child at this position.
    Empty,
    /// The child is the next proof node, whose hash must match.
    Hash(H256),
    /// The child is embedded in its parent as raw RLP.
    Embedded(Vec<u8>),
}

impl ChildRef {
    /// Interprets a child reference field.
    pub fn from_field(field: &[u8]) -> Self {
        match field.len() {
            0 => ChildRef::Empty,
            32 => ChildRef::Hash(H256::from_slice(field)),
            _ => ChildRef::Embedded(field.to_vec()),
        }
    }
}

impl TrieNode {
    /// Decodes one RLP encoded trie node. The entire input must be consumed.
    pub fn decode(bytes: &[u8]) -> Result<Self, NodeDecodeError> {
        let rlp = Rlp::new(bytes);
        let info = rlp.payload_info()?;
        if info.total() > bytes.len() {
            return Err(DecoderError::RlpIsTooShort.into());
        }
        if info.total() < bytes.len() {
            return Err(NodeDecodeError::TrailingBytes(bytes.len() - info.total()));
        }

        let count = match rlp.prototype()? {
            Prototype::List(count) => count,
            _ => return Err(NodeDecodeError::NotAList),
        };
        if count != BRANCH_FIELD_COUNT && count != SHORT_FIELD_COUNT {
            return Err(NodeDecodeError::UnexpectedFieldCount(count));
        }

        let path = first_field_bytes(&rlp)?;
        let fields = rlp
            .iter()
            .enumerate()
            .map(|(index, item)| {
                if !item.is_list() {
                    return Ok(item.data()?.to_vec());
                }
                match is_child_position(count, index, path) {
                    true => Ok(item.as_raw().to_vec()),
                    false => Err(NodeDecodeError::UnexpectedList(index)),
                }
            })
            .collect::<Result<Vec<_>, NodeDecodeError>>()?;

        Self::from_fields(fields)
    }

    /// Builds a node from already decoded fields, validating its shape.
    pub fn from_fields(fields: Vec<Vec<u8>>) -> Result<Self, NodeDecodeError> {
        let count = fields.len();
        if count != BRANCH_FIELD_COUNT && count != SHORT_FIELD_COUNT {
            return Err(NodeDecodeError::UnexpectedFieldCount(count));
        }

        if count == SHORT_FIELD_COUNT {
            Nibbles::from_hex_prefix_encoding(&fields[0])?;
        }

        for (index, field) in fields.iter().enumerate() {
            if !is_child_position(count, index, &fields[0]) {
                continue;
            }

            let valid = match field.len() {
                0 | 32 => true,
                len if len < 32 => Rlp::new(field).is_list(),
                _ => false,
            };
            if !valid {
                return Err(NodeDecodeError::InvalidChildReference {
                    index,
                    len: field.len(),
                });
            }
        }

        Ok(Self { fields })
    }

    /// The fields of the node, in order.
    pub fn fields(&self) -> &[Vec<u8>] {
        &self.fields
    }

    /// Returns `true` if this is a branch node.
    pub fn is_branch(&self) -> bool {
        self.fields.len() == BRANCH_FIELD_COUNT
    }

    /// Returns `true` if the node has the shape of a leaf: `2` fields where the
    /// leading nibble of the path is `2` or `3`.
    pub fn is_leaf_shaped(&self) -> bool {
        self.fields.len() == SHORT_FIELD_COUNT && is_leaf_flag(&self.fields[0])
    }

    /// Classifies the node.
    pub fn kind(&self) -> NodeKind<'_> {
        if self.is_branch() {
            return NodeKind::Branch {
                children: &self.fields[..16],
                value: &self.fields[16],
            };
        }

        // The path was validated on construction.
        let (path, is_leaf) = Nibbles::from_hex_prefix_encoding(&self.fields[0])
            .unwrap_or_else(|_| (Nibbles::default(), is_leaf_flag(&self.fields[0])));

        match is_leaf {
            true => NodeKind::Leaf {
                path,
                value: &self.fields[1],
            },
            false => NodeKind::Extension {
                path,
                child: &self.fields[1],
            },
        }
    }

    /// The canonical RLP encoding of the node.
    pub fn encode(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(self.fields.len());

        for (index, field) in self.fields.iter().enumerate() {
            let embedded = is_child_position(self.fields.len(), index, &self.fields[0])
                && !field.is_empty()
                && field.len() < 32;

            match embedded {
                true => stream.append_raw(field, 1),
                false => stream.append(field),
            };
        }

        stream.out().to_vec()
    }

    /// The Keccak hash of the canonical encoding.
    pub fn hash(&self) -> H256 {
        keccak(self.encode())
    }
}

impl Serialize for TrieNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.fields.len()))?;
        for field in self.fields.iter() {
            seq.serialize_element(&hex::encode(field))?;
        }
        seq.end()
    }
}

fn first_field_bytes<'a>(rlp: &Rlp<'a>) -> Result<&'a [u8], NodeDecodeError> {
    let first = rlp.at(0)?;
    match first.is_list() {
        true => Ok(&[]),
        false => Ok(first.data()?),
    }
}

fn is_leaf_flag(path: &[u8]) -> bool {
    matches!(path.first().map(|b| b >> 4), Some(2) | Some(3))
}

/// Children live in branch slots `0..16` and in the second field of
/// extensions.
fn is_child_position(field_count: usize, index: usize, path: &[u8]) -> bool {
    match field_count {
        BRANCH_FIELD_COUNT => index < 16,
        SHORT_FIELD_COUNT => index == 1 && !is_leaf_flag(path),
        _ => false,
    }
}
