//! Define [`Nibbles`] and how to convert bytes and hex prefix ("compact")
//! encodings into nibbles.
use std::fmt::{self, Debug, Display, LowerHex};
use std::str::FromStr;

use thiserror::Error;

// Use a whole byte for a Nibble just for convenience
/// A Nibble has 4 bits and is stored as `u8`.
pub type Nibble = u8;

/// The longest path a secure trie key can have (`32` bytes).
pub const MAX_KEY_NIBBLES: usize = 64;

#[derive(Clone, Debug, Eq, Error, PartialEq, Hash)]
/// Errors encountered when converting a hex prefix encoding into nibbles.
pub enum FromHexPrefixError {
    #[error("Tried to convert an empty hex prefix byte string into `Nibbles`")]
    /// There is no flag nibble at all.
    Empty,

    #[error("Tried to convert a hex prefix byte string into `Nibbles` with invalid flags at the start: {0:#04b}")]
    /// The hex prefix encoding flag is invalid.
    InvalidFlags(Nibble),

    #[error("Hex prefix byte string with an even path has a non-zero padding nibble: {0:#x}")]
    /// The padding nibble following an even flag must be zero.
    NonZeroPadding(Nibble),

    #[error("Tried to convert a hex prefix byte string into `Nibbles` that was longer than 33 bytes: (length: {1}, bytes: {0})")]
    /// The hex prefix encoding is too large.
    TooLong(String, usize),
}

#[derive(Clone, Debug, Eq, Error, PartialEq, Hash)]
/// An error encountered when parsing a string into a sequence of nibbles.
#[error("Invalid hex character {0:?} in nibble string")]
pub struct StrToNibblesError(char);

/// A sequence of nibbles, the unit trie keys are traversed in.
///
/// Leading `0` nibbles are significant: `0x0123` and `0x123` are different
/// paths.
/// ```rust
/// # use mpt_proof::nibbles::Nibbles;
/// let n1: Nibbles = "0x123".parse().unwrap();
/// let n2: Nibbles = "0x0123".parse().unwrap();
///
/// assert_ne!(n1, n2);
/// assert_eq!(n2.len(), 4);
/// ```
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Nibbles {
    nibbles: Vec<Nibble>,
}

impl Nibbles {
    /// Creates `Nibbles` from big endian bytes. Every byte yields two nibbles.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        let nibbles = bytes.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect();

        Self { nibbles }
    }

    /// Converts a hex prefix byte string ("AKA "compact") into `Nibbles`,
    /// along with whether the flag marks the path as terminating in a leaf.
    pub fn from_hex_prefix_encoding(
        hex_prefix_bytes: &[u8],
    ) -> Result<(Self, bool), FromHexPrefixError> {
        let (first, rest) = hex_prefix_bytes
            .split_first()
            .ok_or(FromHexPrefixError::Empty)?;

        if hex_prefix_bytes.len() > MAX_KEY_NIBBLES / 2 + 1 {
            return Err(FromHexPrefixError::TooLong(
                hex::encode(hex_prefix_bytes),
                hex_prefix_bytes.len(),
            ));
        }

        let flag_bits = first >> 4;
        let low_nibble = first & 0x0f;

        // is_odd --> 0b01
        // is_leaf --> 0b10
        let (is_leaf, is_odd) = match flag_bits {
            0b00 => (false, false),
            0b01 => (false, true),
            0b10 => (true, false),
            0b11 => (true, true),
            _ => return Err(FromHexPrefixError::InvalidFlags(flag_bits)),
        };

        let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
        match is_odd {
            true => nibbles.push(low_nibble),
            false if low_nibble != 0 => {
                return Err(FromHexPrefixError::NonZeroPadding(low_nibble))
            }
            false => (),
        }
        nibbles.extend(rest.iter().flat_map(|b| [b >> 4, b & 0x0f]));

        Ok((Self { nibbles }, is_leaf))
    }

    /// Converts `Nibbles` to hex-prefix encoding ("AKA "compact").
    #[cfg(test)]
    pub(crate) fn to_hex_prefix_encoding(&self, is_leaf: bool) -> Vec<u8> {
        let is_odd = self.nibbles.len() % 2 == 1;
        let flags = (is_odd as u8) | ((is_leaf as u8) << 1);

        let mut bytes = Vec::with_capacity(self.nibbles.len() / 2 + 1);
        let mut rest = self.nibbles.iter().copied();
        match is_odd {
            // `rest` is non-empty when the count is odd.
            true => bytes.push((flags << 4) | rest.next().unwrap_or_default()),
            false => bytes.push(flags << 4),
        }

        let rest = rest.collect::<Vec<_>>();
        bytes.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));

        bytes
    }

    /// The number of nibbles in this sequence.
    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    /// Returns `true` if there are no nibbles left.
    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }

    /// Pops the nibble at the front (the next nibble), if any.
    pub fn pop_next_nibble_front(&mut self) -> Option<Nibble> {
        match self.nibbles.is_empty() {
            true => None,
            false => Some(self.nibbles.remove(0)),
        }
    }

    /// Returns `true` if `prefix` is a prefix of these nibbles.
    pub fn starts_with(&self, prefix: &Nibbles) -> bool {
        self.nibbles.starts_with(&prefix.nibbles)
    }

    /// Removes `prefix` from the front if present. Leaves `self` untouched and
    /// returns `false` otherwise.
    pub fn strip_prefix(&mut self, prefix: &Nibbles) -> bool {
        if !self.starts_with(prefix) {
            return false;
        }

        self.nibbles.drain(..prefix.len());
        true
    }
}

impl FromStr for Nibbles {
    type Err = StrToNibblesError;

    /// Parses a hex string with or without a preceding "0x". Every character
    /// is one nibble, so leading zeros are kept.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let nibbles = s
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as Nibble)
                    .ok_or(StrToNibblesError(c))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { nibbles })
    }
}

impl LowerHex for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "0x")?;
        }

        for n in self.nibbles.iter() {
            write!(f, "{:x}", n)?;
        }

        Ok(())
    }
}

impl Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self)
    }
}

impl Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles({:#x})", self)
    }
}
