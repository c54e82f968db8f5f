//! Byte-string keys with an inline small-key representation.
//!
//! Keys of exactly 8 bytes are kept by value when their first byte has a
//! non-zero low 2 bits. Every other key owns a heap buffer. Both forms order
//! identically: the order is plain lexicographic byte order of the content.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// Width of the inline representation.
pub const INLINE_LEN: usize = 8;

/// Low bits of the first byte that select the inline form when non-zero.
const INLINE_TAG_MASK: u8 = 0b11;

/// Value left behind by `mem::take` and returned by `Default`.
const SENTINEL: [u8; INLINE_LEN] = [0xFF; INLINE_LEN];

/// An immutable byte string stored either inline or in an owned buffer.
///
/// The representation is chosen once, at construction, and never leaks into
/// equality, hashing or ordering.
#[derive(Clone)]
pub enum TaggedKey {
    /// Exactly 8 bytes, first byte has `bytes[0] & 0b11 != 0`.
    Inline([u8; INLINE_LEN]),
    /// Any other key, including the empty key.
    Owned(Box<[u8]>),
}

impl TaggedKey {
    /// Returns true when `bytes` qualifies for the inline form.
    #[inline]
    pub fn fits_inline(bytes: &[u8]) -> bool {
        bytes.len() == INLINE_LEN && bytes[0] & INLINE_TAG_MASK != 0
    }

    /// Builds a key, aborting on allocation failure like any `Box` would.
    ///
    /// For callers building standalone keys; the map itself goes through
    /// [`TaggedKey::try_new`] so allocation failure can be reported.
    pub fn new(bytes: &[u8]) -> Self {
        match <[u8; INLINE_LEN]>::try_from(bytes) {
            Ok(word) if Self::fits_inline(bytes) => Self::Inline(word),
            _ => Self::Owned(Box::from(bytes)),
        }
    }

    /// Builds a key, reporting allocation failure instead of aborting.
    pub fn try_new(bytes: &[u8]) -> Result<Self> {
        if let Ok(word) = <[u8; INLINE_LEN]>::try_from(bytes) {
            if Self::fits_inline(bytes) {
                return Ok(Self::Inline(word));
            }
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(bytes.len())
            .map_err(|_| Error::OutOfMemory { bytes: bytes.len() })?;
        buf.extend_from_slice(bytes);
        Ok(Self::Owned(buf.into_boxed_slice()))
    }

    /// Fallible deep copy.
    pub fn try_clone(&self) -> Result<Self> {
        match self {
            Self::Inline(word) => Ok(Self::Inline(*word)),
            Self::Owned(buf) => Self::try_new(buf),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Inline(word) => &word[..],
            Self::Owned(buf) => &buf[..],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Inline(_) => INLINE_LEN,
            Self::Owned(buf) => buf.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }

    /// True for the all-ones inline value left behind by a move.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Inline(word) if *word == SENTINEL)
    }

    /// Heap bytes held by this key (zero when inline).
    #[inline]
    pub fn heap_bytes(&self) -> usize {
        match self {
            Self::Inline(_) => 0,
            Self::Owned(buf) => buf.len(),
        }
    }
}

impl Default for TaggedKey {
    fn default() -> Self {
        Self::Inline(SENTINEL)
    }
}

impl Ord for TaggedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Big-endian turns the integer order into byte order.
            (Self::Inline(a), Self::Inline(b)) => {
                u64::from_be_bytes(*a).cmp(&u64::from_be_bytes(*b))
            }
            _ => self.as_bytes().cmp(other.as_bytes()),
        }
    }
}

impl PartialOrd for TaggedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TaggedKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for TaggedKey {}

impl Hash for TaggedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

// Sound because `Ord`, `Eq` and `Hash` above all follow the byte content.
impl Borrow<[u8]> for TaggedKey {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for TaggedKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for TaggedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_inline() { "Inline" } else { "Owned" };
        write!(f, "{kind}(b\"{}\")", self.as_bytes().escape_ascii())
    }
}
