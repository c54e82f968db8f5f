//! # tagmap
//!
//! An ordered map from byte strings to `u64`, built for keys that cross a C
//! boundary.
//!
//! Keys of exactly 8 bytes whose first byte has a non-zero low 2 bits are
//! stored inline, with no heap allocation. All other keys own a heap buffer.
//! The representation never shows through: ordering is plain lexicographic
//! byte order across both forms.
//!
//! Hosts reach maps and cursors through generation-checked `u64` handles
//! (see [`ffi`]). Rust callers can use [`OrderedMap`] and [`Cursor`]
//! directly, or the handle-based [`Registry`].
//!
//! ## Example
//!
//! ```rust
//! use tagmap::OrderedMap;
//!
//! let mut map = OrderedMap::new();
//! map.set(b"a", 1).unwrap();
//! map.set(b"ab", 2).unwrap();
//! map.set(b"12345678", 4).unwrap();
//!
//! assert_eq!(map.get(b"ab"), Some(2));
//! assert_eq!(map.put_new_and_get_old(b"a", 10).unwrap(), Some(1));
//!
//! let mut cursor = map.seek_first().unwrap();
//! let first = cursor.next(&map).unwrap().unwrap();
//! assert_eq!(first.key, b"12345678");
//! assert_eq!(first.value, 4);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod config;
pub mod cursor;
pub mod error;
pub mod ffi;
pub mod key;
pub mod map;
pub mod registry;

pub use config::Config;
pub use cursor::{Cursor, Direction, Entry};
pub use error::{Error, Result};
pub use key::TaggedKey;
pub use map::{MemoryStats, OrderedMap};
pub use registry::{CursorHandle, MapHandle, Registry};

#[cfg(test)]
mod proptests;
