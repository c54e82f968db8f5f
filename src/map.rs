//! Ordered byte-key map with `u64` values.
//!
//! The balanced tree is the standard library `BTreeMap`; this module only
//! adapts it to tagged keys and keeps representation statistics.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::key::TaggedKey;

/// Memory usage statistics for a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStats {
    /// Number of keys stored
    pub num_keys: usize,
    /// Keys stored inline, without a heap buffer
    pub inline_keys: usize,
    /// Keys backed by a heap buffer
    pub owned_keys: usize,
    /// Bytes held in owned key buffers
    pub owned_key_bytes: usize,
    /// Entry slots plus owned key bytes; tree node overhead is not counted
    pub approx_total_bytes: usize,
    /// Bytes per key (calculated)
    pub bytes_per_key: f64,
}

/// An ordered map from byte strings to `u64`.
#[derive(Clone)]
pub struct OrderedMap {
    inner: BTreeMap<TaggedKey, u64>,
    config: Config,
    inline_keys: usize,
    owned_key_bytes: usize,
}

impl OrderedMap {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
            config: Config::default(),
            inline_keys: 0,
            owned_key_bytes: 0,
        }
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.inner.get(key).copied()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.inner.contains_key(key)
    }

    /// Inserts or overwrites.
    pub fn set(&mut self, key: &[u8], value: u64) -> Result<()> {
        self.put_new_and_get_old(key, value).map(|_| ())
    }

    /// Inserts or overwrites, returning the previous value if there was one.
    ///
    /// A key is only allocated when it is new; overwriting reuses the stored
    /// key.
    pub fn put_new_and_get_old(&mut self, key: &[u8], value: u64) -> Result<Option<u64>> {
        if let Some(slot) = self.inner.get_mut(key) {
            return Ok(Some(std::mem::replace(slot, value)));
        }

        self.config.check_key(key)?;
        let key = TaggedKey::try_new(key)?;
        self.account_insert(&key);
        self.inner.insert(key, value);
        Ok(None)
    }

    /// Removes `key`, returning its value. Absent keys are a no-op.
    pub fn erase(&mut self, key: &[u8]) -> Option<u64> {
        let (key, value) = self.inner.remove_entry(key)?;
        self.account_remove(&key);
        Some(value)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.inline_keys = 0;
        self.owned_key_bytes = 0;
    }

    /// Cursor at the smallest key, exhausted when the map is empty.
    pub fn seek_first(&self) -> Result<Cursor> {
        Cursor::first(self)
    }

    /// Cursor at exactly `key`, exhausted when `key` is absent.
    pub fn seek(&self, key: &[u8]) -> Result<Cursor> {
        Cursor::at(self, key)
    }

    /// All entries in ascending key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&[u8], u64)> + ExactSizeIterator + '_ {
        self.inner.iter().map(|(k, v)| (k.as_bytes(), *v))
    }

    /// Entries with `start <= key < end`. Reverse it for descending order.
    ///
    /// An empty or inverted domain yields nothing.
    pub fn range<'a>(
        &'a self,
        start: &'a [u8],
        end: &'a [u8],
    ) -> impl DoubleEndedIterator<Item = (&'a [u8], u64)> + 'a {
        // BTreeMap::range panics on an inverted range.
        let end = if start < end { end } else { start };
        self.inner
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.as_bytes(), *v))
    }

    pub fn memory_stats(&self) -> MemoryStats {
        let num_keys = self.len();
        let slot_bytes = std::mem::size_of::<TaggedKey>() + std::mem::size_of::<u64>();
        let approx_total_bytes = num_keys * slot_bytes + self.owned_key_bytes;
        MemoryStats {
            num_keys,
            inline_keys: self.inline_keys,
            owned_keys: num_keys - self.inline_keys,
            owned_key_bytes: self.owned_key_bytes,
            approx_total_bytes,
            bytes_per_key: if num_keys > 0 {
                approx_total_bytes as f64 / num_keys as f64
            } else {
                0.0
            },
        }
    }

    pub(crate) fn entry(&self, key: &[u8]) -> Option<(&TaggedKey, u64)> {
        self.inner.get_key_value(key).map(|(k, v)| (k, *v))
    }

    pub(crate) fn first_key(&self) -> Option<&TaggedKey> {
        self.inner.keys().next()
    }

    pub(crate) fn successor(&self, key: &[u8]) -> Option<&TaggedKey> {
        self.inner
            .range::<[u8], _>((Bound::Excluded(key), Bound::<&[u8]>::Unbounded))
            .next()
            .map(|(k, _)| k)
    }

    pub(crate) fn predecessor(&self, key: &[u8]) -> Option<&TaggedKey> {
        self.inner
            .range::<[u8], _>((Bound::<&[u8]>::Unbounded, Bound::Excluded(key)))
            .next_back()
            .map(|(k, _)| k)
    }

    fn account_insert(&mut self, key: &TaggedKey) {
        if key.is_inline() {
            self.inline_keys += 1;
        } else {
            self.owned_key_bytes += key.heap_bytes();
        }
    }

    fn account_remove(&mut self, key: &TaggedKey) {
        if key.is_inline() {
            self.inline_keys -= 1;
        } else {
            self.owned_key_bytes -= key.heap_bytes();
        }
    }
}

impl Default for OrderedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OrderedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}
