//! Generation-checked handles for maps and cursors.
//!
//! Handle layout (`u64`):
//! - Bits 56..64: resource kind tag
//! - Bits 32..56: slot generation (never 0)
//! - Bits  0..32: slot index
//!
//! `0` is never issued, so hosts can use it as a null handle. Destroying a
//! resource bumps its slot generation, so every copy of the old handle is
//! rejected as stale instead of reaching whatever reuses the slot.
//! A slot whose generation reaches the 24-bit limit is retired for good.

use tracing::{debug, trace};

use crate::config::Config;
use crate::cursor::{Cursor, Direction, Entry};
use crate::error::{Error, Result};
use crate::map::OrderedMap;

const KIND_SHIFT: u32 = 56;
const GEN_SHIFT: u32 = 32;
const GEN_MASK: u64 = (1 << 24) - 1;
const INDEX_MASK: u64 = (1 << 32) - 1;

const MAP_KIND: u8 = 0x4D; // 'M'
const CURSOR_KIND: u8 = 0x43; // 'C'

/// Handle to a map owned by a `Registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MapHandle(pub u64);

/// Handle to a cursor owned by a `Registry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct CursorHandle(pub u64);

// =============================================================================
// Handle table
// =============================================================================

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena with a free list.
struct HandleTable<T> {
    kind: u8,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    const fn new(kind: u8) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    fn encode(&self, index: u32, generation: u32) -> u64 {
        ((self.kind as u64) << KIND_SHIFT) | ((generation as u64) << GEN_SHIFT) | index as u64
    }

    fn insert(&mut self, value: T) -> Result<u64> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| Error::OutOfMemory { bytes: std::mem::size_of::<Slot<T>>() })?;
                self.slots.push(Slot {
                    generation: 1,
                    value: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        let generation = slot.generation;
        self.live += 1;
        Ok(self.encode(index, generation))
    }

    /// Resolves a raw handle to its slot index.
    fn locate(&self, raw: u64) -> Result<usize> {
        let kind = (raw >> KIND_SHIFT) as u8;
        let generation = ((raw >> GEN_SHIFT) & GEN_MASK) as u32;
        let index = (raw & INDEX_MASK) as usize;

        if kind != self.kind || generation == 0 {
            return Err(Error::InvalidHandle(raw));
        }
        let slot = self.slots.get(index).ok_or(Error::InvalidHandle(raw))?;
        if generation > slot.generation {
            return Err(Error::InvalidHandle(raw));
        }
        if generation != slot.generation || slot.value.is_none() {
            return Err(Error::StaleHandle(raw));
        }
        Ok(index)
    }

    fn get(&self, raw: u64) -> Result<&T> {
        let index = self.locate(raw)?;
        self.slots[index]
            .value
            .as_ref()
            .ok_or(Error::StaleHandle(raw))
    }

    fn get_mut(&mut self, raw: u64) -> Result<&mut T> {
        let index = self.locate(raw)?;
        self.slots[index]
            .value
            .as_mut()
            .ok_or(Error::StaleHandle(raw))
    }

    fn remove(&mut self, raw: u64) -> Result<T> {
        let index = self.locate(raw)?;
        let slot = &mut self.slots[index];
        let value = slot.value.take().ok_or(Error::StaleHandle(raw))?;
        // A slot whose generation is spent is retired, never reissued:
        // wrapping would make old handles valid again.
        if (slot.generation as u64) < GEN_MASK {
            slot.generation += 1;
            self.free.push(index as u32);
        }
        self.live -= 1;
        Ok(value)
    }

    fn len(&self) -> usize {
        self.live
    }
}

// =============================================================================
// Registry
// =============================================================================

struct CursorSlot {
    map: MapHandle,
    cursor: Cursor,
}

/// Owns every map and cursor reachable through handles.
///
/// This is the safe form of the C surface: each `tagmap_*` function locks
/// the process-wide registry and calls the matching method here.
pub struct Registry {
    maps: HandleTable<OrderedMap>,
    cursors: HandleTable<CursorSlot>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            maps: HandleTable::new(MAP_KIND),
            cursors: HandleTable::new(CURSOR_KIND),
        }
    }

    pub fn create_map(&mut self) -> Result<MapHandle> {
        self.create_map_with_config(Config::default())
    }

    pub fn create_map_with_config(&mut self, config: Config) -> Result<MapHandle> {
        let map = OrderedMap::with_config(config)?;
        let handle = MapHandle(self.maps.insert(map)?);
        debug!(map = handle.0, max_key_len = config.max_key_len, "created map");
        Ok(handle)
    }

    /// Drops the map and every key it holds. Cursors created from it stay
    /// allocated until destroyed, but can no longer advance.
    pub fn destroy_map(&mut self, map: MapHandle) -> Result<()> {
        let removed = self.maps.remove(map.0)?;
        debug!(map = map.0, entries = removed.len(), "destroyed map");
        Ok(())
    }

    pub fn map(&self, map: MapHandle) -> Result<&OrderedMap> {
        self.maps.get(map.0)
    }

    pub fn map_mut(&mut self, map: MapHandle) -> Result<&mut OrderedMap> {
        self.maps.get_mut(map.0)
    }

    pub fn get(&self, map: MapHandle, key: &[u8]) -> Result<Option<u64>> {
        Ok(self.map(map)?.get(key))
    }

    pub fn set(&mut self, map: MapHandle, key: &[u8], value: u64) -> Result<()> {
        self.map_mut(map)?.set(key, value)
    }

    /// Returns `(previous value or 0, existed)`.
    pub fn put_new_and_get_old(
        &mut self,
        map: MapHandle,
        key: &[u8],
        value: u64,
    ) -> Result<(u64, bool)> {
        let old = self.map_mut(map)?.put_new_and_get_old(key, value)?;
        Ok((old.unwrap_or(0), old.is_some()))
    }

    pub fn erase(&mut self, map: MapHandle, key: &[u8]) -> Result<()> {
        self.map_mut(map)?.erase(key);
        Ok(())
    }

    pub fn seek_first(&mut self, map: MapHandle) -> Result<CursorHandle> {
        let cursor = self.map(map)?.seek_first()?;
        self.register_cursor(map, cursor)
    }

    pub fn seek(&mut self, map: MapHandle, key: &[u8]) -> Result<CursorHandle> {
        let cursor = self.map(map)?.seek(key)?;
        self.register_cursor(map, cursor)
    }

    fn register_cursor(&mut self, map: MapHandle, cursor: Cursor) -> Result<CursorHandle> {
        let exhausted = cursor.is_exhausted();
        let handle = CursorHandle(self.cursors.insert(CursorSlot { map, cursor })?);
        trace!(map = map.0, cursor = handle.0, exhausted, "created cursor");
        Ok(handle)
    }

    /// Returns the entry under the cursor and steps it.
    ///
    /// The returned key borrows the map: it is invalidated by any mutation of
    /// the map and by the next call on the cursor.
    pub fn advance(
        &mut self,
        map: MapHandle,
        cursor: CursorHandle,
        direction: Direction,
    ) -> Result<Option<Entry<'_>>> {
        let slot = self.cursors.get_mut(cursor.0)?;
        if slot.map != map {
            return Err(Error::CursorMapMismatch {
                cursor: cursor.0,
                owner: slot.map.0,
                given: map.0,
            });
        }
        let target = self.maps.get(map.0)?;
        slot.cursor.advance(target, direction)
    }

    pub fn destroy_cursor(&mut self, cursor: CursorHandle) -> Result<()> {
        self.cursors.remove(cursor.0)?;
        trace!(cursor = cursor.0, "destroyed cursor");
        Ok(())
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn cursor_count(&self) -> usize {
        self.cursors.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
