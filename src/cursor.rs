//! Movable positions into an `OrderedMap`.
//!
//! A cursor remembers the key it sits on rather than a tree node, so it never
//! dangles: when the map is mutated underneath it, the next step re-resolves
//! the position. If its key was erased in the meantime the cursor becomes
//! exhausted.
//!
//! Each step costs O(log n) plus one copy of the next key, which allocates
//! when that key is not inline.

use crate::error::Result;
use crate::key::TaggedKey;
use crate::map::OrderedMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards larger keys.
    Forward,
    /// Towards smaller keys.
    Backward,
}

/// A borrowed view of one map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'m> {
    pub key: &'m [u8],
    pub value: u64,
}

#[derive(Debug, Clone)]
enum Position {
    At(TaggedKey),
    Exhausted,
}

/// A position in one map, or the terminal exhausted state.
///
/// The cursor does not borrow the map; every call takes the map explicitly.
/// Passing a different map than the one the cursor came from is not detected
/// here (the handle registry checks that).
#[derive(Debug, Clone)]
pub struct Cursor {
    position: Position,
}

impl Cursor {
    pub fn exhausted() -> Self {
        Self {
            position: Position::Exhausted,
        }
    }

    pub(crate) fn first(map: &OrderedMap) -> Result<Self> {
        Self::positioned(map.first_key())
    }

    pub(crate) fn at(map: &OrderedMap, key: &[u8]) -> Result<Self> {
        Self::positioned(map.entry(key).map(|(k, _)| k))
    }

    fn positioned(key: Option<&TaggedKey>) -> Result<Self> {
        let position = match key {
            Some(key) => Position::At(key.try_clone()?),
            None => Position::Exhausted,
        };
        Ok(Self { position })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.position, Position::Exhausted)
    }

    /// The entry under the cursor, without moving.
    pub fn peek<'m>(&self, map: &'m OrderedMap) -> Option<Entry<'m>> {
        match &self.position {
            Position::At(key) => map.entry(key.as_bytes()).map(|(k, value)| Entry {
                key: k.as_bytes(),
                value,
            }),
            Position::Exhausted => None,
        }
    }

    /// Returns the entry under the cursor, then steps one position.
    ///
    /// `None` means the cursor was exhausted before the call; it stays
    /// exhausted. Stepping off either end of the map exhausts the cursor
    /// after the last entry has been returned.
    pub fn advance<'m>(
        &mut self,
        map: &'m OrderedMap,
        direction: Direction,
    ) -> Result<Option<Entry<'m>>> {
        let current = match &self.position {
            Position::At(key) => map.entry(key.as_bytes()),
            Position::Exhausted => return Ok(None),
        };
        let Some((key, value)) = current else {
            self.position = Position::Exhausted;
            return Ok(None);
        };

        let next = match direction {
            Direction::Forward => map.successor(key.as_bytes()),
            Direction::Backward => map.predecessor(key.as_bytes()),
        };
        self.position = match next {
            Some(next) => Position::At(next.try_clone()?),
            None => Position::Exhausted,
        };

        Ok(Some(Entry {
            key: key.as_bytes(),
            value,
        }))
    }

    pub fn next<'m>(&mut self, map: &'m OrderedMap) -> Result<Option<Entry<'m>>> {
        self.advance(map, Direction::Forward)
    }

    pub fn prev<'m>(&mut self, map: &'m OrderedMap) -> Result<Option<Entry<'m>>> {
        self.advance(map, Direction::Backward)
    }
}
