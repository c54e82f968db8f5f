//! Map configuration.

use crate::error::{Error, Result};

/// Longest key accepted by the bounded preset.
pub const BOUNDED_MAX_KEY_LEN: usize = 8192;

/// Per-map configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Keys longer than this are rejected with `Error::KeyTooLong`.
    pub max_key_len: usize,
}

impl Config {
    /// No limit beyond available memory.
    pub const fn unbounded() -> Self {
        Self {
            max_key_len: usize::MAX,
        }
    }

    /// Index-style limit of 8 KiB per key.
    pub const fn bounded() -> Self {
        Self {
            max_key_len: BOUNDED_MAX_KEY_LEN,
        }
    }

    pub fn with_max_key_len(mut self, max_key_len: usize) -> Self {
        self.max_key_len = max_key_len;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_key_len == 0 {
            return Err(Error::InvalidConfig("max_key_len must be > 0".into()));
        }
        Ok(())
    }

    /// Rejects keys over the configured limit.
    #[inline]
    pub(crate) fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() > self.max_key_len {
            return Err(Error::KeyTooLong {
                len: key.len(),
                max: self.max_key_len,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::unbounded()
    }
}
