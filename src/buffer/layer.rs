//! Owned byte arrays backing the segment chain

use std::ops::Range;

use crate::error::Result;

/// Index of a layer in the buffer's layer store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct LayerId(pub(crate) usize);

/// A growable byte array. `len()` is the used region; bytes past the
/// last live segment that still sit inside it are garbage.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layer {
    bytes: Vec<u8>,
}

impl Layer {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copy `bytes` into a fresh, exactly-sized layer
    pub fn copy_of(bytes: &[u8]) -> Result<Self> {
        let mut v = Vec::new();
        v.try_reserve_exact(bytes.len())?;
        v.extend_from_slice(bytes);
        Ok(Self { bytes: v })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn slice(&self, range: Range<usize>) -> &[u8] {
        &self.bytes[range]
    }

    pub fn byte(&self, at: usize) -> u8 {
        self.bytes[at]
    }

    /// Splice `bytes` in at `at`, shifting the tail of the layer forward
    pub fn splice_in(&mut self, at: usize, bytes: &[u8]) -> Result<()> {
        self.bytes.try_reserve(bytes.len())?;
        self.bytes.splice(at..at, bytes.iter().copied());
        Ok(())
    }

    /// Remove a byte range, shifting the tail of the layer back
    pub fn cut(&mut self, range: Range<usize>) {
        self.bytes.drain(range);
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }
}
