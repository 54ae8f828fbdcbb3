use std::ops::Range;

use super::layer::LayerId;

/// A live slice `[offset, offset + len)` of one layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub layer: LayerId,
    pub offset: usize,
    pub len: usize,
}

impl Segment {
    pub fn new(layer: LayerId, offset: usize, len: usize) -> Self {
        Self { layer, offset, len }
    }

    /// One past the last layer byte this segment covers
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
