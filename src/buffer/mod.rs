//! Layered byte buffer with self-maintaining marks
//!
//! # Architecture
//!
//! - Layers: independently owned byte arrays ([`layer`])
//! - Segments: `(layer, offset, len)` slices whose concatenation is the
//!   document ([`segment`])
//! - Marks: stable handles to positions, stored as `(segment, offset)` in a
//!   free-list slot table with a per-segment reverse index ([`mark`])
//!
//! Edits ([`edit`]) either splice bytes straight into a layer when the copy
//! is cheap, or add a layer and split the segment chain. Fragmentation is
//! undone by [`Buffer::unify`].
//!
//! A position has exactly one internal form: a mark only ever sits at
//! `offset == segment.len` when that segment is the last one. Everything
//! else is carried forward into the next segment.
//!
//! # Example
//!
//! ```
//! use layerbuf::{Anchor, Buffer};
//!
//! let mut buffer = Buffer::from_bytes(b"hello world".to_vec());
//! let mark = buffer.create(Anchor::Offset(5)).unwrap();
//! buffer.insert(mark, b",").unwrap();
//!
//! assert_eq!(buffer.to_vec(), b"hello, world");
//! assert_eq!(buffer.byte_at(mark), Some(b' '));
//! ```

mod cursor;
mod edit;
mod layer;
mod mark;
mod reader;
mod segment;
mod unify;

pub use cursor::Direction;
pub use mark::{Anchor, Mark};
pub use reader::MarkReader;

use serde::Serialize;

use crate::config::BufferConfig;
use crate::error::Result;
use layer::{Layer, LayerId};
use mark::{MarkPos, MarkTable};
use segment::Segment;

/// Mutable byte store whose marks survive every edit
#[derive(Debug, Clone)]
pub struct Buffer {
    layers: Vec<Layer>,
    segments: Vec<Segment>,
    marks: MarkTable,
    filled: usize,
    config: BufferConfig,
}

/// Snapshot of the buffer's storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    /// Live content size in bytes
    pub filled: usize,
    pub layers: usize,
    pub segments: usize,
    pub marks: usize,
    /// Bytes held by layers that no segment references any more
    pub garbage: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Empty buffer with default thresholds
    pub fn new() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// Take ownership of already-loaded content as the first layer
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::with_config(bytes, BufferConfig::default())
    }

    pub fn with_config(bytes: Vec<u8>, config: BufferConfig) -> Self {
        let filled = bytes.len();
        Self {
            layers: vec![Layer::from_vec(bytes)],
            segments: vec![Segment::new(LayerId(0), 0, filled)],
            marks: MarkTable::new(1),
            filled,
            config,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BufferConfig) {
        self.config = config;
    }

    /// Live content size in bytes
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Copy of the live content, read straight from the segment chain
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.filled);
        for seg in &self.segments {
            out.extend_from_slice(self.layers[seg.layer.0].slice(seg.range()));
        }
        out
    }

    pub fn stats(&self) -> BufferStats {
        let stored: usize = self.layers.iter().map(Layer::len).sum();
        BufferStats {
            filled: self.filled,
            layers: self.layers.len(),
            segments: self.segments.len(),
            marks: self.marks.live(),
            garbage: stored - self.filled,
        }
    }

    // =========================================================================
    // Mark lifecycle
    // =========================================================================

    /// Create a mark at `anchor`, reusing a freed slot when one exists
    pub fn create(&mut self, anchor: Anchor) -> Result<Mark> {
        let pos = self.resolve(anchor);
        self.marks.alloc(pos)
    }

    /// Move an existing mark to `anchor` without changing its handle
    pub fn recreate(&mut self, mark: Mark, anchor: Anchor) -> Result<()> {
        let pos = self.resolve(anchor);
        self.marks.try_relocate(mark, pos)
    }

    /// Release a mark. The handle must not be used again.
    pub fn destroy(&mut self, mark: Mark) {
        self.marks.release(mark);
    }

    fn resolve(&self, anchor: Anchor) -> MarkPos {
        match anchor {
            Anchor::Start => self.canonical(MarkPos::new(0, 0)),
            Anchor::End => self.end_pos(),
            Anchor::Mark(other) => self.marks.pos(other),
            Anchor::Offset(offset) => self.canonical(MarkPos::new(0, offset)),
        }
    }

    // =========================================================================
    // Position helpers
    // =========================================================================

    fn last_segment(&self) -> usize {
        self.segments.len() - 1
    }

    fn end_pos(&self) -> MarkPos {
        let last = self.last_segment();
        MarkPos::new(last, self.segments[last].len)
    }

    /// Carry an offset forward through the chain until it lands inside a
    /// segment, clamping to the end of the buffer
    fn canonical(&self, mut pos: MarkPos) -> MarkPos {
        while pos.segment < self.last_segment() && pos.offset >= self.segments[pos.segment].len {
            pos.offset -= self.segments[pos.segment].len;
            pos.segment += 1;
        }
        let len = self.segments[pos.segment].len;
        if pos.offset > len {
            pos.offset = len;
        }
        pos
    }

    /// Relocate marks of `segments` that now sit at or past their segment's end
    fn settle(&mut self, segments: std::ops::Range<usize>) {
        let last = self.last_segment();
        for segment in segments.start..segments.end.min(last + 1) {
            let len = self.segments[segment].len;
            let stray = if segment == last {
                self.marks.marks_where(segment, |off| off > len)
            } else {
                self.marks.marks_where(segment, |off| off >= len)
            };
            for mark in stray {
                let to = self.canonical(self.marks.pos(mark));
                self.marks.relocate(mark, to);
            }
        }
    }

    /// Open a new segment at `at`, keeping the mark buckets in step.
    /// Capacity must already be reserved in both vectors.
    fn insert_segment(&mut self, at: usize, segment: Segment) {
        self.segments.insert(at, segment);
        self.marks.insert_segment(at);
    }

    fn reserve_segments(&mut self, additional: usize) -> Result<()> {
        self.segments.try_reserve(additional)?;
        self.marks.reserve_segments(additional)
    }

    /// Panic if any internal invariant is broken
    ///
    /// Runs after every mutation in debug builds.
    pub fn check_invariants(&self) {
        assert!(!self.layers.is_empty(), "buffer has no layers");
        assert!(!self.segments.is_empty(), "buffer has no segments");
        assert_eq!(
            self.marks.segment_count(),
            self.segments.len(),
            "mark buckets out of step with segments"
        );

        let total: usize = self.segments.iter().map(|s| s.len).sum();
        assert_eq!(total, self.filled, "segment lengths do not sum to filled size");

        for (i, seg) in self.segments.iter().enumerate() {
            let layer = self
                .layers
                .get(seg.layer.0)
                .unwrap_or_else(|| panic!("segment {} references missing layer", i));
            assert!(
                seg.end() <= layer.len(),
                "segment {} overruns layer {:?}",
                i,
                seg.layer
            );
        }

        let last = self.last_segment();
        for segment in 0..self.segments.len() {
            for &mark in self.marks.bucket(segment) {
                let pos = self.marks.pos(mark);
                assert_eq!(pos.segment, segment, "mark {} filed under wrong segment", mark.0);
                let len = self.segments[segment].len;
                assert!(
                    pos.offset < len || (segment == last && pos.offset == len),
                    "mark {} at {:?} outside segment of length {}",
                    mark.0,
                    pos,
                    len
                );
            }
        }

        self.marks.check_slots();
    }

    #[inline]
    fn debug_check(&self) {
        #[cfg(debug_assertions)]
        self.check_invariants();
    }
}
