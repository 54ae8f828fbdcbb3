//! Compaction of the segment chain
//!
//! Flattens every live byte into one fresh layer covered by one segment,
//! dropping garbage and empty segments. Marks are rebuilt from their
//! logical offsets, so no mark moves.

use super::layer::{Layer, LayerId};
use super::segment::Segment;
use super::Buffer;
use crate::error::Result;

impl Buffer {
    /// Whether fragmentation has outgrown the content
    ///
    /// True when there is more than one layer or segment and the average
    /// live bytes per piece is at or below `unify_density`.
    pub fn needs_unify(&self) -> bool {
        let pieces = self.layers.len().max(self.segments.len());
        pieces > 1 && self.filled / pieces <= self.config.unify_density
    }

    pub(crate) fn maybe_unify(&mut self) -> Result<()> {
        if self.config.auto_unify && self.needs_unify() {
            self.unify()?;
        }
        Ok(())
    }

    /// Flatten the buffer to a single layer and segment
    ///
    /// Callers about to walk the whole buffer can run this up front. Does
    /// nothing when the buffer is already flat. On allocation failure the
    /// buffer is left untouched.
    pub fn unify(&mut self) -> Result<()> {
        if self.is_flat() {
            return Ok(());
        }

        let before = (self.layers.len(), self.segments.len());

        let mut flat = Vec::new();
        flat.try_reserve_exact(self.filled)?;
        for seg in &self.segments {
            flat.extend_from_slice(self.layers[seg.layer.0].slice(seg.range()));
        }
        assert_eq!(flat.len(), self.filled, "segment lengths do not sum to filled size");

        let mut merged = Vec::new();
        merged.try_reserve_exact(self.marks.live())?;

        self.marks
            .flatten(self.segments.iter().map(|s| s.len), merged);
        self.segments.clear();
        self.segments.push(Segment::new(LayerId(0), 0, self.filled));
        self.layers.clear();
        self.layers.push(Layer::from_vec(flat));

        tracing::debug!(
            layers_before = before.0,
            segments_before = before.1,
            filled = self.filled,
            "unified buffer"
        );
        self.debug_check();
        Ok(())
    }

    fn is_flat(&self) -> bool {
        self.layers.len() == 1
            && self.segments.len() == 1
            && self.segments[0].offset == 0
            && self.segments[0].len == self.layers[0].len()
    }
}
