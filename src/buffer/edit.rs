//! Insertion and removal through marks
//!
//! Each edit picks between two strategies:
//!
//! - Direct mutation: splice the bytes into or out of the backing layer.
//!   Only allowed when the layer tail that has to shift is at most
//!   `direct_edit_limit` bytes.
//! - Restructuring: put inserted bytes in a new layer, or leave removed
//!   bytes behind as garbage, and adjust or split segments instead.
//!
//! Removal never merges segments. Zero-length segments and orphaned bytes
//! are left for [`Buffer::unify`] to clean up.

use super::layer::{Layer, LayerId};
use super::mark::{Mark, MarkPos};
use super::segment::Segment;
use super::Buffer;
use crate::error::Result;

impl Buffer {
    /// Insert `bytes` immediately before the mark
    ///
    /// Every mark at the insertion point, including `mark`, ends up after
    /// the inserted bytes.
    pub fn insert(&mut self, mark: Mark, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let pos = self.marks.pos(mark);
        if let Some((segment, offset)) = self.direct_insert_target(pos) {
            self.insert_direct(segment, offset, bytes)?;
        } else {
            self.maybe_unify()?;
            // Compaction may have made the edit cheap
            let pos = self.marks.pos(mark);
            match self.direct_insert_target(pos) {
                Some((segment, offset)) => self.insert_direct(segment, offset, bytes)?,
                None => self.insert_layer(pos, bytes)?,
            }
        }

        self.filled += bytes.len();
        self.debug_check();
        Ok(())
    }

    /// Remove the bytes between two marks, given in either order
    ///
    /// Marks inside the range collapse onto its start. The compaction that
    /// may follow is best effort: if it cannot allocate, the removal still
    /// succeeds and the chain stays fragmented.
    pub fn remove(&mut self, from: Mark, to: Mark) -> Result<()> {
        let (a, b) = (self.marks.pos(from), self.marks.pos(to));
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        if start == end {
            return Ok(());
        }

        // A split of the final segment needs one more slot
        self.reserve_segments(1)?;

        if start.segment == end.segment {
            self.cut(start.segment, start.offset, end.offset);
        } else {
            let parked = self
                .marks
                .marks_where(start.segment, |off| off >= start.offset)
                .len()
                + (start.segment + 1..end.segment)
                    .map(|segment| self.marks.bucket(segment).len())
                    .sum::<usize>();
            self.marks.reserve_in(end.segment, parked)?;
            self.drop_through(start, end);
            self.cut(end.segment, 0, end.offset);
        }

        let last = self.last_segment();
        self.settle(start.segment..last + 1);
        self.debug_check();

        // Already committed, so compaction is best effort
        if let Err(e) = self.maybe_unify() {
            tracing::warn!("Skipped compaction after removal: {}", e);
        }
        Ok(())
    }

    /// Layer position where an insertion at `pos` could be spliced in place
    ///
    /// At a segment boundary the end of the previous segment is tried
    /// first, since its layer tail is usually short.
    fn direct_insert_target(&self, pos: MarkPos) -> Option<(usize, usize)> {
        if pos.offset == 0 && pos.segment > 0 {
            let prev = pos.segment - 1;
            let len = self.segments[prev].len;
            if len > 0 && self.is_cheap(prev, len) {
                return Some((prev, len));
            }
        }
        self.is_cheap(pos.segment, pos.offset)
            .then_some((pos.segment, pos.offset))
    }

    /// Whether shifting the layer tail after `offset` in `segment` is cheap
    ///
    /// An empty segment only qualifies when it sits at the very end of its
    /// layer, where nothing live can follow it.
    fn is_cheap(&self, segment: usize, offset: usize) -> bool {
        let seg = self.segments[segment];
        let layer_len = self.layers[seg.layer.0].len();
        if seg.is_empty() {
            return seg.offset == layer_len;
        }
        layer_len - (seg.offset + offset) <= self.config.direct_edit_limit
    }

    fn insert_direct(&mut self, segment: usize, offset: usize, bytes: &[u8]) -> Result<()> {
        let seg = self.segments[segment];
        let at = seg.offset + offset;
        let n = bytes.len();
        self.layers[seg.layer.0].splice_in(at, bytes)?;

        for (i, other) in self.segments.iter_mut().enumerate() {
            if i != segment && other.layer == seg.layer && other.offset >= at {
                other.offset += n;
            }
        }
        self.segments[segment].len += n;

        for mark in self.marks.marks_where(segment, |off| off >= offset) {
            let pos = self.marks.pos(mark);
            self.marks.set_offset(mark, pos.offset + n);
        }

        tracing::trace!(segment, offset, len = n, "direct insert");
        Ok(())
    }

    fn insert_layer(&mut self, pos: MarkPos, bytes: &[u8]) -> Result<()> {
        let layer = Layer::copy_of(bytes)?;
        self.layers.try_reserve(1)?;
        self.reserve_segments(2)?;

        let id = LayerId(self.layers.len());
        self.layers.push(layer);
        let n = bytes.len();
        let inserted = Segment::new(id, 0, n);

        let target = pos.segment;
        let seg = self.segments[target];
        if pos.offset == 0 {
            // Marks at the old head are renumbered past the new segment
            self.insert_segment(target, inserted);
        } else if pos.offset == seg.len {
            self.insert_segment(target + 1, inserted);
            for mark in self.marks.marks_where(target, |off| off == seg.len) {
                self.marks.relocate(mark, MarkPos::new(target + 1, n));
            }
        } else {
            let tail = Segment::new(seg.layer, seg.offset + pos.offset, seg.len - pos.offset);
            self.segments[target].len = pos.offset;
            self.insert_segment(target + 1, inserted);
            self.insert_segment(target + 2, tail);
            for mark in self.marks.marks_where(target, |off| off >= pos.offset) {
                let off = self.marks.pos(mark).offset;
                self.marks
                    .relocate(mark, MarkPos::new(target + 2, off - pos.offset));
            }
        }

        tracing::debug!(
            layer = id.0,
            len = n,
            segments = self.segments.len(),
            "inserted new layer"
        );
        Ok(())
    }

    /// Shrink the first segment of a multi-segment removal and empty the
    /// middle ones, parking their marks at the removal's end
    fn drop_through(&mut self, start: MarkPos, end: MarkPos) {
        let first = self.segments[start.segment];
        let dropped = first.len - start.offset;
        let layer = &mut self.layers[first.layer.0];
        if first.end() == layer.len() {
            let keep = first.offset + start.offset;
            layer.truncate(keep);
            for other in self.segments.iter_mut() {
                if other.layer == first.layer && other.offset > keep {
                    other.offset = keep;
                }
            }
        }
        self.segments[start.segment].len = start.offset;
        self.filled -= dropped;

        for segment in start.segment + 1..end.segment {
            self.filled -= self.segments[segment].len;
            self.segments[segment].len = 0;
        }

        let parked = MarkPos::new(end.segment, 0);
        for mark in self.marks.marks_where(start.segment, |off| off >= start.offset) {
            self.marks.relocate(mark, parked);
        }
        for segment in start.segment + 1..end.segment {
            for mark in self.marks.bucket(segment).to_vec() {
                self.marks.relocate(mark, parked);
            }
        }
    }

    /// Remove `[from, to)` of one segment
    fn cut(&mut self, segment: usize, from: usize, to: usize) {
        if from == to {
            return;
        }
        let seg = self.segments[segment];
        let n = to - from;

        if self.is_cheap(segment, to) {
            let (lo, hi) = (seg.offset + from, seg.offset + to);
            self.layers[seg.layer.0].cut(lo..hi);
            for (i, other) in self.segments.iter_mut().enumerate() {
                if i == segment || other.layer != seg.layer {
                    continue;
                }
                if other.offset >= hi {
                    other.offset -= n;
                } else if other.offset > lo {
                    other.offset = lo;
                }
            }
            self.segments[segment].len -= n;
            self.shift_marks_back(segment, from, to);
            tracing::trace!(segment, from, to, "direct remove");
        } else if from == 0 {
            self.segments[segment].offset += n;
            self.segments[segment].len -= n;
            self.shift_marks_back(segment, from, to);
        } else if to == seg.len {
            self.segments[segment].len = from;
            for mark in self.marks.marks_where(segment, |off| off > from) {
                self.marks.set_offset(mark, from);
            }
        } else {
            let tail = Segment::new(seg.layer, seg.offset + to, seg.len - to);
            self.segments[segment].len = from;
            self.insert_segment(segment + 1, tail);
            for mark in self.marks.marks_where(segment, |off| off >= from) {
                let off = self.marks.pos(mark).offset;
                self.marks
                    .relocate(mark, MarkPos::new(segment + 1, off.max(to) - to));
            }
            tracing::debug!(segment, from, to, "split segment for removal");
        }

        self.filled -= n;
    }

    /// Offsets in `[from, to]` collapse to `from`, later ones move back
    fn shift_marks_back(&mut self, segment: usize, from: usize, to: usize) {
        for mark in self.marks.marks_where(segment, |off| off > from) {
            let off = self.marks.pos(mark).offset;
            let new = if off <= to { from } else { off - (to - from) };
            self.marks.set_offset(mark, new);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Anchor;
    use crate::config::BufferConfig;

    /// Config that never edits in place and never compacts
    fn restructuring_only() -> BufferConfig {
        BufferConfig {
            direct_edit_limit: 0,
            unify_density: 0,
            auto_unify: false,
        }
    }

    #[test]
    fn test_insert_into_empty_buffer() {
        let mut buffer = Buffer::new();
        let mark = buffer.create(Anchor::Start).unwrap();
        buffer.insert(mark, b"hello").unwrap();

        assert_eq!(buffer.to_vec(), b"hello");
        assert_eq!(buffer.offset_of(mark), 5);
        assert_eq!(buffer.stats().layers, 1);
    }

    #[test]
    fn test_empty_insert_is_noop() {
        let mut buffer = Buffer::from_bytes(b"abc".to_vec());
        let mark = buffer.create(Anchor::Offset(1)).unwrap();
        buffer.insert(mark, b"").unwrap();
        assert_eq!(buffer.to_vec(), b"abc");
        assert_eq!(buffer.offset_of(mark), 1);
    }

    #[test]
    fn test_insert_moves_marks_at_point_but_not_before() {
        let mut buffer = Buffer::from_bytes(b"abcdef".to_vec());
        let before = buffer.create(Anchor::Offset(2)).unwrap();
        let at = buffer.create(Anchor::Offset(3)).unwrap();
        let other_at = buffer.create(Anchor::Offset(3)).unwrap();
        let after = buffer.create(Anchor::Offset(5)).unwrap();

        buffer.insert(at, b"XYZ").unwrap();

        assert_eq!(buffer.to_vec(), b"abcXYZdef");
        assert_eq!(buffer.offset_of(before), 2);
        assert_eq!(buffer.offset_of(at), 6);
        assert_eq!(buffer.offset_of(other_at), 6);
        assert_eq!(buffer.offset_of(after), 8);
    }

    #[test]
    fn test_interior_insert_splits_segment() {
        let mut buffer = Buffer::with_config(b"abcdef".to_vec(), restructuring_only());
        let start = buffer.create(Anchor::Start).unwrap();
        let mark = buffer.create(Anchor::Offset(3)).unwrap();
        let end = buffer.create(Anchor::End).unwrap();

        buffer.insert(mark, b"XY").unwrap();

        let stats = buffer.stats();
        assert_eq!(stats.layers, 2);
        assert_eq!(stats.segments, 3);
        assert_eq!(buffer.to_vec(), b"abcXYdef");
        assert_eq!(buffer.offset_of(start), 0);
        assert_eq!(buffer.offset_of(mark), 5);
        assert_eq!(buffer.byte_at(mark), Some(b'd'));
        assert_eq!(buffer.offset_of(end), 8);
    }

    #[test]
    fn test_append_at_layer_tail_is_always_direct() {
        let mut buffer = Buffer::with_config(b"abc".to_vec(), restructuring_only());
        let end = buffer.create(Anchor::End).unwrap();
        let other = buffer.create(Anchor::End).unwrap();

        buffer.insert(end, b"de").unwrap();

        assert_eq!(buffer.to_vec(), b"abcde");
        assert_eq!(buffer.stats().layers, 1);
        assert_eq!(buffer.stats().segments, 1);
        assert_eq!(buffer.offset_of(end), 5);
        assert_eq!(buffer.offset_of(other), 5);
    }

    #[test]
    fn test_insert_at_start_prepends_segment() {
        let mut buffer = Buffer::with_config(b"abc".to_vec(), restructuring_only());
        let start = buffer.create(Anchor::Start).unwrap();

        buffer.insert(start, b"__").unwrap();

        assert_eq!(buffer.to_vec(), b"__abc");
        assert_eq!(buffer.stats().segments, 2);
        assert_eq!(buffer.byte_at(start), Some(b'a'));
    }

    #[test]
    fn test_direct_insert_keeps_neighbour_segments_intact() {
        // Split "abcdef" around a new layer, then grow the head in place:
        // the tail segment shares the layer and must shift with it.
        let mut buffer = Buffer::with_config(b"abcdef".to_vec(), restructuring_only());
        let mark = buffer.create(Anchor::Offset(3)).unwrap();
        buffer.insert(mark, b"XY").unwrap();

        buffer.set_config(BufferConfig {
            auto_unify: false,
            ..BufferConfig::default()
        });
        let head = buffer.create(Anchor::Offset(1)).unwrap();
        buffer.insert(head, b"123").unwrap();

        assert_eq!(buffer.to_vec(), b"a123bcXYdef");
        assert_eq!(buffer.byte_at(mark), Some(b'd'));
        assert_eq!(buffer.stats().layers, 2);
    }

    #[test]
    fn test_remove_within_segment() {
        let mut buffer = Buffer::from_bytes(b"hello world".to_vec());
        let a = buffer.create(Anchor::Offset(5)).unwrap();
        let b = buffer.create(Anchor::End).unwrap();
        let inside = buffer.create(Anchor::Offset(8)).unwrap();

        buffer.remove(a, b).unwrap();

        assert_eq!(buffer.to_vec(), b"hello");
        assert_eq!(buffer.offset_of(a), 5);
        assert_eq!(buffer.offset_of(b), 5);
        assert_eq!(buffer.offset_of(inside), 5);
    }

    #[test]
    fn test_remove_accepts_reversed_marks() {
        let mut buffer = Buffer::from_bytes(b"abcdef".to_vec());
        let a = buffer.create(Anchor::Offset(4)).unwrap();
        let b = buffer.create(Anchor::Offset(1)).unwrap();

        buffer.remove(a, b).unwrap();

        assert_eq!(buffer.to_vec(), b"aef");
    }

    #[test]
    fn test_remove_empty_range_is_noop() {
        let mut buffer = Buffer::from_bytes(b"abc".to_vec());
        let a = buffer.create(Anchor::Offset(1)).unwrap();
        buffer.remove(a, a).unwrap();
        assert_eq!(buffer.to_vec(), b"abc");
    }

    #[test]
    fn test_remove_interior_splits_without_direct_mutation() {
        let mut buffer = Buffer::with_config(b"abcdefgh".to_vec(), restructuring_only());
        let a = buffer.create(Anchor::Offset(2)).unwrap();
        let b = buffer.create(Anchor::Offset(5)).unwrap();
        let tail = buffer.create(Anchor::Offset(6)).unwrap();

        buffer.remove(a, b).unwrap();

        assert_eq!(buffer.to_vec(), b"abfgh");
        assert_eq!(buffer.stats().segments, 2);
        assert_eq!(buffer.stats().garbage, 3);
        assert_eq!(buffer.byte_at(a), Some(b'f'));
        assert_eq!(buffer.byte_at(tail), Some(b'g'));
    }

    #[test]
    fn test_remove_across_segments() {
        let mut buffer = Buffer::with_config(b"abcdef".to_vec(), restructuring_only());
        let mid = buffer.create(Anchor::Offset(3)).unwrap();
        buffer.insert(mid, b"XYZ").unwrap();
        assert_eq!(buffer.to_vec(), b"abcXYZdef");

        let a = buffer.create(Anchor::Offset(1)).unwrap();
        let b = buffer.create(Anchor::Offset(8)).unwrap();
        buffer.remove(a, b).unwrap();

        assert_eq!(buffer.to_vec(), b"af");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.offset_of(mid), 1);
        assert_eq!(buffer.byte_at(mid), Some(b'f'));
        assert_eq!(buffer.byte_at(a), Some(b'f'));
    }

    #[test]
    fn test_remove_everything() {
        let mut buffer = Buffer::with_config(b"abc".to_vec(), restructuring_only());
        let end = buffer.create(Anchor::End).unwrap();
        buffer.insert(end, b"def").unwrap();
        let start = buffer.create(Anchor::Start).unwrap();

        buffer.remove(start, end).unwrap();

        assert!(buffer.is_empty());
        assert_eq!(buffer.byte_at(start), None);
        assert_eq!(buffer.offset_of(end), 0);
    }

    #[test]
    fn test_multi_segment_remove_reserves_only_parked_marks() {
        let mut buffer = Buffer::with_config(b"abcdef".to_vec(), restructuring_only());
        let mid = buffer.create(Anchor::Offset(3)).unwrap();
        buffer.insert(mid, b"XYZ").unwrap();
        buffer.destroy(mid);
        let bystanders: Vec<_> = (0..1_000)
            .map(|_| buffer.create(Anchor::Start).unwrap())
            .collect();
        let a = buffer.create(Anchor::Offset(1)).unwrap();
        let b = buffer.create(Anchor::Offset(7)).unwrap();

        buffer.remove(a, b).unwrap();

        assert_eq!(buffer.to_vec(), b"aef");
        assert_eq!(buffer.marks.pos(a), buffer.marks.pos(b));
        assert!(buffer.marks.bucket_capacity(2) < 64);
        assert!(bystanders.iter().all(|&m| buffer.offset_of(m) == 0));
    }
}
