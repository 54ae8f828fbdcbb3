//! Position queries, mark movement and byte scanning

use super::mark::{Mark, MarkPos};
use super::Buffer;
use crate::error::Result;

/// Which way [`Buffer::scan`] walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Buffer {
    /// Byte at the mark, or `None` when the mark is at the end of the buffer
    pub fn byte_at(&self, mark: Mark) -> Option<u8> {
        let pos = self.marks.pos(mark);
        let seg = self.segments[pos.segment];
        if pos.offset < seg.len {
            Some(self.layers[seg.layer.0].byte(seg.offset + pos.offset))
        } else {
            None
        }
    }

    /// Logical byte offset of the mark from the start of the buffer
    pub fn offset_of(&self, mark: Mark) -> usize {
        let pos = self.marks.pos(mark);
        let before: usize = self.segments[..pos.segment].iter().map(|s| s.len).sum();
        before + pos.offset
    }

    /// Move the mark by `delta` bytes, clamping at either end of the buffer
    pub fn move_mark(&mut self, mark: Mark, delta: isize) -> Result<()> {
        let to = self.step(self.marks.pos(mark), delta);
        self.marks.try_relocate(mark, to)
    }

    pub(crate) fn step(&self, pos: MarkPos, delta: isize) -> MarkPos {
        let last = self.last_segment();
        let (mut segment, mut offset) = (pos.segment, pos.offset);

        if delta >= 0 {
            let mut remaining = delta.unsigned_abs();
            loop {
                let len = self.segments[segment].len;
                let room = len - offset;
                if remaining < room || segment == last {
                    offset = (offset + remaining).min(len);
                    break;
                }
                remaining -= room;
                segment += 1;
                offset = 0;
            }
        } else {
            let mut remaining = delta.unsigned_abs();
            loop {
                if remaining <= offset {
                    offset -= remaining;
                    break;
                }
                remaining -= offset;
                if segment == 0 {
                    offset = 0;
                    break;
                }
                segment -= 1;
                offset = self.segments[segment].len;
            }
        }

        self.canonical(MarkPos::new(segment, offset))
    }

    /// Move the mark to the next (or previous) occurrence of `target`
    ///
    /// The byte under the mark is never a match: forward scans start at the
    /// following byte and backward scans at the preceding one, so repeated
    /// calls step from match to match. Returns `false` and leaves the mark
    /// where it was if a boundary is reached first.
    pub fn scan(&mut self, mark: Mark, target: u8, direction: Direction) -> Result<bool> {
        let start = self.marks.pos(mark);
        let found = match direction {
            Direction::Forward => self.find_forward(start, target),
            Direction::Backward => self.find_backward(start, target),
        };

        match found {
            Some(pos) => {
                self.marks.try_relocate(mark, pos)?;
                tracing::trace!(mark = mark.0, ?direction, offset = self.offset_of(mark), "scan hit");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_forward(&self, start: MarkPos, target: u8) -> Option<MarkPos> {
        let mut segment = start.segment;
        let mut from = start.offset + 1;
        loop {
            let seg = self.segments[segment];
            if from < seg.len {
                let bytes = self.layers[seg.layer.0].slice(seg.offset + from..seg.end());
                if let Some(i) = bytes.iter().position(|&b| b == target) {
                    return Some(MarkPos::new(segment, from + i));
                }
            }
            if segment == self.last_segment() {
                return None;
            }
            segment += 1;
            from = 0;
        }
    }

    fn find_backward(&self, start: MarkPos, target: u8) -> Option<MarkPos> {
        let mut segment = start.segment;
        let mut upto = start.offset;
        loop {
            let seg = self.segments[segment];
            let bytes = self.layers[seg.layer.0].slice(seg.offset..seg.offset + upto);
            if let Some(i) = bytes.iter().rposition(|&b| b == target) {
                return Some(MarkPos::new(segment, i));
            }
            if segment == 0 {
                return None;
            }
            segment -= 1;
            upto = self.segments[segment].len;
        }
    }
}
