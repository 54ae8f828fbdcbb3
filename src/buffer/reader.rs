//! Forward-only byte reader that drives a mark

use std::io;

use super::mark::Mark;
use super::Buffer;
use crate::error::Result;

/// Reads bytes at a mark and advances the mark past them
///
/// Holds no state besides the mark, which keeps its final position after
/// the reader is dropped. Reading again from an earlier point means
/// recreating the mark there.
#[derive(Debug)]
pub struct MarkReader<'a> {
    buffer: &'a mut Buffer,
    mark: Mark,
}

impl Buffer {
    /// Reader starting at `mark`'s current position
    pub fn reader(&mut self, mark: Mark) -> MarkReader<'_> {
        MarkReader { buffer: self, mark }
    }
}

impl MarkReader<'_> {
    pub fn mark(&self) -> Mark {
        self.mark
    }
}

impl Iterator for MarkReader<'_> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let byte = self.buffer.byte_at(self.mark)?;
        Some(self.buffer.move_mark(self.mark, 1).map(|()| byte))
    }
}

impl io::Read for MarkReader<'_> {
    /// Copies from the mark's segment directly, at most to its end
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let pos = self.buffer.marks.pos(self.mark);
        let seg = self.buffer.segments[pos.segment];
        let n = out.len().min(seg.len - pos.offset);
        if n == 0 {
            return Ok(0);
        }
        let start = seg.offset + pos.offset;
        out[..n].copy_from_slice(self.buffer.layers[seg.layer.0].slice(start..start + n));
        self.buffer.move_mark(self.mark, n as isize)?;
        Ok(n)
    }
}
