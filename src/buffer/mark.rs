//! Mark handles and the slot table that keeps them positioned
//!
//! Slots are either occupied by a position or hold the next link of the
//! free chain, so freeing and allocating a mark are both O(1). Each segment
//! also has a bucket listing the marks that currently sit inside it, which
//! lets edits find and relocate the affected marks without a full scan.

use crate::error::Result;

/// Stable handle to a logical position in a [`crate::Buffer`]
///
/// A handle stays valid until it is passed to [`crate::Buffer::destroy`].
/// Using it afterwards panics (or silently aliases a recycled mark).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mark(pub(crate) usize);

impl Mark {
    /// Raw slot index, mostly useful for logging
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a new or recreated mark is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Logical start of the buffer
    Start,
    /// Logical end of the buffer (after the last byte)
    End,
    /// Current position of another mark
    Mark(Mark),
    /// Logical byte offset, clamped to the end of the buffer
    Offset(usize),
}

/// Internal `(segment, offset)` position of a mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MarkPos {
    pub segment: usize,
    pub offset: usize,
}

impl MarkPos {
    pub fn new(segment: usize, offset: usize) -> Self {
        Self { segment, offset }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Occupied(MarkPos),
    Free { next: Option<usize> },
}

#[derive(Debug, Clone)]
pub(crate) struct MarkTable {
    slots: Vec<Slot>,
    free_head: Option<usize>,
    /// One bucket per segment, kept parallel to the segment chain
    buckets: Vec<Vec<Mark>>,
    live: usize,
}

impl MarkTable {
    pub fn new(segments: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            buckets: vec![Vec::new(); segments],
            live: 0,
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn pos(&self, mark: Mark) -> MarkPos {
        match self.slots.get(mark.0) {
            Some(Slot::Occupied(pos)) => *pos,
            _ => panic!("mark {} used after destroy", mark.0),
        }
    }

    fn pos_mut(&mut self, mark: Mark) -> &mut MarkPos {
        match self.slots.get_mut(mark.0) {
            Some(Slot::Occupied(pos)) => pos,
            _ => panic!("mark {} used after destroy", mark.0),
        }
    }

    pub fn bucket(&self, segment: usize) -> &[Mark] {
        &self.buckets[segment]
    }

    /// Marks in `segment` whose offset satisfies `pred`
    pub fn marks_where(&self, segment: usize, pred: impl Fn(usize) -> bool) -> Vec<Mark> {
        self.buckets[segment]
            .iter()
            .copied()
            .filter(|&m| pred(self.pos(m).offset))
            .collect()
    }

    pub fn alloc(&mut self, pos: MarkPos) -> Result<Mark> {
        self.buckets[pos.segment].try_reserve(1)?;
        let mark = match self.free_head {
            Some(index) => {
                let Slot::Free { next } = self.slots[index] else {
                    panic!("free chain points at occupied slot {}", index);
                };
                self.free_head = next;
                self.slots[index] = Slot::Occupied(pos);
                Mark(index)
            }
            None => {
                self.slots.try_reserve(1)?;
                self.slots.push(Slot::Occupied(pos));
                Mark(self.slots.len() - 1)
            }
        };
        self.buckets[pos.segment].push(mark);
        self.live += 1;
        Ok(mark)
    }

    pub fn release(&mut self, mark: Mark) {
        let pos = self.pos(mark);
        self.unlink(mark, pos.segment);
        self.slots[mark.0] = Slot::Free {
            next: self.free_head,
        };
        self.free_head = Some(mark.0);
        self.live -= 1;
    }

    fn unlink(&mut self, mark: Mark, segment: usize) {
        let bucket = &mut self.buckets[segment];
        let i = bucket
            .iter()
            .position(|&m| m == mark)
            .unwrap_or_else(|| panic!("mark {} missing from segment {}", mark.0, segment));
        bucket.swap_remove(i);
    }

    /// Move a mark, growing the target bucket first so failure changes nothing
    pub fn try_relocate(&mut self, mark: Mark, to: MarkPos) -> Result<()> {
        let from = self.pos(mark);
        if from.segment != to.segment {
            self.buckets[to.segment].try_reserve(1)?;
        }
        self.relocate(mark, to);
        Ok(())
    }

    pub fn relocate(&mut self, mark: Mark, to: MarkPos) {
        let from = self.pos(mark);
        if from.segment != to.segment {
            self.unlink(mark, from.segment);
            self.buckets[to.segment].push(mark);
        }
        *self.pos_mut(mark) = to;
    }

    pub fn set_offset(&mut self, mark: Mark, offset: usize) {
        self.pos_mut(mark).offset = offset;
    }

    pub fn reserve_in(&mut self, segment: usize, additional: usize) -> Result<()> {
        self.buckets[segment].try_reserve(additional)?;
        Ok(())
    }

    pub fn reserve_segments(&mut self, additional: usize) -> Result<()> {
        self.buckets.try_reserve(additional)?;
        Ok(())
    }

    /// Open an empty bucket at `at`, renumbering the marks of every later segment
    pub fn insert_segment(&mut self, at: usize) {
        self.buckets.insert(at, Vec::new());
        for segment in at + 1..self.buckets.len() {
            for i in 0..self.buckets[segment].len() {
                let mark = self.buckets[segment][i];
                self.pos_mut(mark).segment = segment;
            }
        }
    }

    /// Collapse every bucket into a single one for a flattened chain,
    /// converting offsets to logical ones. `merged` must have room for
    /// every live mark.
    pub fn flatten(&mut self, lengths: impl Iterator<Item = usize>, mut merged: Vec<Mark>) {
        let mut base = 0;
        for (segment, len) in lengths.enumerate() {
            for i in 0..self.buckets[segment].len() {
                let mark = self.buckets[segment][i];
                let pos = self.pos_mut(mark);
                *pos = MarkPos::new(0, base + pos.offset);
                merged.push(mark);
            }
            base += len;
        }
        self.buckets.clear();
        self.buckets.push(merged);
    }

    #[cfg(test)]
    pub fn bucket_capacity(&self, segment: usize) -> usize {
        self.buckets[segment].capacity()
    }

    pub fn segment_count(&self) -> usize {
        self.buckets.len()
    }

    /// Panics unless every free-chain link lands on a free slot and
    /// the occupied count matches the live counter
    pub fn check_slots(&self) {
        let occupied = self
            .slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(_)))
            .count();
        assert_eq!(occupied, self.live, "live mark count drifted");

        let mut free = 0;
        let mut link = self.free_head;
        while let Some(index) = link {
            let Slot::Free { next } = self.slots[index] else {
                panic!("free chain points at occupied slot {}", index);
            };
            free += 1;
            assert!(free <= self.slots.len(), "free chain has a cycle");
            link = next;
        }
        assert_eq!(free + occupied, self.slots.len(), "slot leaked from free chain");

        let bucketed: usize = self.buckets.iter().map(Vec::len).sum();
        assert_eq!(bucketed, self.live, "mark missing from segment buckets");
    }
}
