//! Randomized edit workloads checked against a plain `Vec<u8>` model
//!
//! Used by the `layerbuf` replay tool, the stress tests and the benchmarks.
//! Every operation goes through marks exactly as an editor view would, and
//! a set of long-lived marks is tracked alongside the model to check that
//! they keep pointing at the same logical position.

use crate::buffer::{Anchor, Buffer, Direction, Mark};
use crate::config::BufferConfig;
use crate::error::BufferError;

/// Small deterministic PRNG (xorshift64*), good enough for workloads
#[derive(Debug, Clone)]
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift
        Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-ish value in `0..=max`
    pub fn upto(&mut self, max: usize) -> usize {
        (self.next_u64() % (max as u64 + 1)) as usize
    }

    pub fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

/// One step of a workload, addressed by logical offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Insert { at: usize, bytes: Vec<u8> },
    Remove { from: usize, to: usize },
    Scan { from: usize, target: u8, direction: Direction },
    /// Move one of the replayer's long-lived marks (taken modulo their count)
    Move { mark: usize, delta: isize },
    Unify,
}

impl Op {
    /// Pick a random operation for a buffer of `len` bytes
    ///
    /// Inserts are biased towards the neighbourhood of `hint` so runs of
    /// typing-like edits occur next to scattered ones.
    pub fn random(rng: &mut Rng, len: usize, hint: usize, max_insert: usize) -> Self {
        let near = |rng: &mut Rng| {
            if rng.chance(60) {
                let lo = hint.saturating_sub(64);
                (lo + rng.upto(128)).min(len)
            } else {
                rng.upto(len)
            }
        };

        match rng.upto(99) {
            0..=54 => {
                let n = 1 + rng.upto(max_insert.saturating_sub(1));
                let bytes = (0..n).map(|_| b"abc;\n "[rng.upto(5)]).collect();
                Op::Insert {
                    at: near(rng),
                    bytes,
                }
            }
            55..=84 => {
                let from = near(rng);
                let to = (from + rng.upto(max_insert * 2)).min(len);
                Op::Remove { from, to }
            }
            85..=92 => {
                let reach = (max_insert * 4).max(1);
                Op::Move {
                    mark: rng.next_u64() as usize,
                    delta: rng.upto(reach * 2) as isize - reach as isize,
                }
            }
            93..=98 => Op::Scan {
                from: rng.upto(len),
                target: if rng.chance(50) { b';' } else { b'\n' },
                direction: if rng.chance(50) {
                    Direction::Forward
                } else {
                    Direction::Backward
                },
            },
            _ => Op::Unify,
        }
    }
}

/// Errors reported while replaying a workload
#[derive(Debug, Clone)]
pub enum ReplayError {
    /// The buffer refused an operation
    Buffer(BufferError),
    /// Buffer and model disagree
    Diverged { step: usize, detail: String },
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayError::Buffer(e) => write!(f, "Buffer error: {}", e),
            ReplayError::Diverged { step, detail } => {
                write!(f, "Diverged at step {}: {}", step, detail)
            }
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<BufferError> for ReplayError {
    fn from(e: BufferError) -> Self {
        ReplayError::Buffer(e)
    }
}

/// Applies operations to a buffer and a reference model in lockstep
#[derive(Debug)]
pub struct Replayer {
    buffer: Buffer,
    model: Vec<u8>,
    /// Long-lived marks and the logical offset each should have
    tracked: Vec<(Mark, usize)>,
    steps: usize,
}

impl Replayer {
    /// Start from `content`, with `tracked` marks spread evenly through it
    pub fn new(
        content: Vec<u8>,
        config: BufferConfig,
        tracked: usize,
    ) -> Result<Self, ReplayError> {
        let model = content.clone();
        let mut buffer = Buffer::with_config(content, config);
        let mut marks = Vec::with_capacity(tracked);
        for i in 0..tracked {
            let offset = model.len() * i / tracked.max(1);
            marks.push((buffer.create(Anchor::Offset(offset))?, offset));
        }
        Ok(Self {
            buffer,
            model,
            tracked: marks,
            steps: 0,
        })
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn model(&self) -> &[u8] {
        &self.model
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn apply(&mut self, op: &Op) -> Result<(), ReplayError> {
        self.steps += 1;
        match op {
            Op::Insert { at, bytes } => {
                let at = (*at).min(self.model.len());
                let mark = self.buffer.create(Anchor::Offset(at))?;
                let result = self.buffer.insert(mark, bytes);
                self.buffer.destroy(mark);
                result?;

                self.model.splice(at..at, bytes.iter().copied());
                for (_, offset) in &mut self.tracked {
                    if *offset >= at {
                        *offset += bytes.len();
                    }
                }
            }
            Op::Remove { from, to } => {
                let len = self.model.len();
                let (from, to) = ((*from).min(len), (*to).min(len));
                let (lo, hi) = (from.min(to), from.max(to));
                let a = self.buffer.create(Anchor::Offset(from))?;
                let b = match self.buffer.create(Anchor::Offset(to)) {
                    Ok(b) => b,
                    Err(e) => {
                        self.buffer.destroy(a);
                        return Err(e.into());
                    }
                };
                let result = self.buffer.remove(a, b);
                self.buffer.destroy(a);
                self.buffer.destroy(b);
                result?;

                self.model.drain(lo..hi);
                for (_, offset) in &mut self.tracked {
                    if *offset > hi {
                        *offset -= hi - lo;
                    } else if *offset > lo {
                        *offset = lo;
                    }
                }
            }
            Op::Scan {
                from,
                target,
                direction,
            } => {
                let from = (*from).min(self.model.len());
                let expected = match direction {
                    Direction::Forward => self
                        .model
                        .get(from + 1..)
                        .and_then(|rest| rest.iter().position(|b| b == target))
                        .map(|i| from + 1 + i),
                    Direction::Backward => self.model[..from].iter().rposition(|b| b == target),
                };

                let mark = self.buffer.create(Anchor::Offset(from))?;
                let found = self.buffer.scan(mark, *target, *direction);
                let landed = self.buffer.offset_of(mark);
                self.buffer.destroy(mark);

                let actual = if found? { Some(landed) } else { None };
                if actual != expected {
                    return Err(self.diverged(format!(
                        "scan {:?} for {:?} from {} gave {:?}, expected {:?}",
                        direction, *target as char, from, actual, expected
                    )));
                }
                if actual.is_none() && landed != from {
                    return Err(self.diverged(format!(
                        "failed scan moved mark from {} to {}",
                        from, landed
                    )));
                }
            }
            Op::Move { mark, delta } => {
                if self.tracked.is_empty() {
                    return Ok(());
                }
                let len = self.model.len();
                let i = mark % self.tracked.len();
                let (mark, offset) = &mut self.tracked[i];
                self.buffer.move_mark(*mark, *delta)?;
                *offset = offset.saturating_add_signed(*delta).min(len);
            }
            Op::Unify => self.buffer.unify()?,
        }
        Ok(())
    }

    /// Compare buffer content and every tracked mark against the model
    pub fn verify(&mut self) -> Result<(), ReplayError> {
        self.buffer.check_invariants();

        if self.buffer.len() != self.model.len() {
            return Err(self.diverged(format!(
                "length {} != model length {}",
                self.buffer.len(),
                self.model.len()
            )));
        }

        let start = self.buffer.create(Anchor::Start)?;
        let read: Result<Vec<u8>, BufferError> = self.buffer.reader(start).collect();
        self.buffer.destroy(start);
        let read = read?;
        if read.len() != self.model.len() {
            return Err(self.diverged(format!(
                "reader produced {} bytes, expected {}",
                read.len(),
                self.model.len()
            )));
        }
        if let Some(i) = read.iter().zip(&self.model).position(|(a, b)| a != b) {
            return Err(self.diverged(format!("content differs at offset {}", i)));
        }

        for &(mark, offset) in &self.tracked {
            let actual = self.buffer.offset_of(mark);
            if actual != offset {
                return Err(self.diverged(format!(
                    "mark {} at {}, expected {}",
                    mark.index(),
                    actual,
                    offset
                )));
            }
        }
        Ok(())
    }

    fn diverged(&self, detail: String) -> ReplayError {
        ReplayError::Diverged {
            step: self.steps,
            detail,
        }
    }
}
