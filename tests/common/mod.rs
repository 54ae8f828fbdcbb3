//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use layerbuf::{Anchor, Buffer, BufferConfig, Mark};

/// Read the whole buffer through a throwaway mark, the way a renderer would
pub fn read_all(buffer: &mut Buffer) -> Vec<u8> {
    let mark = buffer.create(Anchor::Start).unwrap();
    let bytes = buffer
        .reader(mark)
        .collect::<Result<Vec<u8>, _>>()
        .unwrap();
    buffer.destroy(mark);
    bytes
}

/// Read the whole buffer as a string (test content is ASCII)
pub fn read_string(buffer: &mut Buffer) -> String {
    String::from_utf8(read_all(buffer)).unwrap()
}

/// `n` copies of `byte`
pub fn run(byte: u8, n: usize) -> Vec<u8> {
    vec![byte; n]
}

/// Never edits layers in place and never compacts on its own, so every
/// edit reshapes the segment chain
pub fn restructuring_only() -> BufferConfig {
    BufferConfig {
        direct_edit_limit: 0,
        unify_density: 0,
        auto_unify: false,
    }
}

/// Small thresholds so both edit strategies and compaction all trigger
/// on kilobyte-sized content
pub fn tight() -> BufferConfig {
    BufferConfig {
        direct_edit_limit: 16,
        unify_density: 64,
        auto_unify: true,
    }
}

/// Build a buffer whose pieces each land in their own layer by inserting
/// them at the start in reverse order
pub fn fragmented(pieces: &[&[u8]]) -> Buffer {
    let mut buffer = Buffer::with_config(Vec::new(), restructuring_only());
    let mark = buffer.create(Anchor::Start).unwrap();
    for piece in pieces.iter().rev() {
        buffer.recreate(mark, Anchor::Start).unwrap();
        buffer.insert(mark, piece).unwrap();
    }
    buffer.destroy(mark);
    buffer
}

/// Logical offsets of several marks at once
pub fn offsets(buffer: &Buffer, marks: &[Mark]) -> Vec<usize> {
    marks.iter().map(|&m| buffer.offset_of(m)).collect()
}
