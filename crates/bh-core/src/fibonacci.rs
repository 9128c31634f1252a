//! Process-wide Fibonacci sequence cache.
//!
//! The Fibonacci phase of the shift cipher indexes into the first
//! 100 000 terms. Terms are `i64` with wrapping addition — values past
//! the 92nd term overflow and wrap, and the wrapped values are part of
//! the pinned cipher behavior (the shift log records them verbatim).

use std::sync::LazyLock;

pub const SEQUENCE_DEPTH: usize = 100_000;

static SEQUENCE: LazyLock<Vec<i64>> = LazyLock::new(|| {
    let mut seq = Vec::with_capacity(SEQUENCE_DEPTH);
    seq.push(1i64);
    seq.push(1i64);
    for i in 2..SEQUENCE_DEPTH {
        let next = seq[i - 1].wrapping_add(seq[i - 2]);
        seq.push(next);
    }
    seq
});

/// The full cached sequence, built on first use and reused read-only.
pub fn sequence() -> &'static [i64] {
    &SEQUENCE
}

/// Index of the first term equal to `value`, if present.
pub fn position_of(value: i64) -> Option<usize> {
    SEQUENCE.iter().position(|&t| t == value)
}
