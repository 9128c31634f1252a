//! Symbolic substitution layer: every character becomes a 4-letter
//! symbol drawn from per-character pools.
//!
//! Letter pools are shuffled per session and consumed destructively,
//! so the mapping cannot be recomputed later — the shared symbol log
//! must travel with the artifact. Decoding walks the log in lock-step
//! with the decoded chunks; resolution is strictly positional.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

pub const SYMBOL_WIDTH: usize = 4;

const PUNCTUATION: &str = ".,?!:;'\"-_()[]{}@#$%^&*+=<>/\\|~";

/// Pool exhaustion sentinels.
const UNKNOWN_UPPER: &str = "UNKN";
const UNKNOWN_LOWER: &str = "unkn";

/// One mapping decision: `(original character, emitted symbol)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry(pub char, pub String);

/// The i-th 4-letter string over A-Z in lexicographic order.
fn symbol_at(i: u32) -> String {
    let mut bytes = [0u8; SYMBOL_WIDTH];
    let mut n = i;
    for slot in bytes.iter_mut().rev() {
        *slot = b'A' + (n % 26) as u8;
        n /= 26;
    }
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// First `count` symbols of the universe that do not contain `exclude`.
fn filtered_symbols(exclude: char, count: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(count);
    let total = 26u32.pow(SYMBOL_WIDTH as u32);
    for i in 0..total {
        let s = symbol_at(i);
        if !s.contains(exclude) {
            out.push(s);
            if out.len() == count {
                break;
            }
        }
    }
    out
}

struct LetterPool {
    upper: Vec<String>,
    lower: Vec<String>,
}

/// Per-letter pools: 2000 filtered symbols each, split into an upper
/// half (uppercase occurrences) and a lower half (lowercase ones).
static LETTER_POOLS: LazyLock<Vec<LetterPool>> = LazyLock::new(|| {
    (b'A'..=b'Z')
        .map(|b| {
            let filtered = filtered_symbols(b as char, 2000);
            let lower = filtered[1000..].to_vec();
            let mut upper = filtered;
            upper.truncate(1000);
            LetterPool { upper, lower }
        })
        .collect()
});

/// Shared pool for digits and punctuation: the first ten symbols of
/// the universe (no symbol ever contains a digit or punctuation, so
/// the per-character filter never removes anything).
static GENERIC_POOL: LazyLock<Vec<String>> =
    LazyLock::new(|| (0..10).map(symbol_at).collect());

/// Static two-character code table used as a salvage path when a
/// decoded chunk does not match its log entry.
static REVERSE_CODES: LazyLock<HashMap<String, char>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (i, b) in (b'A'..=b'Z').enumerate() {
        map.insert(format!("{:02}", i + 1), b as char);
    }
    for (i, b) in (b'a'..=b'z').enumerate() {
        map.insert(format!("{:02}", i + 27), b as char);
    }
    map
});

/// Session-scoped symbol allocator.
///
/// Owns a shuffled copy of every letter pool; `pop` consumes one
/// symbol per occurrence. Exhausted pools yield the fixed sentinel.
pub struct SymbolAllocator {
    upper: Vec<Vec<&'static str>>,
    lower: Vec<Vec<&'static str>>,
}

impl SymbolAllocator {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut upper = Vec::with_capacity(26);
        let mut lower = Vec::with_capacity(26);
        for pool in LETTER_POOLS.iter() {
            let mut u: Vec<&'static str> = pool.upper.iter().map(String::as_str).collect();
            let mut l: Vec<&'static str> = pool.lower.iter().map(String::as_str).collect();
            u.shuffle(rng);
            l.shuffle(rng);
            upper.push(u);
            lower.push(l);
        }
        Self { upper, lower }
    }

    fn take(&mut self, c: char) -> String {
        let idx = (c.to_ascii_uppercase() as u8 - b'A') as usize;
        if c.is_ascii_uppercase() {
            self.upper[idx]
                .pop()
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_UPPER.to_string())
        } else {
            self.lower[idx]
                .pop()
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_LOWER.to_string())
        }
    }
}

/// Encode a message into symbol text.
///
/// Letters consume from the session allocator; digits and punctuation
/// draw (with replacement) from the static shared pool; anything else
/// gets a uniformly random 4-letter string. Every decision, including
/// one entry per inter-word space, is appended to the shared log in
/// processing order.
pub fn encode_symbols(
    text: &str,
    alloc: &mut SymbolAllocator,
    rng: &mut impl Rng,
) -> (String, Vec<SymbolEntry>) {
    let mut words_out: Vec<String> = Vec::new();
    let mut log: Vec<SymbolEntry> = Vec::new();

    for (wi, word) in text.split_whitespace().enumerate() {
        if wi > 0 {
            log.push(SymbolEntry(' ', " ".to_string()));
        }
        let mut encoded = String::with_capacity(word.len() * SYMBOL_WIDTH);
        for c in word.chars() {
            let symbol = if c.is_ascii_alphabetic() {
                alloc.take(c)
            } else if c.is_ascii_digit() || PUNCTUATION.contains(c) {
                GENERIC_POOL
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_UPPER.to_string())
            } else {
                (0..SYMBOL_WIDTH)
                    .map(|_| (b'A' + rng.random_range(0..26u8)) as char)
                    .collect()
            };
            encoded.push_str(&symbol);
            log.push(SymbolEntry(c, symbol));
        }
        words_out.push(encoded);
    }

    (words_out.join(" "), log)
}

/// Decode symbol text back to its original characters.
///
/// Words are padded with `_` to a multiple of the symbol width,
/// chunked, and resolved against the log one entry per chunk (plus one
/// per space). A chunk that matches its logged symbol yields the
/// logged original; otherwise the static code table is tried; total
/// failure yields `?`.
pub fn decode_symbols(cipher: &str, log: &[SymbolEntry]) -> String {
    let mut out = String::new();
    let mut cursor = 0usize;

    for (wi, word) in cipher.split_whitespace().enumerate() {
        if wi > 0 {
            out.push(' ');
            if cursor < log.len() {
                cursor += 1;
            }
        }

        let mut padded = word.to_string();
        while padded.len() % SYMBOL_WIDTH != 0 {
            padded.push('_');
        }

        for chunk in padded.as_bytes().chunks(SYMBOL_WIDTH) {
            let chunk = std::str::from_utf8(chunk).unwrap_or("");
            let stripped = chunk.trim_end_matches('_');
            if cursor < log.len() {
                let entry = &log[cursor];
                if stripped == entry.1 {
                    out.push(entry.0);
                } else if let Some(&original) = REVERSE_CODES.get(stripped) {
                    out.push(original);
                } else {
                    out.push('?');
                }
                cursor += 1;
            } else {
                out.push('?');
            }
        }
    }

    out
}
