//! Primary shift cipher: a two-phase, per-character Caesar machine.
//!
//! The machine walks the message word by word. It starts in the cube
//! phase (cube-formula shifts, indexed per character) and transitions
//! to the Fibonacci phase after finishing the first word of length ≥ 5.
//! The Fibonacci phase consumes the remainder of the message as one
//! joined string and is terminal.
//!
//! Every output character gets exactly one shift-log entry. Decryption
//! replays the persisted log; it never re-derives shifts, because the
//! modifiers are perturbed by non-replayable feedback state (rotor
//! hour-of-day, oracle history).

use crate::fibonacci;
use crate::modifiers::Modifiers;

const SPECIAL_END_LETTERS: [char; 6] = ['D', 'H', 'L', 'M', 'N', 'T'];

/// Fixed Fibonacci anchor for words ending in a special letter.
const ANCHOR_TERM: i64 = 701408733;

/// Fallback start index when the vowel-derived sum is not a term.
const FALLBACK_START_INDEX: usize = 377;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Cube,
    Fibonacci,
}

fn cube_from_vowel(vowel: char) -> Option<i64> {
    match vowel.to_ascii_uppercase() {
        'A' => Some(6),
        'E' => Some(7),
        'I' => Some(8),
        'O' => Some(9),
        'U' => Some(11),
        _ => None,
    }
}

fn vowel_start_point(vowel: char) -> Option<i64> {
    match vowel.to_ascii_uppercase() {
        'A' => Some(4181),
        'E' => Some(28657),
        'I' => Some(10946),
        'O' => Some(13),
        'U' => Some(75025),
        _ => None,
    }
}

fn find_first_vowel(text: &str) -> Option<char> {
    find_nth_vowel(text, 1)
}

fn find_nth_vowel(text: &str, n: usize) -> Option<char> {
    text.chars()
        .filter(|c| "AEIOU".contains(c.to_ascii_uppercase()))
        .nth(n.saturating_sub(1))
}

/// Case-preserving Caesar rotation; non-ASCII-letters pass through.
pub(crate) fn shift_char(c: char, shift: i64) -> char {
    if c.is_ascii_alphabetic() {
        let base = if c.is_ascii_uppercase() { b'A' } else { b'a' };
        let offset = (c as u8 - base) as i64;
        (base + (offset + shift).rem_euclid(26) as u8) as char
    } else {
        c
    }
}

/// Cube-phase shift amount: `x = ((cube_value/2)+10)/3 + cube_mod`,
/// rounded up when the value is fractional.
pub(crate) fn apply_shift_formula(cube_value: i64, cube_mod: i64) -> i64 {
    let x = ((cube_value as f64 / 2.0) + 10.0) / 3.0 + cube_mod as f64;
    if x.fract() != 0.0 { x.floor() as i64 + 1 } else { x as i64 }
}

/// Pick the Fibonacci-phase start index for a message.
fn fibonacci_start(words: &[&str], message: &str, fib_mod: i64) -> usize {
    let first_long = words.iter().find(|w| w.chars().count() >= 5);
    if let Some(word) = first_long
        && let Some(last) = word.chars().last()
        && SPECIAL_END_LETTERS.contains(&last.to_ascii_uppercase())
        && let Some(idx) = fibonacci::position_of(ANCHOR_TERM)
    {
        return idx;
    }

    let start_point = find_nth_vowel(message, 3)
        .and_then(vowel_start_point)
        .unwrap_or(377);
    fibonacci::position_of(start_point + fib_mod).unwrap_or(FALLBACK_START_INDEX)
}

/// Run the two-phase shift cipher over a message.
///
/// Whitespace is normalized: words are re-joined with single spaces,
/// and each separator logs shift 0. Returns `(ciphertext, shift_log)`
/// with one log entry per output character.
pub fn shift_message(message: &str, mods: Modifiers) -> (String, Vec<i64>) {
    let words: Vec<&str> = message.split_whitespace().collect();
    let mut out = String::new();
    let mut log: Vec<i64> = Vec::new();

    let y = find_first_vowel(message).and_then(cube_from_vowel).unwrap_or(1);
    let mut cube_index: i64 = 0;
    let mut phase = Phase::Cube;

    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            out.push(' ');
            log.push(0);
        }

        match phase {
            Phase::Cube => {
                for c in word.chars() {
                    let base = y + cube_index + mods.shift_mod;
                    let cube_value = base * base * base;
                    let shift_val = apply_shift_formula(cube_value, mods.cube_mod);
                    log.push(shift_val);
                    out.push(shift_char(c, shift_val));
                    cube_index += 1;
                }
                // Transition fires after the triggering word is done.
                if word.chars().count() >= 5 {
                    phase = Phase::Fibonacci;
                }
            }
            Phase::Fibonacci => {
                let start = fibonacci_start(&words, message, mods.fib_mod);
                let seq = fibonacci::sequence();
                let remaining = seq.len() - start;
                let rest = words[index..].join(" ");
                for (i, c) in rest.chars().enumerate() {
                    if c.is_ascii_alphabetic() {
                        let shift_val = seq[start + (i % remaining)];
                        log.push(shift_val);
                        out.push(shift_char(c, shift_val));
                    } else {
                        log.push(0);
                        out.push(c);
                    }
                }
                break;
            }
        }
    }

    debug_assert_eq!(out.chars().count(), log.len());
    (out, log)
}

/// Exact numeric inverse: rotate each alphabetic character back by its
/// logged shift; everything else passes through.
pub fn unshift_message(text: &str, log: &[i64]) -> String {
    text.chars()
        .zip(log.iter())
        .map(|(c, &s)| shift_char(c, -s))
        .collect()
}
