//! Digit pre-escaping.
//!
//! The shift cipher only transforms letters, so digits are rewritten to
//! bracketed word tokens (`3` → `__three__`) before shifting and mapped
//! back after decryption. This keeps digit tokens intact through every
//! later layer instead of breaking them mid-shift.

use regex::Regex;
use std::sync::LazyLock;

static DIGIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__(zero|one|two|three|four|five|six|seven|eight|nine)__").unwrap()
});

const DIGIT_WORDS: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// Replace every ASCII digit with its `__word__` token.
pub fn escape_digits(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c.to_digit(10) {
            Some(d) => {
                out.push_str("__");
                out.push_str(DIGIT_WORDS[d as usize]);
                out.push_str("__");
            }
            None => out.push(c),
        }
    }
    out
}

/// Map `__word__` tokens back to digits, leaving everything else verbatim.
pub fn restore_digits(text: &str) -> String {
    DIGIT_TOKEN
        .replace_all(text, |caps: &regex::Captures| {
            let word = &caps[1];
            let d = DIGIT_WORDS.iter().position(|w| *w == word).unwrap_or(0);
            d.to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_single_digit() {
        assert_eq!(escape_digits("a3b"), "a__three__b");
    }

    #[test]
    fn test_escape_all_digits() {
        assert_eq!(
            escape_digits("0123456789"),
            "__zero____one____two____three____four____five____six____seven____eight____nine__"
        );
    }

    #[test]
    fn test_restore_digits() {
        assert_eq!(restore_digits("a__three__b"), "a3b");
    }

    #[test]
    fn test_round_trip() {
        let inputs = ["no digits here", "agent 007", "3 + 4 = 7", ""];
        for input in inputs {
            assert_eq!(restore_digits(&escape_digits(input)), input, "input: {input:?}");
        }
    }

    #[test]
    fn test_plain_underscores_untouched() {
        assert_eq!(restore_digits("snake__case__name"), "snake__case__name");
    }
}
