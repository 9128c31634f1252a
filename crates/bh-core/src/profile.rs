//! Password statistics and the cosmetic subconscious tag stream.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Branch-tag statistics over the password. Diagnostic only; carried
/// in the package for inspectors, never consulted by decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyProfile {
    pub vowel_count: usize,
    pub digit_count: usize,
    pub symbol_count: usize,
    pub length: usize,
    #[serde(default)]
    pub branch_path: Vec<String>,
}

impl KeyProfile {
    pub fn analyze(key: &str) -> Self {
        let vowel_count = key
            .chars()
            .filter(|c| "aeiou".contains(c.to_ascii_lowercase()))
            .count();
        let digit_count = key.chars().filter(char::is_ascii_digit).count();
        let symbol_count = key.chars().filter(|c| !c.is_alphanumeric()).count();

        let mut branch_path = Vec::new();
        if vowel_count > 4 {
            branch_path.push("B1.1".to_string());
        }
        if digit_count > 3 {
            branch_path.push("B1.2".to_string());
        }
        if symbol_count >= 1 {
            branch_path.push("B2.1".to_string());
        }

        Self {
            vowel_count,
            digit_count,
            symbol_count,
            length: key.chars().count(),
            branch_path,
        }
    }
}

const GLYPHS: [&str; 12] = ["⟁", "⌬", "∴", "Δ", "⇄", "Ω", "π", "Σ", "⊗", "≡", "∵", "Ψ"];
const TAGS: [&str; 8] = [
    "B1.1", "B1.2", "SHIFT", "PATH_MUT", "CHAOS", "ECHO", "RECALL", "GLYPH",
];

/// Cosmetic subconscious fragments: deterministic given
/// `(message, key, shift_log)` via a seeded generator. Reproduced for
/// artifact fidelity; carries no security meaning.
pub fn subconscious_log(message: &str, key: &str, shift_log: &[i64]) -> Vec<String> {
    let shift_sum = shift_log
        .iter()
        .fold(0i64, |acc, &s| acc.saturating_add(s))
        .clamp(0, 1_000_000);
    let entropy = (message.chars().map(|c| c as u32 as i64).sum::<i64>() + shift_sum).max(1);

    let digest = Sha256::digest(format!("{key}{entropy}").as_bytes());
    let seed = u64::from_le_bytes(digest[..8].try_into().unwrap_or_default()) % 10_000_000;
    let mut rng = SmallRng::seed_from_u64(seed);

    let count = rng.random_range(8..=16);
    let mut fragments: Vec<String> = (0..count)
        .map(|_| {
            let glyph = GLYPHS.choose(&mut rng).copied().unwrap_or("Ψ");
            let tag = TAGS.choose(&mut rng).copied().unwrap_or("ECHO");
            let num = rng.random_range(10..=999);
            format!("{glyph}{tag}>{num}")
        })
        .collect();

    if rng.random::<f64>() > 0.5 && fragments.len() > 1 {
        let pos = rng.random_range(1..fragments.len());
        let n = rng.random_range(1..=9);
        fragments.insert(pos, format!("∵PHANTOM>Δ{n}"));
    }

    fragments
}

/// Entropy-profile fusion gate, reported as a diagnostic only. The
/// activation never switches the cipher path: a fusion-specific cipher
/// would have to bypass the feedback perturbation, and artifacts
/// written that way could not be decrypted.
pub fn fusion_considered(message: &str, key: &str, oracle_bias: i64) -> (bool, String) {
    let entropy: i64 = message.chars().map(|c| c as u32 as i64).sum();
    let key_score = key.chars().count() as i64
        + key.chars().filter(char::is_ascii_digit).count() as i64 * 2
        + key.chars().filter(|c| !c.is_alphanumeric()).count() as i64 * 3;
    let modifier = entropy + key_score + oracle_bias * 10;
    let active = modifier > 2500;
    let reason = format!(
        "Entropy+Key Score={modifier} ({})",
        if active { "activated" } else { "not activated" }
    );
    (active, reason)
}
