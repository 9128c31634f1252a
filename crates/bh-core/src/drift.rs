//! Diagnostic drift stack: boundary blur, quantum foam, fractal decay.
//!
//! All three transforms run on the shift-phase text after the symbol
//! layer has already captured the shipped ciphertext. Their output
//! text drives the drift bar, the entropy display and the persisted
//! fractal-history snapshot, and nothing else: the artifact's cipher
//! field is fixed before any of them run, and decryption never inverts
//! them. `run_stack` draws from a forked RNG so the artifact's random
//! stream stays identical whether the stack runs or not.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::feedback::FractalSnapshot;
use crate::shift::{apply_shift_formula, shift_char};

pub const BLUR_THRESHOLD: i64 = 25000;
pub const FOAM_INTENSITY: f64 = 0.15;

/// Re-shift the first half of the text with the cubed-vowel fallback
/// when any logged shift reaches the threshold.
pub fn boundary_blur(text: &str, shift_log: &[i64], threshold: i64) -> (String, bool) {
    let max_shift = shift_log.iter().copied().max().unwrap_or(0);
    if max_shift < threshold {
        return (text.to_string(), false);
    }

    let chars: Vec<char> = text.chars().collect();
    let midpoint = chars.len() / 2;
    let prefix = &chars[..midpoint];
    let suffix: String = chars[midpoint..].iter().collect();

    let y = prefix
        .iter()
        .find(|c| "AEIOU".contains(c.to_ascii_uppercase()))
        .and_then(|c| match c.to_ascii_uppercase() {
            'A' => Some(6),
            'E' => Some(7),
            'I' => Some(8),
            'O' => Some(9),
            'U' => Some(11),
            _ => None,
        })
        .unwrap_or(1);

    let cube_mod = 3; // fallback default
    let mut blurred = String::with_capacity(text.len());
    for (i, &c) in prefix.iter().enumerate() {
        let base = y + i as i64 + 1;
        let shift_val = apply_shift_formula(base * base * base, cube_mod);
        blurred.push(shift_char(c, shift_val));
    }
    blurred.push_str(&suffix);
    (blurred, true)
}

/// Password-seeded positional noise: values in [-2, 2], seeded from
/// the first eight bytes of SHA-256(key). Deterministic per key.
pub fn planck_noise(key: &str, length: usize) -> Vec<i64> {
    use rand::SeedableRng;
    let digest = Sha256::digest(key.as_bytes());
    let seed = u64::from_le_bytes(digest[..8].try_into().unwrap_or_default());
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    (0..length).map(|_| rng.random_range(-2i64..=2)).collect()
}

/// Re-rotate already-shifted letters by a bounded random fluctuation
/// plus positional noise.
pub fn quantum_foam(text: &str, shift_log: &[i64], noise: &[i64], rng: &mut impl Rng) -> String {
    text.chars()
        .zip(shift_log.iter())
        .enumerate()
        .map(|(i, (c, &shift))| {
            let magnitude = (shift as f64).abs() * FOAM_INTENSITY;
            let fluctuation = if magnitude > 0.0 {
                rng.random_range(-magnitude..=magnitude)
            } else {
                0.0
            };
            let foam = ((shift as f64 + fluctuation) as i64).max(1);
            let positional = if noise.is_empty() { 0 } else { noise[i % noise.len()] };
            shift_char(c, foam + positional)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayMode {
    /// Slowly reduce shift impact.
    Linear,
    /// Small random drift up or down.
    Wobble,
    /// Overwrite values when the entropy threshold is breached.
    Mutate,
}

/// Entropy/position-bias snapshot of a ciphertext, used to re-shift it
/// recursively and to seed the persisted fractal history.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalMemory {
    pub message_length: usize,
    pub shift_log: Vec<i64>,
    pub entropy_score: i64,
    pub position_bias: Vec<i64>,
}

impl FractalMemory {
    pub fn capture(text: &str, shift_log: &[i64]) -> Self {
        let entropy = text.chars().map(|c| c as u32 as i64).sum();
        let position_bias = shift_log
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as i64 % 7) - s.rem_euclid(3))
            .collect();
        Self {
            message_length: text.chars().count(),
            shift_log: shift_log.to_vec(),
            entropy_score: entropy,
            position_bias,
        }
    }

    /// Apply a decay policy to the remembered shifts.
    pub fn decay(&mut self, mode: DecayMode, strength: f64, rng: &mut impl Rng) {
        for (i, shift) in self.shift_log.iter_mut().enumerate() {
            *shift = match mode {
                DecayMode::Linear => ((*shift as f64 * (1.0 - strength)) as i64).max(1),
                DecayMode::Wobble => (*shift + rng.random_range(-2i64..=2)).max(1),
                DecayMode::Mutate => {
                    if self.entropy_score > 1000 && i % 5 == 0 {
                        rng.random_range(5i64..=50)
                    } else {
                        *shift
                    }
                }
            };
        }
    }

    /// Additively re-shift every character by the remembered shift and
    /// position bias, wrapping in the printable range.
    pub fn apply(&self, text: &str) -> String {
        if self.shift_log.is_empty() {
            return text.to_string();
        }
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let shift = self.shift_log[i % self.shift_log.len()];
                let bias = self.position_bias[i % self.position_bias.len()];
                let code = (c as u32 as i64)
                    .wrapping_add(shift)
                    .wrapping_add(bias)
                    .rem_euclid(126);
                let code = if code == 0 { 32 } else { code };
                char::from_u32(code as u32).unwrap_or(' ')
            })
            .collect()
    }

    pub fn snapshot(&self, timestamp: &str) -> FractalSnapshot {
        FractalSnapshot {
            timestamp: timestamp.to_string(),
            entropy: self.entropy_score,
            shift_log: self.shift_log.clone(),
            bias: self.position_bias.clone(),
        }
    }
}

/// Visual drift signature: one glyph per remembered shift.
pub fn drift_bar(shift_log: &[i64]) -> String {
    shift_log
        .iter()
        .map(|&s| if s > 40 { '|' } else if s > 20 { ':' } else { '.' })
        .collect()
}

/// Everything the stack produces for display and persistence. The
/// transformed text itself is deliberately not part of this report.
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub blur_triggered: bool,
    pub entropy_score: i64,
    pub drift_bar: String,
    pub sample_bias: Vec<i64>,
    pub snapshot: FractalSnapshot,
}

/// Run the full diagnostic stack over the shift-phase text.
pub fn run_stack(
    text: &str,
    shift_log: &[i64],
    key: &str,
    timestamp: &str,
    rng: &mut impl Rng,
) -> DriftReport {
    let (blurred, blur_triggered) = boundary_blur(text, shift_log, BLUR_THRESHOLD);

    let noise = planck_noise(key, blurred.chars().count().max(1));
    let foamed = quantum_foam(&blurred, shift_log, &noise, rng);

    let mut memory = FractalMemory::capture(&foamed, shift_log);
    memory.decay(DecayMode::Wobble, 0.1, rng);
    let _drifted = memory.apply(&foamed); // diagnostic output only

    let bar = drift_bar(&memory.shift_log);
    DriftReport {
        blur_triggered,
        entropy_score: memory.entropy_score,
        drift_bar: bar,
        sample_bias: memory.position_bias.iter().copied().take(10).collect(),
        snapshot: memory.snapshot(timestamp),
    }
}
