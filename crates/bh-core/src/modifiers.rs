//! Password-derived cipher modifiers.
//!
//! Pure and bit-identical across platforms: decryption never re-derives
//! these (it replays the persisted shift log), so they only matter on
//! the encryption side, but the derivation is still fully pinned down.

use sha2::{Digest, Sha256};

use crate::feedback::{OracleBias, RotorState};

/// The three numeric modifiers feeding the shift cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub fib_mod: i64,
    pub cube_mod: i64,
    pub shift_mod: i64,
}

impl Modifiers {
    /// Fold oracle bias and rotor values in. This is the only channel
    /// through which persisted feedback state reaches the ciphertext.
    pub fn perturb(&mut self, bias: &OracleBias, rotor: &RotorState) {
        self.fib_mod += bias.bias + rotor.rotor_a;
        self.cube_mod += bias.bias + rotor.rotor_b;
        self.shift_mod += rotor.rotor_c;
    }
}

/// Derive `(fib_mod, cube_mod, shift_mod)` from a password.
///
/// Takes the first 16 hex characters of SHA-256(password), squares each
/// digit's value, and reduces three slices of the squares:
/// `sum(n[0..5]) % 1000`, `sum(n[5..10]) % 7`, `sum(n[10..16]) % 3`.
pub fn key_to_modifiers(key: &str) -> Modifiers {
    let hashed = format!("{:x}", Sha256::digest(key.as_bytes()));
    let nums: Vec<i64> = hashed
        .chars()
        .take(16)
        .map(|c| {
            let v = c.to_digit(16).unwrap_or(0) as i64;
            v * v
        })
        .collect();

    Modifiers {
        fib_mod: nums[0..5].iter().sum::<i64>() % 1000,
        cube_mod: nums[5..10].iter().sum::<i64>() % 7,
        shift_mod: nums[10..16].iter().sum::<i64>() % 3,
    }
}
