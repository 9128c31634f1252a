//! Pipeline orchestration: the two operations collaborators call.
//!
//! `encrypt_message` runs digit escaping, feedback-derived modifier
//! perturbation, the two-phase shift cipher, symbol substitution, the
//! diagnostic drift stack and the secure envelope, mutating the
//! injected feedback state along the way. `decrypt_artifact` is the
//! exact ordered inverse of the layers that actually ship: envelope,
//! symbols, shift, digit tokens.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::drift::{self, DriftReport};
use crate::envelope::{self, Envelope};
use crate::error::{CoreError, Result};
use crate::feedback::{FeedbackState, OracleBias, OracleRun, RotorState, drift_score, text_entropy};
use crate::modifiers::key_to_modifiers;
use crate::package::Package;
use crate::profile::{KeyProfile, fusion_considered, subconscious_log};
use crate::shift::{shift_message, unshift_message};
use crate::symbols::{SymbolAllocator, decode_symbols, encode_symbols};
use crate::time;
use crate::tokenizer::{escape_digits, restore_digits};

/// The persisted `.bhex` shape: base64 fields in JSON. Unknown extra
/// fields (`metadata`, `fusion_metadata`) are tolerated on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub iv: String,
    pub cipher: String,
    pub hmac: String,
}

impl Artifact {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            iv: BASE64.encode(envelope.iv),
            cipher: BASE64.encode(&envelope.cipher),
            hmac: BASE64.encode(envelope.hmac),
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope> {
        let decode = |field: &str, value: &str| -> Result<Vec<u8>> {
            BASE64
                .decode(value)
                .map_err(|e| CoreError::MalformedArtifact(format!("{field}: {e}")))
        };
        let iv_bytes = decode("iv", &self.iv)?;
        let iv: [u8; 16] = iv_bytes
            .try_into()
            .map_err(|_| CoreError::MalformedArtifact("iv is not 16 bytes".to_string()))?;
        let cipher = decode("cipher", &self.cipher)?;
        let hmac_bytes = decode("hmac", &self.hmac)?;
        let hmac: [u8; 32] = hmac_bytes
            .try_into()
            .map_err(|_| CoreError::MalformedArtifact("hmac is not 32 bytes".to_string()))?;
        Ok(Envelope { iv, cipher, hmac })
    }
}

/// Per-run display/diagnostic values — the oracle panel. None of these
/// bear on the ciphertext's security.
#[derive(Debug, Clone)]
pub struct RunDiagnostics {
    pub oracle_state: String,
    pub oracle_response: String,
    pub drift_score: f64,
    pub entropy: i64,
    pub drift_bar: String,
    pub blur_triggered: bool,
    pub sample_bias: Vec<i64>,
    pub rotor_total_bias: i64,
    pub parasite_drift_bias: i64,
    pub parasite_influence_count: u64,
    pub fusion_considered: bool,
    pub fusion_reason: String,
    pub subconscious: Vec<String>,
    pub key_profile: KeyProfile,
    pub shift_log_len: usize,
}

#[derive(Debug, Clone)]
pub struct EncryptOutcome {
    pub artifact: Artifact,
    pub diagnostics: RunDiagnostics,
}

/// Produce an artifact from a message and password.
///
/// Reads and mutates `state`; the caller persists it afterwards (and
/// only after success — no partial writes). `now_unix` pins the clock
/// so the rotor's hour term is testable.
pub fn encrypt_message(
    message: &str,
    key: &str,
    state: &mut FeedbackState,
    rng: &mut impl Rng,
    now_unix: u64,
) -> Result<EncryptOutcome> {
    encrypt_with_drift(message, key, state, rng, now_unix, true)
}

/// `encrypt_message` with the diagnostic drift stack switchable.
///
/// The stack draws from a forked RNG seeded off the main stream, so
/// disabling it must yield a byte-identical artifact — that equality
/// pins the contract that drift transforms never reach the shipped
/// ciphertext.
pub fn encrypt_with_drift(
    message: &str,
    key: &str,
    state: &mut FeedbackState,
    rng: &mut impl Rng,
    now_unix: u64,
    drift_enabled: bool,
) -> Result<EncryptOutcome> {
    let escaped = escape_digits(message);
    let timestamp = time::stamp_human(now_unix);

    let oracle_bias = OracleBias::from_memory(&state.oracle);
    let mut rotor = RotorState::new(
        state.oracle.runs.len() as u64,
        time::hour_of_day(now_unix),
        &state.oracle,
    );
    rotor.rotate();
    debug!(
        rotor_a = rotor.rotor_a,
        rotor_b = rotor.rotor_b,
        rotor_c = rotor.rotor_c,
        "rotor state"
    );
    debug!(state = %oracle_bias.state, response = %oracle_bias.response, "oracle bias");

    let mut mods = key_to_modifiers(key);
    mods.perturb(&oracle_bias, &rotor);

    let (fusion_active, fusion_reason) = fusion_considered(&escaped, key, oracle_bias.bias);
    debug!(active = fusion_active, reason = %fusion_reason, "fusion decision");

    let (shifted, shift_log) = shift_message(&escaped, mods);

    // The symbol layer fixes the shipped cipher here; everything the
    // drift stack does afterwards is diagnostic.
    let mut alloc = SymbolAllocator::new(rng);
    let (axiom_cipher, shared_symbols) = encode_symbols(&shifted, &mut alloc, rng);

    // Fork the drift stack's randomness off the main stream. The draw
    // happens unconditionally so the main stream stays aligned whether
    // the stack runs or not.
    let drift_seed: u64 = rng.random();
    let report = if drift_enabled {
        let mut drift_rng = SmallRng::seed_from_u64(drift_seed);
        let report = drift::run_stack(&shifted, &shift_log, key, &timestamp, &mut drift_rng);
        state.parasite.record_fractal(report.snapshot.clone());
        report
    } else {
        DriftReport {
            blur_triggered: false,
            entropy_score: 0,
            drift_bar: String::new(),
            sample_bias: Vec::new(),
            snapshot: crate::feedback::FractalSnapshot {
                timestamp: timestamp.clone(),
                entropy: 0,
                shift_log: Vec::new(),
                bias: Vec::new(),
            },
        }
    };

    let entropy = text_entropy(&escaped);
    let score = drift_score(entropy, &shift_log);
    state.parasite.absorb(score, entropy, &timestamp);

    let key_profile = KeyProfile::analyze(key);
    let subconscious = subconscious_log(&escaped, key, &shift_log);

    state.oracle.runs.push(OracleRun {
        timestamp: timestamp.clone(),
        entropy,
        vowel_count: key_profile.vowel_count,
        branches: key_profile.branch_path.clone(),
        drift_score: score,
        flip_triggered: subconscious.iter().any(|t| t.to_lowercase().contains("flip")),
        subconscious_tags: subconscious.clone(),
        oracle_state: oracle_bias.state.clone(),
        oracle_response: oracle_bias.response.clone(),
    });

    let package = Package {
        cipher: axiom_cipher,
        shift_log: shift_log.clone(),
        shared_symbols,
        key_hash: format!("{:x}", Sha256::digest(key.as_bytes())),
        created_at: timestamp,
        key_profile: key_profile.clone(),
        subconscious: subconscious.clone(),
    };

    let package_bytes = serde_json::to_vec(&package)?;
    let envelope = envelope::seal(&package_bytes, key, rng);
    let artifact = Artifact::from_envelope(&envelope);

    Ok(EncryptOutcome {
        artifact,
        diagnostics: RunDiagnostics {
            oracle_state: oracle_bias.state,
            oracle_response: oracle_bias.response,
            drift_score: score,
            entropy,
            drift_bar: report.drift_bar,
            blur_triggered: report.blur_triggered,
            sample_bias: report.sample_bias,
            rotor_total_bias: rotor.total_bias(),
            parasite_drift_bias: state.parasite.drift_bias,
            parasite_influence_count: state.parasite.influence_count,
            fusion_considered: fusion_active,
            fusion_reason,
            subconscious,
            key_profile,
            shift_log_len: shift_log.len(),
        },
    })
}

/// Verify, decrypt and parse the inner package without decoding the
/// message — the read-only accessor inspectors use.
pub fn open_package(artifact: &Artifact, key: &str) -> Result<Package> {
    let envelope = artifact.to_envelope()?;
    let plaintext = envelope::open(&envelope, key)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Consume an artifact back into its message.
pub fn decrypt_artifact(artifact: &Artifact, key: &str) -> Result<String> {
    let package = open_package(artifact, key)?;

    let decoded = decode_symbols(&package.cipher, &package.shared_symbols);

    // Lossy-recovery policy: truncate both sides to the shorter length
    // rather than failing.
    let chars: Vec<char> = decoded.chars().collect();
    let len = chars.len().min(package.shift_log.len());
    if chars.len() != package.shift_log.len() {
        warn!(
            text_len = chars.len(),
            log_len = package.shift_log.len(),
            "length mismatch, truncating to shorter"
        );
    }
    let text: String = chars[..len].iter().collect();
    let plain = unshift_message(&text, &package.shift_log[..len]);

    Ok(restore_digits(&plain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    // Pinned baseline: empty feedback state, fixed clock, seeded rng.
    const NOW: u64 = 1771632000; // 2026-02-21 00:00:00 UTC

    fn encrypt_pinned(message: &str, key: &str) -> (EncryptOutcome, FeedbackState) {
        let mut state = FeedbackState::default();
        let outcome = encrypt_message(message, key, &mut state, &mut rng(), NOW).unwrap();
        (outcome, state)
    }

    #[test]
    fn test_round_trip_quick_brown_fox() {
        let (outcome, _) = encrypt_pinned("The quick brown fox", "test123");
        let plain = decrypt_artifact(&outcome.artifact, "test123").unwrap();
        assert_eq!(plain, "The quick brown fox");
    }

    #[test]
    fn test_round_trip_with_digits() {
        let (outcome, _) = encrypt_pinned("agent 007 reporting", "pass");
        let plain = decrypt_artifact(&outcome.artifact, "pass").unwrap();
        assert_eq!(plain, "agent 007 reporting");
    }

    #[test]
    fn test_round_trip_punctuation() {
        let msg = "Hello, world! (first contact?)";
        let (outcome, _) = encrypt_pinned(msg, "k3y!");
        assert_eq!(decrypt_artifact(&outcome.artifact, "k3y!").unwrap(), msg);
    }

    #[test]
    fn test_shift_log_deterministic_under_pinned_state() {
        let (a, _) = encrypt_pinned("The quick brown fox", "test123");
        let (b, _) = encrypt_pinned("The quick brown fox", "test123");
        let pkg_a = open_package(&a.artifact, "test123").unwrap();
        let pkg_b = open_package(&b.artifact, "test123").unwrap();
        assert_eq!(pkg_a.shift_log, pkg_b.shift_log);
        assert_eq!(pkg_a.cipher, pkg_b.cipher);
    }

    #[test]
    fn test_wrong_password_fails_integrity() {
        let (outcome, _) = encrypt_pinned("secret text", "right");
        assert!(matches!(
            decrypt_artifact(&outcome.artifact, "wrong"),
            Err(CoreError::IntegrityFailure)
        ));
    }

    #[test]
    fn test_tampered_cipher_fails_integrity() {
        let (outcome, _) = encrypt_pinned("secret text", "key");
        let envelope = outcome.artifact.to_envelope().unwrap();
        let mut tampered = envelope.clone();
        tampered.cipher[0] ^= 0x01;
        let artifact = Artifact::from_envelope(&tampered);
        assert!(matches!(
            decrypt_artifact(&artifact, "key"),
            Err(CoreError::IntegrityFailure)
        ));
    }

    #[test]
    fn test_drift_stack_never_touches_artifact() {
        let mut state_on = FeedbackState::default();
        let mut state_off = FeedbackState::default();
        let on = encrypt_with_drift(
            "The quick brown fox",
            "test123",
            &mut state_on,
            &mut rng(),
            NOW,
            true,
        )
        .unwrap();
        let off = encrypt_with_drift(
            "The quick brown fox",
            "test123",
            &mut state_off,
            &mut rng(),
            NOW,
            false,
        )
        .unwrap();
        assert_eq!(on.artifact.iv, off.artifact.iv);
        assert_eq!(on.artifact.cipher, off.artifact.cipher);
        assert_eq!(on.artifact.hmac, off.artifact.hmac);
    }

    #[test]
    fn test_feedback_state_mutated() {
        let (outcome, state) = encrypt_pinned("some message here", "key");
        assert_eq!(state.oracle.runs.len(), 1);
        assert_eq!(state.parasite.influence_count, 1);
        assert_eq!(state.parasite.fractal_history.len(), 1);
        let run = &state.oracle.runs[0];
        assert_eq!(run.drift_score, outcome.diagnostics.drift_score);
        assert_eq!(run.oracle_state, "BALANCE");
    }

    #[test]
    fn test_feedback_changes_ciphertext() {
        let msg = "The quick brown fox";
        let (baseline, _) = encrypt_pinned(msg, "test123");
        let pkg_baseline = open_package(&baseline.artifact, "test123").unwrap();

        // A history of low-drift runs flips the oracle to entropy
        // hunger, perturbing the modifiers.
        let mut state = FeedbackState::default();
        for _ in 0..5 {
            state.oracle.runs.push(OracleRun {
                timestamp: "t".to_string(),
                entropy: 10,
                vowel_count: 0,
                branches: vec![],
                drift_score: 5.0,
                flip_triggered: false,
                subconscious_tags: vec![],
                oracle_state: "BALANCE".to_string(),
                oracle_response: String::new(),
            });
        }
        let outcome = encrypt_message(msg, "test123", &mut state, &mut rng(), NOW).unwrap();
        let pkg = open_package(&outcome.artifact, "test123").unwrap();
        assert_ne!(pkg.shift_log, pkg_baseline.shift_log);
        // Both still decrypt to the same plaintext.
        assert_eq!(decrypt_artifact(&outcome.artifact, "test123").unwrap(), msg);
    }

    #[test]
    fn test_package_diagnostic_fields() {
        let (outcome, _) = encrypt_pinned("inspect me", "aeiou12345!");
        let package = open_package(&outcome.artifact, "aeiou12345!").unwrap();
        assert_eq!(package.key_profile.vowel_count, 5);
        assert!(!package.subconscious.is_empty());
        assert_eq!(
            package.key_hash,
            format!("{:x}", Sha256::digest(b"aeiou12345!"))
        );
    }

    #[test]
    fn test_whitespace_normalization_documented() {
        let (outcome, _) = encrypt_pinned("two   spaces", "k");
        assert_eq!(
            decrypt_artifact(&outcome.artifact, "k").unwrap(),
            "two spaces"
        );
    }

    #[test]
    fn test_empty_message() {
        let (outcome, _) = encrypt_pinned("", "k");
        assert_eq!(decrypt_artifact(&outcome.artifact, "k").unwrap(), "");
    }

    #[test]
    fn test_artifact_tolerates_extra_fields() {
        let (outcome, _) = encrypt_pinned("msg text", "k");
        let mut value: serde_json::Value =
            serde_json::to_value(&outcome.artifact).unwrap();
        value["metadata"] = serde_json::json!({"version": 6});
        let artifact: Artifact = serde_json::from_value(value).unwrap();
        assert_eq!(decrypt_artifact(&artifact, "k").unwrap(), "msg text");
    }

    #[test]
    fn test_malformed_base64_rejected() {
        let artifact = Artifact {
            iv: "not base64!!".to_string(),
            cipher: String::new(),
            hmac: String::new(),
        };
        assert!(matches!(
            decrypt_artifact(&artifact, "k"),
            Err(CoreError::MalformedArtifact(_))
        ));
    }
}
