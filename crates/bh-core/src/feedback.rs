//! Adaptive feedback state: oracle memory, parasite memory, rotor.
//!
//! Each encryption run reads the persisted history, derives an oracle
//! bias and rotor values that perturb the cipher modifiers, and writes
//! an updated history back. The types here are pure; persistence is a
//! `FeedbackStore` concern in `bh-store`.

use serde::{Deserialize, Serialize};

pub const BALANCE_RESPONSE: &str = "ΨEchoSelf>NEUTRAL>Σ1 :: Conditions stable.";
pub const CHAOS_RESPONSE: &str = "∴EchoSelf>STABILIZE>Δ1 :: Drift beyond tolerance.";
pub const HUNGER_RESPONSE: &str = "∵EchoSelf>EXPAND>Ω3 :: Entropy suboptimal.";

/// One appended record per encryption run. This log grows without
/// bound; only the parasite histories are capped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRun {
    pub timestamp: String,
    pub entropy: i64,
    #[serde(default)]
    pub vowel_count: usize,
    #[serde(default)]
    pub branches: Vec<String>,
    pub drift_score: f64,
    #[serde(default)]
    pub flip_triggered: bool,
    #[serde(default)]
    pub subconscious_tags: Vec<String>,
    #[serde(default)]
    pub oracle_state: String,
    #[serde(default)]
    pub oracle_response: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleMemory {
    #[serde(default)]
    pub runs: Vec<OracleRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParasiteEntry {
    pub timestamp: String,
    pub bias_added: i64,
    pub entropy: i64,
    pub drift: f64,
}

/// Decayed fractal-memory snapshot persisted per run for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalSnapshot {
    pub timestamp: String,
    pub entropy: i64,
    pub shift_log: Vec<i64>,
    pub bias: Vec<i64>,
}

/// Accumulator store. `drift_bias` is computed and persisted every run
/// but never feeds back into the same run's ciphertext — it exists for
/// future inspection and diagnostics only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParasiteMemory {
    #[serde(default)]
    pub drift_bias: i64,
    #[serde(default)]
    pub influence_count: u64,
    #[serde(default)]
    pub history: Vec<ParasiteEntry>,
    #[serde(default)]
    pub fractal_history: Vec<FractalSnapshot>,
}

const PARASITE_HISTORY_CAP: usize = 20;

impl ParasiteMemory {
    /// Fold one run's drift/entropy pair into the accumulator.
    pub fn absorb(&mut self, drift: f64, entropy: i64, timestamp: &str) -> i64 {
        let bias_added = ((drift + (entropy.rem_euclid(97)) as f64) % 7.0) as i64;
        self.drift_bias += bias_added;
        self.influence_count += 1;
        self.history.push(ParasiteEntry {
            timestamp: timestamp.to_string(),
            bias_added,
            entropy,
            drift,
        });
        cap_tail(&mut self.history, PARASITE_HISTORY_CAP);
        bias_added
    }

    pub fn record_fractal(&mut self, snapshot: FractalSnapshot) {
        self.fractal_history.push(snapshot);
        cap_tail(&mut self.fractal_history, PARASITE_HISTORY_CAP);
    }
}

fn cap_tail<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}

/// The two persisted stores, read at the start of an encryption call
/// and written back at the end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackState {
    pub oracle: OracleMemory,
    pub parasite: ParasiteMemory,
}

/// Feedback signal derived from the mean drift score of recent runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleBias {
    pub bias: i64,
    pub state: String,
    pub response: String,
}

impl OracleBias {
    pub fn balanced() -> Self {
        Self {
            bias: 0,
            state: "BALANCE".to_string(),
            response: BALANCE_RESPONSE.to_string(),
        }
    }

    /// Mean drift of the last ≤5 runs: >75 pulls the modifiers down
    /// (chaos aversion), <30 pushes them up (entropy hunger).
    pub fn from_memory(memory: &OracleMemory) -> Self {
        let recent: &[OracleRun] = if memory.runs.len() >= 5 {
            &memory.runs[memory.runs.len() - 5..]
        } else {
            &memory.runs
        };
        if recent.is_empty() {
            return Self::balanced();
        }

        let avg = recent.iter().map(|r| r.drift_score).sum::<f64>() / recent.len() as f64;
        if avg > 75.0 {
            Self {
                bias: -1,
                state: "CHAOS_AVERSION".to_string(),
                response: CHAOS_RESPONSE.to_string(),
            }
        } else if avg < 30.0 {
            Self {
                bias: 1,
                state: "ENTROPY_HUNGER".to_string(),
                response: HUNGER_RESPONSE.to_string(),
            }
        } else {
            Self::balanced()
        }
    }
}

/// Per-invocation perturbation values. `rotor_a` tracks the clock,
/// `rotor_b` the run count, `rotor_c` recent drift history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotorState {
    pub runs: u64,
    pub rotor_a: i64,
    pub rotor_b: i64,
    pub rotor_c: i64,
}

impl RotorState {
    /// `hour` is the wall-clock hour of day (0-23); `runs` is the
    /// current oracle run count.
    pub fn new(runs: u64, hour: u32, memory: &OracleMemory) -> Self {
        let rotor_a = ((hour / 10) + (hour % 10)) as i64 % 10;
        let rotor_b = (runs % 7) as i64 + 1;
        let rotor_c = if memory.runs.is_empty() {
            3
        } else {
            let tail = &memory.runs[memory.runs.len().saturating_sub(3)..];
            (tail.iter().map(|r| r.drift_score).sum::<f64>() as i64).rem_euclid(9)
        };
        Self { runs, rotor_a, rotor_b, rotor_c }
    }

    /// Advance the run count; only the count-driven rotor changes.
    pub fn rotate(&mut self) {
        self.runs += 1;
        self.rotor_b = (self.runs % 7) as i64 + 1;
    }

    pub fn total_bias(&self) -> i64 {
        self.rotor_a + self.rotor_b + self.rotor_c
    }
}

/// Sum of character codes — the entropy measure used throughout.
pub fn text_entropy(text: &str) -> i64 {
    text.chars().map(|c| c as u32 as i64).sum()
}

/// Normalized drift score: entropy against shift-value spread, clamped
/// to two decimals in [0, 100]; non-finite inputs collapse to 99.99.
pub fn drift_score(entropy: i64, shift_log: &[i64]) -> f64 {
    // Spread in f64: fibonacci-phase logs can hold extreme i64 values
    // whose difference would overflow integer arithmetic.
    let spread = match (shift_log.iter().max(), shift_log.iter().min()) {
        (Some(&max), Some(&min)) => max as f64 - min as f64,
        _ => 1.0,
    };
    let raw = (entropy as f64 / (spread + 1.0)) % 100.0;
    if !raw.is_finite() {
        return 99.99;
    }
    (raw.abs().min(100.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with_drift(drift: f64) -> OracleRun {
        OracleRun {
            timestamp: "2026-01-01 00:00:00".to_string(),
            entropy: 100,
            vowel_count: 0,
            branches: vec![],
            drift_score: drift,
            flip_triggered: false,
            subconscious_tags: vec![],
            oracle_state: "BALANCE".to_string(),
            oracle_response: BALANCE_RESPONSE.to_string(),
        }
    }

    #[test]
    fn test_empty_memory_is_balanced() {
        let bias = OracleBias::from_memory(&OracleMemory::default());
        assert_eq!(bias.bias, 0);
        assert_eq!(bias.state, "BALANCE");
    }

    #[test]
    fn test_high_drift_triggers_chaos_aversion() {
        let memory = OracleMemory {
            runs: (0..5).map(|_| run_with_drift(90.0)).collect(),
        };
        let bias = OracleBias::from_memory(&memory);
        assert_eq!(bias.bias, -1);
        assert_eq!(bias.state, "CHAOS_AVERSION");
    }

    #[test]
    fn test_low_drift_triggers_entropy_hunger() {
        let memory = OracleMemory {
            runs: (0..3).map(|_| run_with_drift(10.0)).collect(),
        };
        let bias = OracleBias::from_memory(&memory);
        assert_eq!(bias.bias, 1);
        assert_eq!(bias.state, "ENTROPY_HUNGER");
    }

    #[test]
    fn test_only_last_five_runs_count() {
        let mut runs: Vec<OracleRun> = (0..10).map(|_| run_with_drift(99.0)).collect();
        runs.extend((0..5).map(|_| run_with_drift(50.0)));
        let bias = OracleBias::from_memory(&OracleMemory { runs });
        assert_eq!(bias.state, "BALANCE");
    }

    #[test]
    fn test_rotor_values() {
        let memory = OracleMemory {
            runs: vec![run_with_drift(10.0), run_with_drift(20.0), run_with_drift(5.0)],
        };
        let rotor = RotorState::new(3, 13, &memory);
        assert_eq!(rotor.rotor_a, 4); // 1 + 3
        assert_eq!(rotor.rotor_b, 4); // 3 % 7 + 1
        assert_eq!(rotor.rotor_c, 35 % 9);
        assert_eq!(rotor.total_bias(), rotor.rotor_a + rotor.rotor_b + rotor.rotor_c);
    }

    #[test]
    fn test_rotor_defaults_without_history() {
        let rotor = RotorState::new(0, 0, &OracleMemory::default());
        assert_eq!(rotor.rotor_c, 3);
        assert_eq!(rotor.rotor_b, 1);
    }

    #[test]
    fn test_rotate_bumps_count_rotor() {
        let mut rotor = RotorState::new(6, 9, &OracleMemory::default());
        assert_eq!(rotor.rotor_b, 7);
        rotor.rotate();
        assert_eq!(rotor.runs, 7);
        assert_eq!(rotor.rotor_b, 1);
    }

    #[test]
    fn test_drift_score_empty_log() {
        // Spread defaults to 1, so the score is entropy/2 mod 100.
        assert_eq!(drift_score(100, &[]), 50.0);
    }

    #[test]
    fn test_drift_score_clamped() {
        let score = drift_score(1_000_000, &[0, 1]);
        assert!((0.0..=100.0).contains(&score), "score {score}");
    }

    #[test]
    fn test_parasite_absorb_caps_history() {
        let mut parasite = ParasiteMemory::default();
        for i in 0..30 {
            parasite.absorb(10.0, i, "2026-01-01 00:00:00");
        }
        assert_eq!(parasite.history.len(), 20);
        assert_eq!(parasite.influence_count, 30);
        assert!(parasite.drift_bias >= 0);
    }

    #[test]
    fn test_parasite_bias_formula() {
        let mut parasite = ParasiteMemory::default();
        // (10 + 200 % 97) % 7 = (10 + 6) % 7 = 2
        let added = parasite.absorb(10.0, 200, "t");
        assert_eq!(added, 2);
        assert_eq!(parasite.drift_bias, 2);
    }

    #[test]
    fn test_fractal_history_capped() {
        let mut parasite = ParasiteMemory::default();
        for i in 0..25 {
            parasite.record_fractal(FractalSnapshot {
                timestamp: "t".to_string(),
                entropy: i,
                shift_log: vec![],
                bias: vec![],
            });
        }
        assert_eq!(parasite.fractal_history.len(), 20);
        assert_eq!(parasite.fractal_history.last().unwrap().entropy, 24);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = FeedbackState::default();
        state.oracle.runs.push(run_with_drift(42.0));
        state.parasite.absorb(42.0, 10, "t");
        let json = serde_json::to_string(&state).unwrap();
        let back: FeedbackState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.oracle.runs.len(), 1);
        assert_eq!(back.parasite.influence_count, 1);
    }
}
