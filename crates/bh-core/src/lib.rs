//! BlackHole cipher engine.
//!
//! A multi-stage, stateful text-obfuscation pipeline: a formula-driven
//! two-phase shift cipher, a randomized 4-letter symbol substitution
//! layer, a diagnostic drift stack, and an AES-256-CBC + HMAC-SHA256
//! envelope around the persisted package. The envelope is the actual
//! security boundary; the inner layers are specified for exact
//! reproducibility, not cryptographic strength.
//!
//! Zero I/O — feedback state, randomness and the clock are injected by
//! the caller. Persistence lives in `bh-store`.

pub mod drift;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod feedback;
pub mod fibonacci;
pub mod modifiers;
pub mod package;
pub mod profile;
pub mod shift;
pub mod symbols;
pub mod time;
pub mod tokenizer;

pub use engine::{Artifact, EncryptOutcome, RunDiagnostics, decrypt_artifact, encrypt_message};
pub use envelope::{Envelope, derive_key, open, seal};
pub use error::{CoreError, Result};
pub use feedback::{
    FeedbackState, OracleBias, OracleMemory, OracleRun, ParasiteMemory, RotorState, drift_score,
    text_entropy,
};
pub use modifiers::{Modifiers, key_to_modifiers};
pub use package::Package;
pub use profile::KeyProfile;
pub use shift::{shift_message, unshift_message};
pub use symbols::{SymbolAllocator, SymbolEntry, decode_symbols, encode_symbols};
pub use tokenizer::{escape_digits, restore_digits};
