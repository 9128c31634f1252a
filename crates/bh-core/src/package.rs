//! The inner package: everything the envelope seals.

use serde::{Deserialize, Serialize};

use crate::profile::KeyProfile;
use crate::symbols::SymbolEntry;

/// Serialized, encrypted and authenticated as one unit. `shift_log`
/// and `shared_symbols` are mandatory for reversal; `key_profile` and
/// `subconscious` are diagnostic fields with no bearing on the
/// ciphertext's security.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub cipher: String,
    pub shift_log: Vec<i64>,
    pub shared_symbols: Vec<SymbolEntry>,
    pub key_hash: String,
    pub created_at: String,
    pub key_profile: KeyProfile,
    #[serde(default)]
    pub subconscious: Vec<String>,
}
