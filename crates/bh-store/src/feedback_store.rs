//! Feedback-state persistence.
//!
//! The engine takes a `FeedbackStore` instead of touching ambient file
//! paths, so tests can pin state with the in-memory implementation.
//! The JSON store mirrors the on-disk contract: two independent files,
//! created on first use, silently reset to defaults on parse failure.

use std::fs;
use std::path::{Path, PathBuf};

use bh_core::feedback::{OracleMemory, ParasiteMemory};
use bh_core::FeedbackState;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::Result;

pub const ORACLE_FILE: &str = "oracle_memory.json";
pub const PARASITE_FILE: &str = "parasite_memory.json";

pub trait FeedbackStore {
    /// Read the current state; corruption or absence yields defaults,
    /// never an error.
    fn load(&self) -> FeedbackState;

    /// Persist the state. Called once per run, after all stages
    /// succeeded.
    fn save(&mut self, state: &FeedbackState) -> Result<()>;
}

/// File-backed store: `oracle_memory.json` + `parasite_memory.json`
/// under a data directory. Single-writer; concurrent invocations
/// racing on these files is unsupported.
pub struct JsonFeedbackStore {
    dir: PathBuf,
}

impl JsonFeedbackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "corrupt feedback file, resetting");
                    T::default()
                }
            },
            Err(_) => T::default(),
        }
    }
}

impl FeedbackStore for JsonFeedbackStore {
    fn load(&self) -> FeedbackState {
        FeedbackState {
            oracle: self.read_or_default::<OracleMemory>(ORACLE_FILE),
            parasite: self.read_or_default::<ParasiteMemory>(PARASITE_FILE),
        }
    }

    fn save(&mut self, state: &FeedbackState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(
            self.dir.join(ORACLE_FILE),
            serde_json::to_vec_pretty(&state.oracle)?,
        )?;
        fs::write(
            self.dir.join(PARASITE_FILE),
            serde_json::to_vec_pretty(&state.parasite)?,
        )?;
        Ok(())
    }
}

/// In-memory store for deterministic tests.
#[derive(Default)]
pub struct MemoryFeedbackStore {
    state: FeedbackState,
}

impl MemoryFeedbackStore {
    pub fn with_state(state: FeedbackState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &FeedbackState {
        &self.state
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn load(&self) -> FeedbackState {
        self.state.clone()
    }

    fn save(&mut self, state: &FeedbackState) -> Result<()> {
        self.state = state.clone();
        Ok(())
    }
}
