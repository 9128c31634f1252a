//! The `Session` facade: one object owning the data directory and the
//! feedback store, exposing the three operations the CLI needs.
//!
//! Ordering matters here. Feedback state is written only after both
//! the pipeline and the artifact write succeeded, so a failed run
//! leaves the stores exactly as it found them.

use std::path::{Path, PathBuf};

use bh_core::engine::{EncryptOutcome, decrypt_artifact, encrypt_message, open_package};
use bh_core::{Package, time};
use tracing::debug;

use crate::artifact::{load_artifact, save_artifact};
use crate::error::Result;
use crate::feedback_store::{FeedbackStore, JsonFeedbackStore};

pub struct Session<S: FeedbackStore = JsonFeedbackStore> {
    data_dir: PathBuf,
    store: S,
}

impl Session<JsonFeedbackStore> {
    /// Open a session over a data directory, with the JSON feedback
    /// stores living alongside the artifacts.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let store = JsonFeedbackStore::new(&data_dir);
        Self { data_dir, store }
    }
}

impl<S: FeedbackStore> Session<S> {
    pub fn with_store(data_dir: impl Into<PathBuf>, store: S) -> Self {
        Self { data_dir: data_dir.into(), store }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Encrypt a message and persist the artifact plus updated
    /// feedback state. Returns the artifact path and the run's
    /// diagnostics for display.
    pub fn produce_artifact(
        &mut self,
        message: &str,
        key: &str,
    ) -> Result<(PathBuf, EncryptOutcome)> {
        let mut state = self.store.load();
        debug!(
            runs = state.oracle.runs.len(),
            influence = state.parasite.influence_count,
            "feedback state loaded"
        );

        let now = time::now_unix_secs();
        let outcome = encrypt_message(message, key, &mut state, &mut rand::rng(), now)?;
        let path = save_artifact(&self.data_dir, &outcome.artifact, now)?;
        self.store.save(&state)?;
        Ok((path, outcome))
    }

    /// Decrypt an artifact file back into its message. Read-only: the
    /// feedback stores are untouched.
    pub fn consume_artifact(&self, path: &Path, key: &str) -> Result<String> {
        let artifact = load_artifact(path)?;
        Ok(decrypt_artifact(&artifact, key)?)
    }

    /// Verify and open an artifact's inner package without decoding
    /// the message, for inspection.
    pub fn inspect_artifact(&self, path: &Path, key: &str) -> Result<Package> {
        let artifact = load_artifact(path)?;
        Ok(open_package(&artifact, key)?)
    }
}
