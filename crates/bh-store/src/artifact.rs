//! `.bhex` artifact files on disk.
//!
//! Every artifact lands twice: a timestamped file so consecutive runs
//! never clobber each other, and a fixed name that always holds the
//! latest run so consumers have a stable path to pick up.

use std::fs;
use std::path::{Path, PathBuf};

use bh_core::{Artifact, time};
use tracing::info;

use crate::error::Result;

pub const FALLBACK_FILE: &str = "encrypted_output.bhex";

/// Write an artifact under `dir` as both `blackhole_<stamp>.bhex` and
/// the fixed [`FALLBACK_FILE`]. Returns the timestamped path.
pub fn save_artifact(dir: &Path, artifact: &Artifact, now_unix: u64) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(artifact)?;

    let primary = dir.join(format!("blackhole_{}.bhex", time::stamp_filename(now_unix)));
    fs::write(&primary, &json)?;
    fs::write(dir.join(FALLBACK_FILE), &json)?;
    info!(path = %primary.display(), "artifact saved");
    Ok(primary)
}

/// Parse an artifact file. Missing or malformed fields are a load
/// failure; integrity is only checked later, against the password.
pub fn load_artifact(path: &Path) -> Result<Artifact> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> Artifact {
        Artifact {
            iv: "aXZpdml2aXZpdml2aXY=".to_string(),
            cipher: "Y2lwaGVy".to_string(),
            hmac: "aG1hYw==".to_string(),
        }
    }

    #[test]
    fn test_save_writes_timestamped_and_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_artifact(dir.path(), &artifact(), 1771632000).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "blackhole_2026-02-21_00-00-00.bhex"
        );
        let fallback = dir.path().join(FALLBACK_FILE);
        assert!(fallback.exists());
        assert_eq!(fs::read(&path).unwrap(), fs::read(&fallback).unwrap());
    }

    #[test]
    fn test_fixed_name_holds_latest_run() {
        let dir = tempfile::tempdir().unwrap();
        let first = artifact();
        save_artifact(dir.path(), &first, 0).unwrap();
        let second = Artifact {
            cipher: "bmV3ZXI=".to_string(),
            ..first
        };
        save_artifact(dir.path(), &second, 60).unwrap();

        let latest = load_artifact(&dir.path().join(FALLBACK_FILE)).unwrap();
        assert_eq!(latest.cipher, second.cipher);
        // Both timestamped files survive.
        let count = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with("blackhole_"))
            })
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let original = artifact();
        let path = save_artifact(dir.path(), &original, 0).unwrap();
        let loaded = load_artifact(&path).unwrap();
        assert_eq!(loaded.iv, original.iv);
        assert_eq!(loaded.cipher, original.cipher);
        assert_eq!(loaded.hmac, original.hmac);
    }

    #[test]
    fn test_load_rejects_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bhex");
        fs::write(&path, br#"{"iv": "only"}"#).unwrap();
        assert!(load_artifact(&path).is_err());
    }

    #[test]
    fn test_load_rejects_missing_file() {
        assert!(load_artifact(Path::new("/nonexistent/file.bhex")).is_err());
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("er");
        save_artifact(&nested, &artifact(), 0).unwrap();
        assert!(nested.exists());
    }
}
