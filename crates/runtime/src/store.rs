//! File-backed snapshot storage.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use idle_core::SimulationSnapshot;

use crate::error::{Result, RuntimeError};

const EXTENSION: &str = "json";

/// Stores named simulation snapshots as pretty-printed JSON files.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-save never leaves a truncated snapshot behind.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    pub fn save(&self, name: &str, snapshot: &SimulationSnapshot) -> Result<()> {
        let path = self.path(name);
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(target: "runtime::store", name, path = %path.display(), "saved snapshot");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<SimulationSnapshot> {
        let path = self.path(name);
        if !path.exists() {
            return Err(RuntimeError::SnapshotNotFound(name.to_owned()));
        }

        let bytes = fs::read(&path)?;
        let snapshot = serde_json::from_slice(&bytes)?;

        tracing::debug!(target: "runtime::store", name, path = %path.display(), "loaded snapshot");
        Ok(snapshot)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Names of every stored snapshot, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
            {
                names.push(stem.to_owned());
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    /// Removes a snapshot. Returns `false` if there was nothing to remove.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        tracing::debug!(target: "runtime::store", name, "deleted snapshot");
        Ok(true)
    }
}

/// SHA-256 over the bincode encoding of `snapshot`, hex encoded.
///
/// Two runs with the same seed, content and inputs produce the same digest.
pub fn digest(snapshot: &SimulationSnapshot) -> Result<String> {
    let bytes = bincode::serialize(snapshot)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
