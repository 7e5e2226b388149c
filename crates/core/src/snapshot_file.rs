use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::snapshot::ProgressSnapshot;

/// On-disk envelope around a [`ProgressSnapshot`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub format_version: u32,
    pub snapshot_hash_hex: String,
    pub updated_at_unix_ms: u64,
    pub snapshot: ProgressSnapshot,
}

impl SnapshotFile {
    pub fn new(snapshot: ProgressSnapshot, snapshot_hash: u64, updated_at_unix_ms: u64) -> Self {
        Self {
            format_version: 1,
            snapshot_hash_hex: format!("0x{snapshot_hash:016x}"),
            updated_at_unix_ms,
            snapshot,
        }
    }

    pub fn write_atomic(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: Self = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        file.snapshot.validate().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(file)
    }
}
