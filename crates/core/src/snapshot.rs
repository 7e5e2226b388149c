//! Serializable run progress, the only artifact persisted between sessions.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Checkpoint, PendingResolution, Pos, Question, RunMode, Tier};

pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub format_version: u16,
    /// Canonical seed text; informational, restore always re-derives it.
    #[serde(default)]
    pub seed: String,
    pub progression_pointer: u32,
    pub checkpoint: Option<Checkpoint>,
    pub active_question_sequence: Vec<Question>,
    /// Length of the question sequence before review-round re-appends.
    pub base_question_count: usize,
    pub extended_chunk_log: Vec<String>,
    pub collected_coin_ids: BTreeSet<String>,
    pub collected_egg_ids: BTreeSet<String>,
    pub coin_total: u32,
    #[serde(default)]
    pub egg_total: u32,
    pub player_position: Pos,
    pub mode: RunMode,
    #[serde(default)]
    pub pool_cursors: BTreeMap<Tier, usize>,
    /// Answer still waiting out its resolve delay when the snapshot was taken.
    #[serde(default)]
    pub pending_resolution: Option<PendingResolution>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    UnsupportedVersion { found: u16 },
    /// `base_question_count` exceeds the stored question sequence.
    BaseCountOutOfRange { base: usize, len: usize },
    Malformed(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found } => write!(
                f,
                "snapshot format version {found} is not supported (expected {SNAPSHOT_FORMAT_VERSION})"
            ),
            Self::BaseCountOutOfRange { base, len } => {
                write!(f, "snapshot base question count {base} exceeds sequence length {len}")
            }
            Self::Malformed(message) => write!(f, "malformed snapshot: {message}"),
        }
    }
}

impl Error for SnapshotError {}

impl ProgressSnapshot {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion { found: self.format_version });
        }
        let len = self.active_question_sequence.len();
        if self.base_question_count > len {
            return Err(SnapshotError::BaseCountOutOfRange { base: self.base_question_count, len });
        }
        Ok(())
    }

    /// Questions the initial chunk sequence was built from.
    pub fn base_questions(&self) -> &[Question] {
        let base = self.base_question_count.min(self.active_question_sequence.len());
        &self.active_question_sequence[..base]
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self =
            serde_json::from_str(raw).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
