use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::snapshot::ProgressSnapshot;
use crate::types::{GateId, Pos, Question, RunMode};

pub const JOURNAL_FORMAT_VERSION: u16 = 1;

/// Everything needed to rebuild a run and re-apply its host inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunJournal {
    pub format_version: u16,
    pub build_id: String,
    pub content_hash: u64,
    pub mode: RunMode,
    pub questions: Option<Vec<Question>>,
    #[serde(default)]
    pub resume_from: Option<ProgressSnapshot>,
    #[serde(default)]
    pub config: RunConfig,
    pub inputs: Vec<InputRecord>,
    /// Host saves, ordered by `inputs_before`.
    #[serde(default)]
    pub saves: Vec<SaveMark>,
}

/// A save the host persisted: the run fingerprint once the first `inputs_before` inputs applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMark {
    pub inputs_before: u64,
    pub tick: u64,
    pub pointer: u32,
    pub snapshot_hash: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub seq: u64,
    /// Run tick at which the input was accepted.
    pub tick_boundary: u64,
    pub input: RunInput,
}

/// Zone references that survive a rebuild; slot-map keys do not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneRef {
    Trigger { gate: GateId },
    Pass { gate: GateId },
    Fail { gate: GateId },
    BonusPad { chunk_index: usize, pad: usize },
    Finish,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RunInput {
    Ticks { count: u32 },
    ZoneOverlap { zone: ZoneRef },
    Pickup { identity: String },
    TileContact { tile: usize },
    PlayerMoved { pos: Pos },
    Answer { correct: bool, time_left: f32 },
}

impl RunJournal {
    pub fn new(
        mode: RunMode,
        questions: Option<Vec<Question>>,
        config: RunConfig,
        content_hash: u64,
    ) -> Self {
        Self {
            format_version: JOURNAL_FORMAT_VERSION,
            build_id: "dev".to_string(),
            content_hash,
            mode,
            questions,
            resume_from: None,
            config,
            inputs: Vec::new(),
            saves: Vec::new(),
        }
    }

    pub fn resumed_from(mut self, snapshot: ProgressSnapshot) -> Self {
        self.resume_from = Some(snapshot);
        self
    }

    pub fn append(&mut self, tick_boundary: u64, input: RunInput) {
        let seq = self.inputs.len() as u64;
        self.inputs.push(InputRecord { seq, tick_boundary, input });
    }

    /// Marks a save taken after every input appended so far.
    pub fn mark_save(&mut self, tick: u64, pointer: u32, snapshot_hash: u64) {
        let inputs_before = self.inputs.len() as u64;
        self.saves.push(SaveMark { inputs_before, tick, pointer, snapshot_hash });
    }
}
