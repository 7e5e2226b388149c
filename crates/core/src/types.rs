use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::snapshot::ProgressSnapshot;

new_key_type! {
    pub struct ZoneId;
    pub struct PickupId;
}

/// Edge length of one template tile in world pixels.
pub const TILE_SIZE: i32 = 32;

/// World-space pixel position. `y` grows downwards.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn offset_x(self, dx: i32) -> Self {
        Self { x: self.x + dx, y: self.y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn offset_x(self, dx: i32) -> Self {
        Self { x: self.x + dx, ..self }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x >= self.x && pos.y >= self.y && pos.x < self.x + self.w && pos.y < self.y + self.h
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Medium, Tier::Hard];

    /// Maps a question's declared difficulty label onto a tier.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Some(Self::Easy),
            "medium" | "2" => Some(Self::Medium),
            "hard" | "3" => Some(Self::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Practice,
    Assessment,
}

/// One quiz question as far as level assembly is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub difficulty: String,
}

impl Question {
    pub fn new(id: impl Into<String>, difficulty: impl Into<String>) -> Self {
        Self { id: id.into(), difficulty: difficulty.into() }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GateId(pub u32);

impl GateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectibleKind {
    Coin,
    Egg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EggKind {
    Common,
    Golden,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub gate_index: u32,
    pub respawn_x: i32,
    pub respawn_y: i32,
}

impl Checkpoint {
    pub fn respawn_pos(&self) -> Pos {
        Pos { x: self.respawn_x, y: self.respawn_y }
    }
}

/// An accepted answer whose pass or fail zone is open but not yet resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResolution {
    pub gate: GateId,
    pub correct: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Running,
    WaitingForQuiz,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    TimeExpired,
}

/// Answer delivered by the quiz dialog.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerReceived {
    pub correct: bool,
    pub time_left: f32,
}

/// How the physics host should react to an overlap it reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneResponse {
    Ignored,
    Halt,
    Launch { vx: i32, vy: i32 },
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    QuestionRequested { gate_id: GateId, question: Option<Question> },
    RewardChanged { collectible: CollectibleKind, new_total: u32 },
    CheckpointReached { message: String },
    ReviewRoundStarted { message: String },
    RunCompleted { final_coin_total: u32, outcome: RunOutcome },
    SaveProgress(Box<ProgressSnapshot>),
}
