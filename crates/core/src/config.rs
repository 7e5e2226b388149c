//! Run tunables. Every field has a default so partial config files stay valid.

use serde::{Deserialize, Serialize};

use crate::types::{EggKind, Tier};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impulse {
    pub vx: i32,
    pub vy: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinValues {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl CoinValues {
    pub fn for_tier(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Easy => self.easy,
            Tier::Medium => self.medium,
            Tier::Hard => self.hard,
        }
    }
}

impl Default for CoinValues {
    fn default() -> Self {
        Self { easy: 1, medium: 2, hard: 3 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EggTable {
    pub common_weight: u32,
    pub golden_weight: u32,
    pub common_value: u32,
    pub golden_value: u32,
}

impl EggTable {
    pub fn weighted(&self) -> [(EggKind, u32); 2] {
        [(EggKind::Common, self.common_weight), (EggKind::Golden, self.golden_weight)]
    }

    pub fn value_of(&self, kind: EggKind) -> u32 {
        match kind {
            EggKind::Common => self.common_value,
            EggKind::Golden => self.golden_value,
        }
    }
}

impl Default for EggTable {
    fn default() -> Self {
        Self { common_weight: 95, golden_weight: 5, common_value: 1, golden_value: 5 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Physical world height; the world width grows with every assembled chunk.
    pub world_height: i32,
    /// How far below the world the player may fall before the death procedure runs.
    pub fall_margin: i32,
    /// Ticks between activating a pass/fail zone and returning to `Running`.
    pub gate_resolve_delay_ticks: u32,
    pub max_health: i32,
    pub coin_values: CoinValues,
    pub egg_table: EggTable,
    pub pass_launch: Impulse,
    pub fail_launch: Impulse,
    pub bonus_launch: Impulse,
    /// Seed text for quiz-less runs.
    pub fallback_seed: String,
    /// Debug-only: force this template to the front of the chunk sequence.
    pub forced_template: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            world_height: 640,
            fall_margin: 64,
            gate_resolve_delay_ticks: 45,
            max_health: 3,
            coin_values: CoinValues::default(),
            egg_table: EggTable::default(),
            pass_launch: Impulse { vx: 420, vy: -380 },
            fail_launch: Impulse { vx: 120, vy: 260 },
            bonus_launch: Impulse { vx: 0, vy: -520 },
            fallback_seed: "free_play".to_string(),
            forced_template: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_config_keeps_defaults_for_missing_fields() {
        let config: RunConfig = serde_json::from_str(
            r#"{"gate_resolve_delay_ticks": 10, "egg_table": {"golden_weight": 50}}"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.gate_resolve_delay_ticks, 10);
        assert_eq!(config.egg_table.golden_weight, 50);
        assert_eq!(config.egg_table.common_weight, 95);
        assert_eq!(config.world_height, RunConfig::default().world_height);
    }

    #[test]
    fn coin_values_scale_with_tier() {
        let values = CoinValues::default();
        assert!(values.for_tier(Tier::Easy) < values.for_tier(Tier::Medium));
        assert!(values.for_tier(Tier::Medium) < values.for_tier(Tier::Hard));
    }
}
