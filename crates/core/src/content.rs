//! Chunk template schema and the built-in template set.

use serde::{Deserialize, Serialize};

use crate::types::{Pos, Rect, TILE_SIZE, Tier};

mod library;

pub use library::{AssetError, TemplateLibrary, TemplateSource};

pub mod keys {
    pub const EASY_1: &str = "easy_1";
    pub const EASY_2: &str = "easy_2";
    pub const EASY_3: &str = "easy_3";
    pub const EASY_4: &str = "easy_4";
    pub const EASY_5: &str = "easy_5";

    pub const MEDIUM_1: &str = "medium_1";
    pub const MEDIUM_2: &str = "medium_2";
    pub const MEDIUM_3: &str = "medium_3";
    pub const MEDIUM_4: &str = "medium_4";

    pub const HARD_1: &str = "hard_1";
    pub const HARD_2: &str = "hard_2";
    pub const HARD_3: &str = "hard_3";
    pub const HARD_4: &str = "hard_4";

    /// Drawn whenever a tier's pool turns out to be empty.
    pub const DEFAULT_TEMPLATE: &str = EASY_1;
}

/// Row index of the walkable ground surface in the built-in templates.
pub const GROUND_ROW: i32 = 18;
const TEMPLATE_ROWS: i32 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    pub col: i32,
    pub row: i32,
    #[serde(default)]
    pub collidable: bool,
    #[serde(default)]
    pub hazard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayer {
    pub name: String,
    /// Auxiliary layers (editor guides, decoration metadata) are never instantiated.
    #[serde(default)]
    pub auxiliary: bool,
    pub tiles: Vec<TileSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateGeometry {
    pub trigger: Rect,
    pub pass: Rect,
    pub fail: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnMarker {
    pub id: u32,
    pub pos: Pos,
}

/// Prefabricated level slice. Positions are local to the template's left edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTemplate {
    pub id: String,
    pub tier: Tier,
    pub width: i32,
    pub layers: Vec<TileLayer>,
    #[serde(default)]
    pub entry: Option<Pos>,
    #[serde(default)]
    pub exit: Option<Pos>,
    #[serde(default)]
    pub gate: Option<GateGeometry>,
    #[serde(default)]
    pub bonus_pads: Vec<Rect>,
    #[serde(default)]
    pub coin_spawns: Vec<SpawnMarker>,
    #[serde(default)]
    pub egg_spawns: Vec<SpawnMarker>,
}

impl ChunkTemplate {
    pub fn has_gate(&self) -> bool {
        self.gate.is_some()
    }
}

pub fn build_default_templates() -> Vec<ChunkTemplate> {
    let mut templates = Vec::new();
    for (variant, id) in
        [keys::EASY_1, keys::EASY_2, keys::EASY_3, keys::EASY_4, keys::EASY_5].iter().enumerate()
    {
        templates.push(build_template(id, Tier::Easy, variant as i32));
    }
    for (variant, id) in
        [keys::MEDIUM_1, keys::MEDIUM_2, keys::MEDIUM_3, keys::MEDIUM_4].iter().enumerate()
    {
        templates.push(build_template(id, Tier::Medium, variant as i32));
    }
    for (variant, id) in [keys::HARD_1, keys::HARD_2, keys::HARD_3, keys::HARD_4].iter().enumerate()
    {
        templates.push(build_template(id, Tier::Hard, variant as i32));
    }
    templates
}

fn build_template(id: &str, tier: Tier, variant: i32) -> ChunkTemplate {
    let (cols, pit_count, spike_count, coin_count, pad_count) = match tier {
        Tier::Easy => (20, 0, 0, 4, 1),
        Tier::Medium => (24, 1, 1, 3, 1),
        Tier::Hard => (28, 2, 3, 2, 2),
    };

    let gate_col = cols / 2;
    let pits: Vec<i32> = (0..pit_count).map(|i| 4 + variant + i * 5).collect();

    let mut ground = Vec::new();
    for col in 0..cols {
        if pits.contains(&col) {
            continue;
        }
        for row in GROUND_ROW..TEMPLATE_ROWS {
            ground.push(TileSpec { col, row, collidable: true, hazard: false });
        }
    }

    let spikes = (0..spike_count)
        .map(|i| TileSpec {
            col: gate_col + 3 + variant % 2 + i * 2,
            row: GROUND_ROW - 1,
            collidable: false,
            hazard: true,
        })
        .collect();

    let guides = vec![TileSpec { col: gate_col, row: 0, collidable: false, hazard: false }];

    let surface_y = (GROUND_ROW - 2) * TILE_SIZE;
    let gate = GateGeometry {
        trigger: Rect { x: gate_col * TILE_SIZE, y: 0, w: TILE_SIZE, h: GROUND_ROW * TILE_SIZE },
        pass: Rect { x: (gate_col + 1) * TILE_SIZE, y: surface_y, w: 2 * TILE_SIZE, h: TILE_SIZE },
        fail: Rect {
            x: (gate_col + 1) * TILE_SIZE,
            y: surface_y + TILE_SIZE,
            w: 2 * TILE_SIZE,
            h: TILE_SIZE,
        },
    };

    let bonus_pads = (0..pad_count)
        .map(|i| Rect {
            x: (2 + variant + i * 8) * TILE_SIZE,
            y: (GROUND_ROW - 1) * TILE_SIZE,
            w: TILE_SIZE,
            h: TILE_SIZE / 2,
        })
        .collect();

    let coin_spawns = (0..coin_count)
        .map(|i| SpawnMarker {
            id: i as u32 + 1,
            pos: Pos { x: (3 + i * 2 + variant) * TILE_SIZE, y: (GROUND_ROW - 3) * TILE_SIZE },
        })
        .collect();
    let egg_spawns = vec![SpawnMarker {
        id: 100,
        pos: Pos { x: (cols - 4) * TILE_SIZE, y: (GROUND_ROW - 5) * TILE_SIZE },
    }];

    ChunkTemplate {
        id: id.to_string(),
        tier,
        width: cols * TILE_SIZE,
        layers: vec![
            TileLayer { name: "ground".to_string(), auxiliary: false, tiles: ground },
            TileLayer { name: "hazards".to_string(), auxiliary: false, tiles: spikes },
            TileLayer { name: "guides".to_string(), auxiliary: true, tiles: guides },
        ],
        entry: Some(Pos { x: TILE_SIZE, y: surface_y }),
        exit: Some(Pos { x: (cols - 2) * TILE_SIZE, y: surface_y }),
        gate: Some(gate),
        bonus_pads,
        coin_spawns,
        egg_spawns,
    }
}
