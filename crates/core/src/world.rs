//! Runtime world state owned by one run: placed tiles, zones, pickups and the chunk arena.
//! Chunk instances are append-only and keyed by insertion index; zones and pickups live in
//! slot maps because finish markers are destroyed and recreated on extension.

use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::types::{CollectibleKind, EggKind, GateId, PickupId, Pos, Rect, TILE_SIZE, Tier, ZoneId};

/// Disambiguates repeated templates inside one run. Extension chunks share the `-1` sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceIndex {
    Initial(usize),
    Extension,
}

impl fmt::Display for InstanceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial(index) => write!(f, "{index}"),
            Self::Extension => f.write_str("-1"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedTile {
    pub pos: Pos,
    pub solid: bool,
    pub hazard: bool,
    pub chunk_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneKind {
    GateTrigger(GateId),
    GatePass(GateId),
    GateFail(GateId),
    BonusPad,
    Finish,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Zone {
    pub kind: ZoneKind,
    pub rect: Rect,
    pub active: bool,
    pub visible: bool,
    /// One-shot zones (bonus pads) flip this on first use.
    pub used: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pickup {
    pub identity: String,
    pub kind: CollectibleKind,
    pub egg_kind: Option<EggKind>,
    pub value: u32,
    pub pos: Pos,
    pub enabled: bool,
    pub chunk_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkInstance {
    pub index: usize,
    pub template_id: String,
    pub tier: Tier,
    pub instance: InstanceIndex,
    pub x_offset: i32,
    pub width: i32,
    /// Entry marker in world space, when the template declares one.
    pub entry: Option<Pos>,
    pub gate: Option<GateId>,
    pub bonus_pads: Vec<ZoneId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizGate {
    pub id: GateId,
    pub chunk_index: usize,
    pub x_offset: i32,
    pub tier: Tier,
    pub trigger: ZoneId,
    pub pass: ZoneId,
    pub fail: ZoneId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldBounds {
    pub width: i32,
    pub height: i32,
}

pub struct World {
    pub(crate) cursor_x: i32,
    pub(crate) next_gate_id: u32,
    pub(crate) chunks: Vec<ChunkInstance>,
    pub(crate) tiles: Vec<PlacedTile>,
    pub(crate) zones: SlotMap<ZoneId, Zone>,
    pub(crate) pickups: SlotMap<PickupId, Pickup>,
    pub(crate) gates: Vec<QuizGate>,
    pub(crate) bounds: WorldBounds,
    pub(crate) spawn_point: Option<Pos>,
    pub(crate) finish: Option<ZoneId>,
}

impl World {
    pub fn new(height: i32) -> Self {
        Self {
            cursor_x: 0,
            next_gate_id: 0,
            chunks: Vec::new(),
            tiles: Vec::new(),
            zones: SlotMap::with_key(),
            pickups: SlotMap::with_key(),
            gates: Vec::new(),
            bounds: WorldBounds { width: 0, height },
            spawn_point: None,
            finish: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.bounds.height);
    }

    pub fn cursor_x(&self) -> i32 {
        self.cursor_x
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn chunks(&self) -> &[ChunkInstance] {
        &self.chunks
    }

    pub fn tiles(&self) -> &[PlacedTile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Option<&PlacedTile> {
        self.tiles.get(index)
    }

    pub fn gates(&self) -> &[QuizGate] {
        &self.gates
    }

    pub fn gate(&self, id: GateId) -> Option<&QuizGate> {
        self.gates.get(id.index())
    }

    pub fn gate_count(&self) -> u32 {
        self.gates.len() as u32
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub(crate) fn zone_mut(&mut self, id: ZoneId) -> Option<&mut Zone> {
        self.zones.get_mut(id)
    }

    pub fn zones(&self) -> impl Iterator<Item = (ZoneId, &Zone)> {
        self.zones.iter()
    }

    pub fn pickup(&self, id: PickupId) -> Option<&Pickup> {
        self.pickups.get(id)
    }

    pub(crate) fn pickup_mut(&mut self, id: PickupId) -> Option<&mut Pickup> {
        self.pickups.get_mut(id)
    }

    pub fn pickups(&self) -> impl Iterator<Item = (PickupId, &Pickup)> {
        self.pickups.iter()
    }

    pub fn find_pickup(&self, identity: &str) -> Option<PickupId> {
        self.pickups.iter().find(|(_, pickup)| pickup.identity == identity).map(|(id, _)| id)
    }

    pub fn spawn_point(&self) -> Option<Pos> {
        self.spawn_point
    }

    pub fn finish_zone(&self) -> Option<ZoneId> {
        self.finish
    }

    /// Gates whose trigger is currently armed, in id order.
    pub fn active_triggers(&self) -> Vec<GateId> {
        self.gates
            .iter()
            .filter(|gate| self.zones.get(gate.trigger).is_some_and(|zone| zone.active))
            .map(|gate| gate.id)
            .collect()
    }

    /// Where the player stands when dropped at the start of a chunk.
    pub fn chunk_start(&self, chunk_index: usize) -> Option<Pos> {
        let chunk = self.chunks.get(chunk_index)?;
        Some(chunk.entry.unwrap_or_else(|| fallback_entry(chunk.x_offset, self.bounds.height)))
    }

    pub(crate) fn insert_zone(&mut self, kind: ZoneKind, rect: Rect, active: bool) -> ZoneId {
        self.zones.insert(Zone { kind, rect, active, visible: active, used: false })
    }

    pub(crate) fn set_zone_active(&mut self, id: ZoneId, active: bool) {
        if let Some(zone) = self.zones.get_mut(id) {
            zone.active = active;
            zone.visible = active;
        }
    }

    /// Arms exactly one trigger (or none when `gate` is past the last gate).
    pub(crate) fn arm_only(&mut self, gate: Option<GateId>) {
        let triggers: Vec<(GateId, ZoneId)> =
            self.gates.iter().map(|quiz_gate| (quiz_gate.id, quiz_gate.trigger)).collect();
        for (id, trigger) in triggers {
            self.set_zone_active(trigger, Some(id) == gate);
        }
    }

    pub(crate) fn reset_bonus_pads(&mut self) {
        for (_, zone) in self.zones.iter_mut() {
            if zone.kind == ZoneKind::BonusPad {
                zone.used = false;
                zone.active = true;
                zone.visible = true;
            }
        }
    }

    /// Swaps the finish marker for a new one at `exit`.
    pub(crate) fn replace_finish(&mut self, exit: Pos) -> ZoneId {
        if let Some(previous) = self.finish.take() {
            self.zones.remove(previous);
        }
        let rect = Rect { x: exit.x, y: 0, w: TILE_SIZE, h: self.bounds.height };
        let id = self.insert_zone(ZoneKind::Finish, rect, true);
        self.finish = Some(id);
        id
    }
}

pub(crate) fn fallback_entry(chunk_x: i32, world_height: i32) -> Pos {
    Pos { x: chunk_x + TILE_SIZE, y: world_height - 3 * TILE_SIZE }
}
