//! Places chunk templates into the run's world at the assembly cursor.
//! This module exists to turn resident template data into tiles, zones, gates and pickups.
//! It does not decide which templates to place or react to player contact.

use std::error::Error;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::content::{AssetError, ChunkTemplate, TemplateSource};
use crate::seed::RunSeed;
use crate::types::{GateId, PickupId, Pos, RunMode, TILE_SIZE, ZoneId};
use crate::world::{
    ChunkInstance, InstanceIndex, PlacedTile, QuizGate, World, ZoneKind, fallback_entry,
};

mod collectibles;

pub use collectibles::{CollectedIds, collectible_identity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// The template is known but not resident; nothing was placed.
    TemplateNotLoaded { template_id: String },
    /// Loading the template for an extension failed.
    Asset(AssetError),
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateNotLoaded { template_id } => {
                write!(f, "template '{template_id}' is not loaded")
            }
            Self::Asset(error) => write!(f, "template load failed: {error}"),
        }
    }
}

impl Error for AssemblyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TemplateNotLoaded { .. } => None,
            Self::Asset(error) => Some(error),
        }
    }
}

impl From<AssetError> for AssemblyError {
    fn from(error: AssetError) -> Self {
        Self::Asset(error)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssembledChunk {
    pub chunk_index: usize,
    pub gate: Option<GateId>,
    pub bonus_pads: Vec<ZoneId>,
    /// Indices into [`World::tiles`] of hazard tiles placed by this chunk.
    pub hazard_tiles: Vec<usize>,
    pub coins: Vec<PickupId>,
    pub eggs: Vec<PickupId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssembledMap {
    pub spawn_point: Pos,
    pub gates: Vec<GateId>,
    pub bonus_pads: Vec<ZoneId>,
    pub coins: Vec<PickupId>,
    pub eggs: Vec<PickupId>,
    /// Template ids whose chunk could not be placed.
    pub skipped: Vec<String>,
}

pub struct ChunkAssembler {
    world: World,
    source: Box<dyn TemplateSource>,
    config: RunConfig,
    seed: RunSeed,
}

impl ChunkAssembler {
    pub fn new(source: Box<dyn TemplateSource>, config: RunConfig, seed: RunSeed) -> Self {
        Self { world: World::new(config.world_height), source, config, seed }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn source(&self) -> &dyn TemplateSource {
        self.source.as_ref()
    }

    pub(crate) fn source_mut(&mut self) -> &mut dyn TemplateSource {
        self.source.as_mut()
    }

    /// Whether `template_id` carries a quiz gate, loading it first if needed.
    pub fn template_has_gate(&mut self, template_id: &str) -> Result<bool, AssemblyError> {
        if let Some(template) = self.source.template(template_id) {
            return Ok(template.has_gate());
        }
        Ok(self.source.load_template(template_id)?.has_gate())
    }

    /// Places one template at the cursor. On error nothing is placed and the cursor stays put.
    pub fn assemble_chunk(
        &mut self,
        template_id: &str,
        is_first: bool,
        is_last: bool,
        instance: InstanceIndex,
        mode: RunMode,
        collected: &CollectedIds,
    ) -> Result<AssembledChunk, AssemblyError> {
        let Some(template) = self.source.template(template_id).cloned() else {
            return Err(AssemblyError::TemplateNotLoaded { template_id: template_id.to_string() });
        };

        let chunk_index = self.world.chunks.len();
        let chunk_x = self.world.cursor_x;
        let mut assembled = AssembledChunk { chunk_index, ..AssembledChunk::default() };

        self.place_tiles(&template, chunk_index, chunk_x, &mut assembled);

        let entry = template.entry.map(|entry| entry.offset_x(chunk_x));
        if is_first {
            let spawn = entry.unwrap_or_else(|| {
                warn!(template_id, "template has no entry marker; using fallback spawn");
                fallback_entry(chunk_x, self.world.bounds.height)
            });
            self.world.spawn_point = Some(spawn);
        }

        if is_last {
            let exit = self.exit_or_edge(&template, chunk_x);
            self.world.replace_finish(exit);
        }

        if let Some(geometry) = template.gate {
            let id = GateId(self.world.next_gate_id);
            self.world.next_gate_id += 1;
            let trigger = self.world.insert_zone(
                ZoneKind::GateTrigger(id),
                geometry.trigger.offset_x(chunk_x),
                false,
            );
            let pass = self.world.insert_zone(
                ZoneKind::GatePass(id),
                geometry.pass.offset_x(chunk_x),
                false,
            );
            let fail = self.world.insert_zone(
                ZoneKind::GateFail(id),
                geometry.fail.offset_x(chunk_x),
                false,
            );
            self.world.gates.push(QuizGate {
                id,
                chunk_index,
                x_offset: chunk_x,
                tier: template.tier,
                trigger,
                pass,
                fail,
            });
            assembled.gate = Some(id);
        }

        for pad in &template.bonus_pads {
            let zone = self.world.insert_zone(ZoneKind::BonusPad, pad.offset_x(chunk_x), true);
            assembled.bonus_pads.push(zone);
        }

        if mode == RunMode::Practice && matches!(instance, InstanceIndex::Initial(_)) {
            let spawned = collectibles::spawn_collectibles(
                &mut self.world,
                &template,
                collectibles::Placement { chunk_index, chunk_x, instance },
                collected,
                &self.config,
                &self.seed,
            );
            assembled.coins = spawned.coins;
            assembled.eggs = spawned.eggs;
        }

        self.world.chunks.push(ChunkInstance {
            index: chunk_index,
            template_id: template.id.clone(),
            tier: template.tier,
            instance,
            x_offset: chunk_x,
            width: template.width,
            entry,
            gate: assembled.gate,
            bonus_pads: assembled.bonus_pads.clone(),
        });
        self.world.cursor_x += template.width;

        debug!(
            template_id,
            chunk_index,
            chunk_x,
            gate = ?assembled.gate,
            "chunk assembled"
        );
        Ok(assembled)
    }

    /// Rebuilds the world from scratch. Chunks that fail to assemble are logged and skipped.
    pub fn assemble_map(
        &mut self,
        sequence: &[String],
        collected: &CollectedIds,
        mode: RunMode,
    ) -> AssembledMap {
        self.world.reset();
        let mut map = AssembledMap::default();
        let last = sequence.len().saturating_sub(1);

        for (position, template_id) in sequence.iter().enumerate() {
            let instance = InstanceIndex::Initial(position);
            match self.assemble_chunk(
                template_id,
                position == 0,
                position == last,
                instance,
                mode,
                collected,
            ) {
                Ok(chunk) => {
                    map.gates.extend(chunk.gate);
                    map.bonus_pads.extend(chunk.bonus_pads);
                    map.coins.extend(chunk.coins);
                    map.eggs.extend(chunk.eggs);
                }
                Err(error) => {
                    warn!(%error, template_id = %template_id, position, "chunk skipped");
                    map.skipped.push(template_id.clone());
                }
            }
        }

        if self.world.spawn_point.is_none() {
            warn!("first chunk did not assemble; using fallback spawn");
            self.world.spawn_point = Some(fallback_entry(0, self.world.bounds.height));
        }
        if self.world.finish.is_none() {
            warn!("last chunk did not assemble; finish placed at the world edge");
            let edge = Pos {
                x: (self.world.cursor_x - TILE_SIZE).max(0),
                y: self.world.bounds.height - 3 * TILE_SIZE,
            };
            self.world.replace_finish(edge);
        }

        self.world.bounds.width = self.world.cursor_x;
        map.spawn_point = self.world.spawn_point.unwrap_or_default();
        info!(
            chunks = self.world.chunks.len(),
            gates = map.gates.len(),
            width = self.world.bounds.width,
            "map assembled"
        );
        map
    }

    /// Appends one extension chunk after the current end of the world.
    pub fn append_chunk(&mut self, template_id: &str) -> Result<AssembledChunk, AssemblyError> {
        if !self.source.is_loaded(template_id) {
            self.source.load_template(template_id)?;
        }

        // Assembled as a middle chunk; the finish moves only once placement succeeded.
        let chunk = self.assemble_chunk(
            template_id,
            false,
            false,
            InstanceIndex::Extension,
            RunMode::Assessment,
            &CollectedIds::default(),
        )?;

        if let Some(template) = self.source.template(template_id).cloned() {
            let chunk_x = self.world.chunks[chunk.chunk_index].x_offset;
            let exit = self.exit_or_edge(&template, chunk_x);
            self.world.replace_finish(exit);
        }
        self.world.bounds.width = self.world.cursor_x;

        info!(template_id, chunk_index = chunk.chunk_index, gate = ?chunk.gate, "chunk appended");
        Ok(chunk)
    }

    fn place_tiles(
        &mut self,
        template: &ChunkTemplate,
        chunk_index: usize,
        chunk_x: i32,
        assembled: &mut AssembledChunk,
    ) {
        let tile_size = TILE_SIZE;
        for layer in template.layers.iter().filter(|layer| !layer.auxiliary) {
            for tile in &layer.tiles {
                let pos = Pos { x: chunk_x + tile.col * tile_size, y: tile.row * tile_size };
                if tile.hazard {
                    assembled.hazard_tiles.push(self.world.tiles.len());
                }
                self.world.tiles.push(PlacedTile {
                    pos,
                    solid: tile.collidable,
                    hazard: tile.hazard,
                    chunk_index,
                });
            }
        }
    }

    fn exit_or_edge(&self, template: &ChunkTemplate, chunk_x: i32) -> Pos {
        match template.exit {
            Some(exit) => exit.offset_x(chunk_x),
            None => {
                warn!(template_id = %template.id, "template has no exit marker; using right edge");
                let fallback = fallback_entry(chunk_x, self.world.bounds.height);
                Pos { x: chunk_x + template.width - TILE_SIZE, y: fallback.y }
            }
        }
    }
}

#[cfg(test)]
mod tests;
