//! Content-addressed coin and egg spawning.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::content::ChunkTemplate;
use crate::seed::{RunSeed, derive_scoped_seed};
use crate::types::{CollectibleKind, EggKind, PickupId};
use crate::world::{InstanceIndex, Pickup, World};

/// Identities the learner already picked up; these are never spawned again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedIds {
    pub coins: BTreeSet<String>,
    pub eggs: BTreeSet<String>,
}

impl CollectedIds {
    pub fn contains(&self, kind: CollectibleKind, identity: &str) -> bool {
        match kind {
            CollectibleKind::Coin => self.coins.contains(identity),
            CollectibleKind::Egg => self.eggs.contains(identity),
        }
    }

    /// Returns `false` when the identity was already recorded.
    pub fn insert(&mut self, kind: CollectibleKind, identity: String) -> bool {
        match kind {
            CollectibleKind::Coin => self.coins.insert(identity),
            CollectibleKind::Egg => self.eggs.insert(identity),
        }
    }
}

pub fn collectible_identity(template_id: &str, instance: InstanceIndex, local_id: u32) -> String {
    format!("{template_id}_{instance}_{local_id}")
}

#[derive(Default)]
pub(super) struct Spawned {
    pub(super) coins: Vec<PickupId>,
    pub(super) eggs: Vec<PickupId>,
}

/// Where the chunk owning the markers was placed.
#[derive(Clone, Copy)]
pub(super) struct Placement {
    pub(super) chunk_index: usize,
    pub(super) chunk_x: i32,
    pub(super) instance: InstanceIndex,
}

pub(super) fn spawn_collectibles(
    world: &mut World,
    template: &ChunkTemplate,
    placement: Placement,
    collected: &CollectedIds,
    config: &RunConfig,
    seed: &RunSeed,
) -> Spawned {
    let Placement { chunk_index, chunk_x, instance } = placement;
    let mut spawned = Spawned::default();
    let coin_value = config.coin_values.for_tier(template.tier);

    for marker in &template.coin_spawns {
        let identity = collectible_identity(&template.id, instance, marker.id);
        if collected.contains(CollectibleKind::Coin, &identity) {
            debug!(%identity, "coin already collected");
            continue;
        }
        let id = world.pickups.insert(Pickup {
            identity,
            kind: CollectibleKind::Coin,
            egg_kind: None,
            value: coin_value,
            pos: marker.pos.offset_x(chunk_x),
            enabled: true,
            chunk_index,
        });
        spawned.coins.push(id);
    }

    for marker in &template.egg_spawns {
        let identity = collectible_identity(&template.id, instance, marker.id);
        if collected.contains(CollectibleKind::Egg, &identity) {
            debug!(%identity, "egg already collected");
            continue;
        }
        let egg_kind = roll_egg(config, seed, &identity);
        let id = world.pickups.insert(Pickup {
            value: config.egg_table.value_of(egg_kind),
            identity,
            kind: CollectibleKind::Egg,
            egg_kind: Some(egg_kind),
            pos: marker.pos.offset_x(chunk_x),
            enabled: true,
            chunk_index,
        });
        spawned.eggs.push(id);
    }

    spawned
}

/// Seeded by the identity so the same egg rolls the same kind on every spawn.
pub(crate) fn roll_egg(config: &RunConfig, seed: &RunSeed, identity: &str) -> EggKind {
    let mut rng = derive_scoped_seed(seed, identity).rng();
    let table = config.egg_table.weighted();
    match rng.weighted_choice(&table) {
        Ok(kind) => *kind,
        Err(error) => {
            warn!(%error, identity, "egg table has no weight; spawning a common egg");
            EggKind::Common
        }
    }
}
