//! Seeded chunk pools drawn by cyclic cursor.
//! Each tier's pool is shuffled exactly once per seed; cursors only move on real draws, so the
//! stream is reproducible from the seed plus the sequence of requested tiers.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::content::keys;
use crate::rng::Prng;
use crate::seed::RunSeed;
use crate::types::{Question, Tier};

pub type ChunkPools = BTreeMap<Tier, Vec<String>>;

#[derive(Clone, Debug)]
pub struct ChunkSequencer {
    rng: Prng,
    source_pools: ChunkPools,
    shuffled: ChunkPools,
    cursors: BTreeMap<Tier, usize>,
    forced_template: Option<String>,
}

impl ChunkSequencer {
    pub fn new(seed: &RunSeed, pools: ChunkPools) -> Self {
        let mut sequencer = Self {
            rng: seed.rng(),
            source_pools: pools,
            shuffled: BTreeMap::new(),
            cursors: BTreeMap::new(),
            forced_template: None,
        };
        sequencer.shuffle_pools();
        sequencer
    }

    pub fn with_forced_template(mut self, template_id: Option<String>) -> Self {
        self.forced_template = template_id;
        self
    }

    fn shuffle_pools(&mut self) {
        self.shuffled.clear();
        self.cursors.clear();
        for tier in Tier::ALL {
            let pool = self.source_pools.get(&tier).map(Vec::as_slice).unwrap_or_default();
            self.shuffled.insert(tier, self.rng.shuffle(pool));
            self.cursors.insert(tier, 0);
        }
    }

    /// Re-shuffles from the original seed and rewinds every cursor.
    pub fn reset(&mut self) {
        self.rng.reset();
        self.shuffle_pools();
    }

    pub fn seed_value(&self) -> u32 {
        self.rng.seed()
    }

    pub fn shuffled_pool(&self, tier: Tier) -> &[String] {
        self.shuffled.get(&tier).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn pool_len(&self, tier: Tier) -> usize {
        self.shuffled_pool(tier).len()
    }

    pub fn next_chunk_for_difficulty(&mut self, tier: Tier) -> String {
        let pool = self.shuffled.get(&tier).map(Vec::as_slice).unwrap_or_default();
        if pool.is_empty() {
            warn!(%tier, fallback = keys::DEFAULT_TEMPLATE, "chunk pool is empty");
            return keys::DEFAULT_TEMPLATE.to_string();
        }
        let cursor = self.cursors.entry(tier).or_insert(0);
        let template_id = pool[*cursor % pool.len()].clone();
        *cursor += 1;
        template_id
    }

    /// The template the next draw for `tier` would return. Never moves the cursor.
    pub fn peek_chunk_for_difficulty(&self, tier: Tier) -> Option<&str> {
        let pool = self.shuffled_pool(tier);
        if pool.is_empty() {
            return None;
        }
        let cursor = self.cursors.get(&tier).copied().unwrap_or(0);
        Some(pool[cursor % pool.len()].as_str())
    }

    /// One chunk per question, drawn in question order.
    pub fn sequence_from_questions(&mut self, questions: &[Question]) -> Vec<String> {
        let mut sequence: Vec<String> = questions
            .iter()
            .map(|question| {
                let tier = resolve_tier(question);
                self.next_chunk_for_difficulty(tier)
            })
            .collect();
        self.apply_forced_template(&mut sequence);
        sequence
    }

    /// Quiz-less fallback: every tier's full pool, shuffled, concatenated easiest first.
    pub fn random_sequence(&mut self) -> Vec<String> {
        let mut sequence = Vec::new();
        for tier in Tier::ALL {
            let pool = self.source_pools.get(&tier).map(Vec::as_slice).unwrap_or_default();
            sequence.extend(self.rng.shuffle(pool));
        }
        self.apply_forced_template(&mut sequence);
        sequence
    }

    fn apply_forced_template(&self, sequence: &mut Vec<String>) {
        let Some(forced) = &self.forced_template else {
            return;
        };
        if sequence.is_empty() {
            return;
        }
        match sequence.iter().position(|id| id == forced) {
            Some(index) => {
                let moved = sequence.remove(index);
                sequence.insert(0, moved);
            }
            None => sequence[0] = forced.clone(),
        }
        debug!(template_id = %forced, "forced template placed first");
    }

    pub fn cursors(&self) -> BTreeMap<Tier, usize> {
        self.cursors.clone()
    }

    pub fn restore_cursors(&mut self, cursors: &BTreeMap<Tier, usize>) {
        for (tier, cursor) in cursors {
            self.cursors.insert(*tier, *cursor);
        }
    }
}

/// Tier declared by a question; unrecognised labels fall back to the easiest tier.
pub fn resolve_tier(question: &Question) -> Tier {
    Tier::from_label(&question.difficulty).unwrap_or_else(|| {
        warn!(
            question_id = %question.id,
            difficulty = %question.difficulty,
            "unknown difficulty, using easy tier"
        );
        Tier::Easy
    })
}
