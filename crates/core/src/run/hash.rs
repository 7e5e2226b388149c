//! Stable run fingerprint for deterministic verification.
//! This module exists to keep hashing concerns separate from the state machine.
//! It does not own replay execution or journal persistence policies.

use std::hash::Hasher;

use xxhash_rust::xxh3::Xxh3;

use super::*;

impl Run {
    pub fn snapshot_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.write_u32(self.seed.value());
        hasher.write_u64(self.current_tick());
        hasher.write_u8(match self.mode {
            RunMode::Practice => 0,
            RunMode::Assessment => 1,
        });
        hasher.write_u8(match self.phase {
            RunPhase::Running => 0,
            RunPhase::WaitingForQuiz => 1,
            RunPhase::GameOver => 2,
        });
        hasher.write_u8(match self.outcome {
            None => 0,
            Some(RunOutcome::Completed) => 1,
            Some(RunOutcome::TimeExpired) => 2,
        });
        hasher.write_u32(self.pointer);
        hasher.write_u32(self.gate_count());
        hasher.write_i32(self.world().cursor_x());
        if let Some(checkpoint) = self.checkpoint {
            hasher.write_u32(checkpoint.gate_index);
            hasher.write_i32(checkpoint.respawn_x);
            hasher.write_i32(checkpoint.respawn_y);
        }
        for question in &self.questions {
            hasher.write(question.id.as_bytes());
            hasher.write_u8(0xff);
        }
        for template_id in &self.extended_chunk_log {
            hasher.write(template_id.as_bytes());
            hasher.write_u8(0xff);
        }
        for identity in self.collected.coins.iter().chain(self.collected.eggs.iter()) {
            hasher.write(identity.as_bytes());
            hasher.write_u8(0xff);
        }
        hasher.write_u32(self.coin_total);
        hasher.write_u32(self.egg_total);
        hasher.write_i32(self.player.pos.x);
        hasher.write_i32(self.player.pos.y);
        hasher.write_i32(self.player.health);
        if let Some(pending) = self.resolving {
            hasher.write_u32(pending.gate.0);
            hasher.write_u8(u8::from(pending.correct));
        }
        for (tier, cursor) in self.sequencer.cursors() {
            hasher.write_u8(tier as u8);
            hasher.write_u64(cursor as u64);
        }
        hasher.finish()
    }
}
