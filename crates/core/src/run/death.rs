//! Hazard contact, falling out of the world and the respawn rules per mode.

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum DeathCause {
    Hazard,
    FellOut,
    FailedGate,
}

impl Run {
    /// Returns whether the contact killed the player.
    pub fn on_tile_contact(&mut self, tile: usize) -> bool {
        self.record(RunInput::TileContact { tile });
        let hazard = self.world().tile(tile).is_some_and(|placed| placed.hazard);
        let died = hazard && self.die(DeathCause::Hazard);
        self.flush_save();
        died
    }

    pub fn on_player_moved(&mut self, pos: Pos) {
        self.record(RunInput::PlayerMoved { pos });
        if self.phase == RunPhase::GameOver {
            return;
        }
        self.player.pos = pos;
        let floor = self.world().bounds().height + self.config.fall_margin;
        if pos.y > floor {
            self.die(DeathCause::FellOut);
        }
        self.flush_save();
    }

    /// Runs the death procedure. Only a running player can die; a halted player waiting on
    /// a question is out of reach.
    pub(super) fn die(&mut self, cause: DeathCause) -> bool {
        if self.phase != RunPhase::Running {
            debug!(?cause, phase = ?self.phase, "death ignored");
            return false;
        }

        match self.mode {
            RunMode::Practice => self.respawn_at_checkpoint(),
            RunMode::Assessment => self.respawn_at_next_gate(),
        }
        info!(?cause, pointer = self.pointer, pos = ?self.player.pos, "player respawned");
        self.mark_dirty();
        true
    }

    fn respawn_at_checkpoint(&mut self) {
        let spawn = self.world().spawn_point().unwrap_or_default();
        let checkpoint = self.checkpoint.unwrap_or(Checkpoint {
            gate_index: 0,
            respawn_x: spawn.x,
            respawn_y: spawn.y,
        });

        self.player.health = self.config.max_health;
        self.player.pos = checkpoint.respawn_pos();
        self.pointer = checkpoint.gate_index.min(self.gate_count());
        self.arm_current_gate();
        self.assembler.world_mut().reset_bonus_pads();
    }

    fn respawn_at_next_gate(&mut self) {
        self.pointer = (self.pointer + 1).min(self.gate_count());
        self.arm_current_gate();

        let world = self.world();
        let chunk_index = match world.gate(GateId(self.pointer)) {
            Some(gate) => Some(gate.chunk_index),
            None => world.chunks().len().checked_sub(1),
        };
        let respawn = chunk_index
            .and_then(|index| world.chunk_start(index))
            .or(world.spawn_point())
            .unwrap_or_default();
        self.player.pos = respawn;
        self.maybe_start_review_round();
    }
}
