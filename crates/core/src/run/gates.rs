//! Zone overlaps, answers and delayed gate resolution.

use super::death::DeathCause;
use super::*;
use crate::config::Impulse;
use crate::world::QuizGate;

impl Run {
    /// Reacts to the physics host reporting that the player entered `zone`.
    pub fn on_zone_overlap(&mut self, zone: ZoneId) -> ZoneResponse {
        if let Some(zone_ref) = self.zone_ref(zone) {
            self.record(RunInput::ZoneOverlap { zone: zone_ref });
        }
        let response = self.handle_zone_overlap(zone);
        self.flush_save();
        response
    }

    fn handle_zone_overlap(&mut self, id: ZoneId) -> ZoneResponse {
        let Some(zone) = self.world().zone(id).cloned() else {
            debug!(?id, "overlap with unknown zone");
            return ZoneResponse::Ignored;
        };
        if self.phase == RunPhase::GameOver {
            return ZoneResponse::Ignored;
        }

        match zone.kind {
            ZoneKind::GateTrigger(gate) => self.enter_gate(id, gate, zone.active),
            ZoneKind::GatePass(_) if zone.active => {
                let Impulse { vx, vy } = self.config.pass_launch;
                ZoneResponse::Launch { vx, vy }
            }
            ZoneKind::GateFail(_) if zone.active => {
                let Impulse { vx, vy } = self.config.fail_launch;
                ZoneResponse::Launch { vx, vy }
            }
            ZoneKind::GatePass(_) | ZoneKind::GateFail(_) => ZoneResponse::Ignored,
            ZoneKind::BonusPad => {
                if !zone.active || zone.used {
                    return ZoneResponse::Ignored;
                }
                if let Some(pad) = self.assembler.world_mut().zone_mut(id) {
                    pad.used = true;
                    pad.active = false;
                }
                let Impulse { vx, vy } = self.config.bonus_launch;
                ZoneResponse::Launch { vx, vy }
            }
            ZoneKind::Finish => {
                if self.phase != RunPhase::Running {
                    return ZoneResponse::Ignored;
                }
                if self.pointer < self.gate_count() {
                    debug!(pointer = self.pointer, gates = self.gate_count(), "finish reached early");
                    return ZoneResponse::Ignored;
                }
                self.end_run(RunOutcome::Completed);
                ZoneResponse::Finished
            }
        }
    }

    fn enter_gate(&mut self, trigger: ZoneId, gate: GateId, active: bool) -> ZoneResponse {
        if gate.0 != self.pointer {
            warn!(gate = gate.0, pointer = self.pointer, "stale gate trigger ignored");
            return ZoneResponse::Ignored;
        }
        if self.phase != RunPhase::Running || !active {
            debug!(gate = gate.0, phase = ?self.phase, active, "gate trigger ignored");
            return ZoneResponse::Ignored;
        }

        self.assembler.world_mut().set_zone_active(trigger, false);
        self.phase = RunPhase::WaitingForQuiz;
        self.pending_gate = Some(gate);
        self.player.halted = true;
        let question = self.questions.get(gate.index()).cloned();
        debug!(gate = gate.0, question = ?question.as_ref().map(|q| &q.id), "question requested");
        self.emit(RunEvent::QuestionRequested { gate_id: gate, question });
        ZoneResponse::Halt
    }

    /// Consumes the quiz dialog's answer. Returns whether the answer was accepted.
    pub fn on_answer(&mut self, answer: AnswerReceived) -> bool {
        self.record(RunInput::Answer { correct: answer.correct, time_left: answer.time_left });
        let accepted = self.handle_answer(answer);
        self.flush_save();
        accepted
    }

    fn handle_answer(&mut self, answer: AnswerReceived) -> bool {
        let Some(gate) = self.pending_gate else {
            debug!(phase = ?self.phase, "answer outside a quiz ignored");
            return false;
        };
        if self.phase != RunPhase::WaitingForQuiz || self.resolving.is_some() {
            debug!(gate = gate.0, "answer while resolving ignored");
            return false;
        }

        if self.mode == RunMode::Assessment && answer.time_left <= 0.0 {
            info!(gate = gate.0, "assessment time expired");
            self.end_run(RunOutcome::TimeExpired);
            return true;
        }

        let Some(quiz_gate) = self.world().gate(gate).cloned() else {
            warn!(gate = gate.0, "pending gate vanished");
            return false;
        };

        if !answer.correct && self.mode == RunMode::Assessment {
            self.extend_after_failure(gate);
        }

        self.open_resolution(&quiz_gate, answer.correct);
        info!(gate = gate.0, correct = answer.correct, "answer accepted");
        true
    }

    fn open_resolution(&mut self, quiz_gate: &QuizGate, correct: bool) {
        let zone = if correct { quiz_gate.pass } else { quiz_gate.fail };
        self.assembler.world_mut().set_zone_active(zone, true);
        self.resolving = Some(PendingResolution { gate: quiz_gate.id, correct });
        self.scheduler.schedule(
            self.config.gate_resolve_delay_ticks,
            Deferred::ResolveGate { gate: quiz_gate.id, correct },
        );
    }

    /// Puts a restored run back into the resolve delay a snapshot was taken in. Any extension
    /// the answer caused is already in the restored map, so only the delay is re-entered.
    pub(super) fn reopen_resolution(&mut self, pending: PendingResolution) {
        let Some(quiz_gate) = self.world().gate(pending.gate).cloned() else {
            warn!(gate = pending.gate.0, "pending resolution names a missing gate; dropped");
            return;
        };
        if pending.gate.0 != self.pointer {
            warn!(
                gate = pending.gate.0,
                pointer = self.pointer,
                "pending resolution is not for the current gate; dropped"
            );
            return;
        }

        self.assembler.world_mut().set_zone_active(quiz_gate.trigger, false);
        self.phase = RunPhase::WaitingForQuiz;
        self.pending_gate = Some(pending.gate);
        self.player.halted = true;
        self.open_resolution(&quiz_gate, pending.correct);
        info!(gate = pending.gate.0, correct = pending.correct, "resolution resumed");
    }

    pub(super) fn resolve_gate(&mut self, gate: GateId, correct: bool) {
        if let Some(quiz_gate) = self.world().gate(gate).cloned() {
            let world = self.assembler.world_mut();
            world.set_zone_active(quiz_gate.pass, false);
            world.set_zone_active(quiz_gate.fail, false);
        }
        self.resolving = None;
        self.pending_gate = None;
        self.phase = RunPhase::Running;
        self.player.halted = false;

        if correct {
            self.advance_pointer(gate);
        } else {
            self.die(DeathCause::FailedGate);
        }
    }

    fn advance_pointer(&mut self, cleared: GateId) {
        self.pointer = (self.pointer + 1).min(self.gate_count());
        self.arm_current_gate();
        self.mark_dirty();
        debug!(pointer = self.pointer, "gate cleared");

        if self.mode == RunMode::Practice {
            self.maybe_set_checkpoint(cleared);
        }
        self.maybe_start_review_round();
    }

    fn maybe_set_checkpoint(&mut self, cleared: GateId) {
        let next = GateId(cleared.0 + 1);
        let (Some(cleared_tier), Some(next_tier)) = (self.gate_tier(cleared), self.gate_tier(next))
        else {
            return;
        };
        if next_tier <= cleared_tier {
            return;
        }
        let Some(respawn) = self
            .world()
            .gate(next)
            .and_then(|quiz_gate| self.world().chunk_start(quiz_gate.chunk_index))
        else {
            return;
        };

        self.checkpoint =
            Some(Checkpoint { gate_index: next.0, respawn_x: respawn.x, respawn_y: respawn.y });
        info!(gate = next.0, tier = %next_tier, "checkpoint set");
        self.emit(RunEvent::CheckpointReached {
            message: format!("Checkpoint reached: {next_tier} gates ahead"),
        });
        self.mark_dirty();
    }

    pub(super) fn maybe_start_review_round(&mut self) {
        if self.review_round_announced
            || !self.has_review_round()
            || (self.pointer as usize) < self.base_question_count
        {
            return;
        }
        self.review_round_announced = true;
        let count = self.questions.len() - self.base_question_count;
        info!(count, "review round started");
        self.emit(RunEvent::ReviewRoundStarted {
            message: format!("Review round: {count} question(s) to retry"),
        });
    }
}
