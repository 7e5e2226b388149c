//! Scripted stand-in for the physics host.
//! This module exists so tests and tools can play a run from gate to gate without a renderer:
//! it teleports the player onto zones and pickups and reports the overlaps a real host would.
//! It does not model movement, collision response or launch impulses.

use tracing::debug;

use crate::run::Run;
use crate::types::{AnswerReceived, GateId, Pos, Question, RunOutcome, RunPhase, ZoneResponse};

/// Decides how the quiz dialog answers a question.
pub trait AnswerPolicy {
    fn answer(&mut self, gate: GateId, question: Option<&Question>) -> AnswerReceived;
}

impl<F> AnswerPolicy for F
where
    F: FnMut(GateId, Option<&Question>) -> AnswerReceived,
{
    fn answer(&mut self, gate: GateId, question: Option<&Question>) -> AnswerReceived {
        self(gate, question)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveStep {
    Answered { gate: GateId, correct: bool },
    Finished(RunOutcome),
    /// Nothing the driver can do moves the run forward.
    Stalled,
}

pub struct HeadlessDriver<'a> {
    run: &'a mut Run,
    collect_pickups: bool,
}

impl<'a> HeadlessDriver<'a> {
    pub fn new(run: &'a mut Run) -> Self {
        Self { run, collect_pickups: true }
    }

    pub fn without_pickups(mut self) -> Self {
        self.collect_pickups = false;
        self
    }

    pub fn run(&self) -> &Run {
        self.run
    }

    pub fn run_mut(&mut self) -> &mut Run {
        self.run
    }

    fn ground_y(&self) -> i32 {
        self.run.world().spawn_point().map_or(0, |spawn| spawn.y)
    }

    /// Touches every enabled pickup placed before the next armed gate.
    pub fn collect_reachable_pickups(&mut self) -> usize {
        let limit = self
            .run
            .world()
            .gate(GateId(self.run.pointer()))
            .and_then(|gate| self.run.world().zone(gate.trigger))
            .map_or(i32::MAX, |zone| zone.rect.x);
        let reachable: Vec<_> = self
            .run
            .world()
            .pickups()
            .filter(|(_, pickup)| pickup.enabled && pickup.pos.x < limit)
            .map(|(id, pickup)| (id, pickup.pos))
            .collect();

        let mut collected = 0;
        for (id, pos) in reachable {
            self.run.on_player_moved(pos);
            if self.run.on_pickup_overlap(id) {
                collected += 1;
            }
        }
        collected
    }

    /// Moves onto the armed trigger. Returns the gate when its question was requested.
    pub fn walk_to_current_gate(&mut self) -> Option<GateId> {
        if self.run.phase() != RunPhase::Running {
            return None;
        }
        let gate = GateId(self.run.pointer());
        let trigger = self.run.world().gate(gate)?.trigger;
        let x = self.run.world().zone(trigger)?.rect.x;
        self.run.on_player_moved(Pos { x, y: self.ground_y() });
        (self.run.on_zone_overlap(trigger) == ZoneResponse::Halt).then_some(gate)
    }

    /// Delivers `answer` and ticks until the gate has resolved.
    pub fn answer_and_settle(&mut self, answer: AnswerReceived) -> bool {
        if !self.run.on_answer(answer) {
            return false;
        }
        self.wait_for_resolution();
        true
    }

    /// Ticks out an open pass or fail zone, including one reopened by a resumed snapshot.
    pub fn wait_for_resolution(&mut self) {
        let budget = self.run.config().gate_resolve_delay_ticks + 1;
        for _ in 0..budget {
            if !self.run.is_resolving() {
                break;
            }
            self.run.tick();
        }
    }

    pub fn walk_to_finish(&mut self) -> ZoneResponse {
        let Some(finish) = self.run.world().finish_zone() else {
            return ZoneResponse::Ignored;
        };
        if let Some(x) = self.run.world().zone(finish).map(|zone| zone.rect.x) {
            self.run.on_player_moved(Pos { x, y: self.ground_y() });
        }
        self.run.on_zone_overlap(finish)
    }

    /// Jumps onto the first hazard tile ahead of the player.
    pub fn touch_hazard(&mut self) -> bool {
        let player_x = self.run.player().pos.x;
        let hazard = self
            .run
            .world()
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, tile)| tile.hazard)
            .find(|(_, tile)| tile.pos.x >= player_x)
            .or_else(|| self.run.world().tiles().iter().enumerate().find(|(_, tile)| tile.hazard))
            .map(|(index, tile)| (index, tile.pos));
        let Some((index, pos)) = hazard else {
            return false;
        };
        self.run.on_player_moved(pos);
        self.run.on_tile_contact(index)
    }

    pub fn fall_out(&mut self) {
        let x = self.run.player().pos.x;
        let below = self.run.world().bounds().height + self.run.config().fall_margin + 1;
        self.run.on_player_moved(Pos { x, y: below });
    }

    pub fn step(&mut self, policy: &mut dyn AnswerPolicy) -> DriveStep {
        if let Some(outcome) = self.run.outcome() {
            return DriveStep::Finished(outcome);
        }
        self.wait_for_resolution();
        if self.collect_pickups {
            self.collect_reachable_pickups();
        }
        if self.run.pointer() >= self.run.gate_count() {
            return match self.walk_to_finish() {
                ZoneResponse::Finished => DriveStep::Finished(RunOutcome::Completed),
                _ => DriveStep::Stalled,
            };
        }

        let Some(gate) = self.walk_to_current_gate() else {
            return DriveStep::Stalled;
        };
        let question = self.run.questions().get(gate.index()).cloned();
        let answer = policy.answer(gate, question.as_ref());
        self.answer_and_settle(answer);
        debug!(gate = gate.0, correct = answer.correct, pointer = self.run.pointer(), "gate driven");

        match self.run.outcome() {
            Some(outcome) => DriveStep::Finished(outcome),
            None => DriveStep::Answered { gate, correct: answer.correct },
        }
    }

    /// Steps until the run ends, stalls, or `max_steps` is exhausted.
    pub fn play_to_end(
        &mut self,
        policy: &mut dyn AnswerPolicy,
        max_steps: usize,
    ) -> Option<RunOutcome> {
        for _ in 0..max_steps {
            match self.step(policy) {
                DriveStep::Finished(outcome) => return Some(outcome),
                DriveStep::Stalled => return None,
                DriveStep::Answered { .. } => {}
            }
        }
        None
    }
}
