//! Progression state machine for one run.
//! This module exists to own every piece of per-run state: the assembler and its world, the
//! chunk sequencer, the progression pointer and the event outbox. It does not simulate physics;
//! the host reports overlaps and contacts and receives typed responses and events.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::mem;

use tracing::{debug, info, warn};

use crate::assembler::{ChunkAssembler, CollectedIds};
use crate::config::RunConfig;
use crate::content::TemplateSource;
use crate::journal::{InputRecord, RunInput, ZoneRef};
use crate::seed::{RunSeed, derive_seed};
use crate::sequencer::{ChunkSequencer, resolve_tier};
use crate::snapshot::{ProgressSnapshot, SNAPSHOT_FORMAT_VERSION, SnapshotError};
use crate::types::*;
use crate::world::{World, ZoneKind};

mod death;
mod extension;
mod gates;
mod hash;
mod pickups;
mod scheduler;

use scheduler::{Deferred, Scheduler};

/// What the host needs to build its scene after [`Run::start`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunLayout {
    pub spawn_point: Pos,
    pub gates: Vec<GateId>,
    pub bonus_pads: Vec<ZoneId>,
    pub coins: Vec<PickupId>,
    pub eggs: Vec<PickupId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    Snapshot(SnapshotError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot(error) => write!(f, "cannot resume run: {error}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(error) => Some(error),
        }
    }
}

impl From<SnapshotError> for RunError {
    fn from(error: SnapshotError) -> Self {
        Self::Snapshot(error)
    }
}

/// A journaled input that no longer resolves against the rebuilt world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    UnknownGate(GateId),
    UnknownBonusPad { chunk_index: usize, pad: usize },
    UnknownPickup(String),
    MissingFinish,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownGate(gate) => write!(f, "no gate with id {}", gate.0),
            Self::UnknownBonusPad { chunk_index, pad } => {
                write!(f, "chunk {chunk_index} has no bonus pad {pad}")
            }
            Self::UnknownPickup(identity) => write!(f, "no pickup with identity '{identity}'"),
            Self::MissingFinish => write!(f, "world has no finish marker"),
        }
    }
}

impl Error for InputError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub pos: Pos,
    pub health: i32,
    pub halted: bool,
}

pub struct Run {
    config: RunConfig,
    mode: RunMode,
    seed: RunSeed,
    sequencer: ChunkSequencer,
    assembler: ChunkAssembler,
    phase: RunPhase,
    outcome: Option<RunOutcome>,
    pointer: u32,
    checkpoint: Option<Checkpoint>,
    questions: Vec<Question>,
    base_question_count: usize,
    extended_chunk_log: Vec<String>,
    collected: CollectedIds,
    coin_total: u32,
    egg_total: u32,
    player: PlayerState,
    /// Gate whose question is on screen.
    pending_gate: Option<GateId>,
    /// Set between an accepted answer and its delayed resolution.
    resolving: Option<PendingResolution>,
    review_round_announced: bool,
    scheduler: Scheduler,
    events: VecDeque<RunEvent>,
    recorded: Vec<InputRecord>,
    next_input_seq: u64,
    dirty: bool,
}

impl Run {
    /// Builds the world for a fresh run, or rebuilds it from `snapshot` when one is given.
    /// A snapshot's own question sequence and mode take precedence over the arguments.
    pub fn start(
        mut source: Box<dyn TemplateSource>,
        config: RunConfig,
        questions: Option<Vec<Question>>,
        snapshot: Option<ProgressSnapshot>,
        mode: RunMode,
    ) -> Result<(Self, RunLayout), RunError> {
        if let Some(snapshot) = &snapshot {
            snapshot.validate()?;
        }

        let (mode, questions, base_question_count) = match &snapshot {
            Some(snapshot) => {
                if snapshot.mode != mode {
                    info!(requested = ?mode, stored = ?snapshot.mode, "snapshot mode wins");
                }
                (
                    snapshot.mode,
                    snapshot.active_question_sequence.clone(),
                    snapshot.base_question_count,
                )
            }
            None => {
                let questions = questions.unwrap_or_default();
                let count = questions.len();
                (mode, questions, count)
            }
        };

        let base = &questions[..base_question_count];
        let seed = if base.is_empty() {
            RunSeed::from_text(config.fallback_seed.clone())
        } else {
            derive_seed(base.iter().map(|question| question.id.as_str()))
        };

        let mut sequencer = ChunkSequencer::new(&seed, source.pools())
            .with_forced_template(config.forced_template.clone());
        let initial = if base.is_empty() {
            sequencer.random_sequence()
        } else {
            sequencer.sequence_from_questions(base)
        };

        for template_id in &initial {
            if !source.is_loaded(template_id)
                && let Err(error) = source.load_template(template_id)
            {
                warn!(%error, "template preload failed");
            }
        }

        let collected = snapshot
            .as_ref()
            .map(|snapshot| CollectedIds {
                coins: snapshot.collected_coin_ids.clone(),
                eggs: snapshot.collected_egg_ids.clone(),
            })
            .unwrap_or_default();

        let mut assembler = ChunkAssembler::new(source, config.clone(), seed.clone());
        let map = assembler.assemble_map(&initial, &collected, mode);
        let mut layout = RunLayout {
            spawn_point: map.spawn_point,
            gates: map.gates,
            bonus_pads: map.bonus_pads,
            coins: map.coins,
            eggs: map.eggs,
        };

        let mut extended_chunk_log = Vec::new();
        if let Some(snapshot) = &snapshot {
            sequencer.restore_cursors(&snapshot.pool_cursors);
            for template_id in &snapshot.extended_chunk_log {
                match assembler.append_chunk(template_id) {
                    Ok(chunk) => {
                        layout.gates.extend(chunk.gate);
                        layout.bonus_pads.extend(chunk.bonus_pads);
                    }
                    Err(error) => warn!(%error, template_id = %template_id, "logged extension lost"),
                }
            }
            extended_chunk_log = snapshot.extended_chunk_log.clone();
        }

        let max_health = config.max_health;
        let mut run = Self {
            config,
            mode,
            seed,
            sequencer,
            assembler,
            phase: RunPhase::Running,
            outcome: None,
            pointer: 0,
            checkpoint: None,
            questions,
            base_question_count,
            extended_chunk_log,
            collected,
            coin_total: 0,
            egg_total: 0,
            player: PlayerState { pos: layout.spawn_point, health: max_health, halted: false },
            pending_gate: None,
            resolving: None,
            review_round_announced: false,
            scheduler: Scheduler::default(),
            events: VecDeque::new(),
            recorded: Vec::new(),
            next_input_seq: 0,
            dirty: false,
        };

        let pending = snapshot.as_ref().and_then(|snapshot| snapshot.pending_resolution);
        if let Some(snapshot) = snapshot {
            run.pointer = snapshot.progression_pointer.min(run.gate_count());
            run.checkpoint = snapshot.checkpoint;
            run.coin_total = snapshot.coin_total;
            run.egg_total = snapshot.egg_total;
            run.player.pos = snapshot.player_position;
            run.review_round_announced = run.has_review_round()
                && run.pointer as usize >= run.base_question_count;
        }
        run.arm_current_gate();
        if let Some(pending) = pending {
            run.reopen_resolution(pending);
        }

        info!(
            seed = %run.seed,
            mode = ?run.mode,
            gates = run.gate_count(),
            pointer = run.pointer,
            "run started"
        );
        Ok((run, layout))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn seed(&self) -> &RunSeed {
        &self.seed
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn pointer(&self) -> u32 {
        self.pointer
    }

    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint
    }

    pub fn gate_count(&self) -> u32 {
        self.world().gate_count()
    }

    pub fn pending_gate(&self) -> Option<GateId> {
        self.pending_gate
    }

    pub fn is_resolving(&self) -> bool {
        self.resolving.is_some()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn base_question_count(&self) -> usize {
        self.base_question_count
    }

    pub fn extended_chunk_log(&self) -> &[String] {
        &self.extended_chunk_log
    }

    pub fn collected(&self) -> &CollectedIds {
        &self.collected
    }

    pub fn coin_total(&self) -> u32 {
        self.coin_total
    }

    pub fn egg_total(&self) -> u32 {
        self.egg_total
    }

    pub fn player(&self) -> PlayerState {
        self.player
    }

    pub fn current_tick(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn world(&self) -> &World {
        self.assembler.world()
    }

    pub fn sequencer(&self) -> &ChunkSequencer {
        &self.sequencer
    }

    pub fn drain_events(&mut self) -> Vec<RunEvent> {
        self.events.drain(..).collect()
    }

    /// Inputs accepted since the last drain, ready to be appended to a journal.
    pub fn drain_inputs(&mut self) -> Vec<InputRecord> {
        mem::take(&mut self.recorded)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            seed: self.seed.as_str().to_string(),
            progression_pointer: self.pointer,
            checkpoint: self.checkpoint,
            active_question_sequence: self.questions.clone(),
            base_question_count: self.base_question_count,
            extended_chunk_log: self.extended_chunk_log.clone(),
            collected_coin_ids: self.collected.coins.clone(),
            collected_egg_ids: self.collected.eggs.clone(),
            coin_total: self.coin_total,
            egg_total: self.egg_total,
            player_position: self.player.pos,
            mode: self.mode,
            pool_cursors: self.sequencer.cursors(),
            pending_resolution: self.resolving,
        }
    }

    /// Advances the frame clock and runs every continuation that came due.
    pub fn tick(&mut self) {
        self.record(RunInput::Ticks { count: 1 });
        for deferred in self.scheduler.advance() {
            match deferred {
                Deferred::ResolveGate { gate, correct } => self.resolve_gate(gate, correct),
            }
        }
        self.flush_save();
    }

    /// Re-applies a journaled input through the same entry points the host uses.
    pub fn apply_input(&mut self, input: &RunInput) -> Result<(), InputError> {
        match input {
            RunInput::Ticks { count } => {
                for _ in 0..*count {
                    self.tick();
                }
            }
            RunInput::ZoneOverlap { zone } => {
                let id = self.resolve_zone(*zone)?;
                self.on_zone_overlap(id);
            }
            RunInput::Pickup { identity } => {
                let id = self
                    .world()
                    .find_pickup(identity)
                    .ok_or_else(|| InputError::UnknownPickup(identity.clone()))?;
                self.on_pickup_overlap(id);
            }
            RunInput::TileContact { tile } => {
                self.on_tile_contact(*tile);
            }
            RunInput::PlayerMoved { pos } => self.on_player_moved(*pos),
            RunInput::Answer { correct, time_left } => {
                self.on_answer(AnswerReceived { correct: *correct, time_left: *time_left });
            }
        }
        Ok(())
    }

    fn resolve_zone(&self, zone: ZoneRef) -> Result<ZoneId, InputError> {
        let world = self.world();
        let gate = |gate: GateId| world.gate(gate).ok_or(InputError::UnknownGate(gate));
        match zone {
            ZoneRef::Trigger { gate: id } => Ok(gate(id)?.trigger),
            ZoneRef::Pass { gate: id } => Ok(gate(id)?.pass),
            ZoneRef::Fail { gate: id } => Ok(gate(id)?.fail),
            ZoneRef::BonusPad { chunk_index, pad } => world
                .chunks()
                .get(chunk_index)
                .and_then(|chunk| chunk.bonus_pads.get(pad).copied())
                .ok_or(InputError::UnknownBonusPad { chunk_index, pad }),
            ZoneRef::Finish => world.finish_zone().ok_or(InputError::MissingFinish),
        }
    }

    fn zone_ref(&self, id: ZoneId) -> Option<ZoneRef> {
        let world = self.world();
        let zone = world.zone(id)?;
        Some(match zone.kind {
            ZoneKind::GateTrigger(gate) => ZoneRef::Trigger { gate },
            ZoneKind::GatePass(gate) => ZoneRef::Pass { gate },
            ZoneKind::GateFail(gate) => ZoneRef::Fail { gate },
            ZoneKind::Finish => ZoneRef::Finish,
            ZoneKind::BonusPad => world.chunks().iter().find_map(|chunk| {
                let pad = chunk.bonus_pads.iter().position(|pad| *pad == id)?;
                Some(ZoneRef::BonusPad { chunk_index: chunk.index, pad })
            })?,
        })
    }

    fn record(&mut self, input: RunInput) {
        let tick_boundary = self.scheduler.now();
        if let RunInput::Ticks { count: 1 } = input
            && let Some(InputRecord { input: RunInput::Ticks { count }, .. }) =
                self.recorded.last_mut()
        {
            *count += 1;
            return;
        }
        self.recorded.push(InputRecord { seq: self.next_input_seq, tick_boundary, input });
        self.next_input_seq += 1;
    }

    fn emit(&mut self, event: RunEvent) {
        debug!(?event, "run event");
        self.events.push_back(event);
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Emits at most one save per public call.
    fn flush_save(&mut self) {
        if self.dirty {
            self.dirty = false;
            let snapshot = self.snapshot();
            self.events.push_back(RunEvent::SaveProgress(Box::new(snapshot)));
        }
    }

    fn has_review_round(&self) -> bool {
        self.questions.len() > self.base_question_count
    }

    /// Tier behind `gate`: its question's tier when it has one, otherwise its template's.
    fn gate_tier(&self, gate: GateId) -> Option<Tier> {
        if let Some(question) = self.questions.get(gate.index()) {
            return Some(resolve_tier(question));
        }
        self.world().gate(gate).map(|quiz_gate| quiz_gate.tier)
    }

    fn current_gate(&self) -> Option<GateId> {
        (self.pointer < self.gate_count()).then_some(GateId(self.pointer))
    }

    fn arm_current_gate(&mut self) {
        let gate = self.current_gate();
        self.assembler.world_mut().arm_only(gate);
    }

    fn end_run(&mut self, outcome: RunOutcome) {
        self.phase = RunPhase::GameOver;
        self.outcome = Some(outcome);
        self.pending_gate = None;
        self.resolving = None;
        self.player.halted = true;
        self.scheduler.clear();
        self.assembler.world_mut().arm_only(None);
        info!(?outcome, coins = self.coin_total, pointer = self.pointer, "run over");
        self.emit(RunEvent::RunCompleted { final_coin_total: self.coin_total, outcome });
        self.mark_dirty();
    }
}
