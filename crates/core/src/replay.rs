use std::error::Error;
use std::fmt;
use std::iter::Peekable;
use std::slice::Iter;

use tracing::{debug, info, warn};

use crate::content::TemplateLibrary;
use crate::journal::{JOURNAL_FORMAT_VERSION, RunJournal, SaveMark};
use crate::run::{InputError, Run, RunError};
use crate::snapshot::ProgressSnapshot;
use crate::types::{RunOutcome, RunPhase};

#[derive(Debug, PartialEq)]
pub enum ReplayError {
    UnsupportedVersion { found: u16 },
    /// The journal was recorded against a different template catalog.
    ContentMismatch { expected: u64, found: u64 },
    Start(RunError),
    UnresolvableInput { seq: u64, error: InputError },
    /// The replayed run does not match a save the host recorded.
    SaveMismatch { inputs_before: u64, expected: u64, found: u64 },
    /// A save claims more inputs than the journal holds.
    SaveBeyondInputs { inputs_before: u64 },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found } => {
                write!(f, "journal format version {found} is not supported")
            }
            Self::ContentMismatch { expected, found } => write!(
                f,
                "journal content hash 0x{expected:016x} does not match catalog 0x{found:016x}"
            ),
            Self::Start(error) => write!(f, "journal run could not start: {error}"),
            Self::UnresolvableInput { seq, error } => {
                write!(f, "journal input {seq} does not apply: {error}")
            }
            Self::SaveMismatch { inputs_before, expected, found } => write!(
                f,
                "save after {inputs_before} inputs recorded 0x{expected:016x}, replay reached 0x{found:016x}"
            ),
            Self::SaveBeyondInputs { inputs_before } => {
                write!(f, "save after {inputs_before} inputs lies past the end of the journal")
            }
        }
    }
}

impl Error for ReplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Start(error) => Some(error),
            Self::UnresolvableInput { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct ReplayResult {
    pub final_phase: RunPhase,
    pub final_outcome: Option<RunOutcome>,
    pub final_snapshot_hash: u64,
    pub final_tick: u64,
    pub saves_verified: usize,
    pub snapshot: ProgressSnapshot,
}

/// Rebuilds the journaled run from `library` and re-applies every recorded input in order.
pub fn replay_journal(
    library: &TemplateLibrary,
    journal: &RunJournal,
) -> Result<ReplayResult, ReplayError> {
    let run = replay_run(library, journal)?;
    let result = ReplayResult {
        final_phase: run.phase(),
        final_outcome: run.outcome(),
        final_snapshot_hash: run.snapshot_hash(),
        final_tick: run.current_tick(),
        saves_verified: journal.saves.len(),
        snapshot: run.snapshot(),
    };
    info!(
        inputs = journal.inputs.len(),
        tick = result.final_tick,
        hash = format_args!("0x{:016x}", result.final_snapshot_hash),
        "journal replayed"
    );
    Ok(result)
}

/// Like [`replay_journal`] but hands back the live run for further inspection.
pub fn replay_run(library: &TemplateLibrary, journal: &RunJournal) -> Result<Run, ReplayError> {
    if journal.format_version != JOURNAL_FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion { found: journal.format_version });
    }
    let found = library.content_hash();
    if journal.content_hash != found {
        return Err(ReplayError::ContentMismatch { expected: journal.content_hash, found });
    }

    let (mut run, _) = Run::start(
        Box::new(library.clone()),
        journal.config.clone(),
        journal.questions.clone(),
        journal.resume_from.clone(),
        journal.mode,
    )
    .map_err(ReplayError::Start)?;

    let mut saves = journal.saves.iter().peekable();
    check_saves(&run, 0, &mut saves)?;
    for (applied, record) in (1..).zip(&journal.inputs) {
        debug!(seq = record.seq, tick = record.tick_boundary, input = ?record.input, "replay");
        run.apply_input(&record.input)
            .map_err(|error| ReplayError::UnresolvableInput { seq: record.seq, error })?;
        check_saves(&run, applied, &mut saves)?;
    }
    if let Some(save) = saves.next() {
        return Err(ReplayError::SaveBeyondInputs { inputs_before: save.inputs_before });
    }
    run.drain_events();
    Ok(run)
}

/// Compares `run` against every save recorded after exactly `applied` inputs.
fn check_saves(
    run: &Run,
    applied: u64,
    saves: &mut Peekable<Iter<'_, SaveMark>>,
) -> Result<(), ReplayError> {
    while let Some(save) = saves.next_if(|save| save.inputs_before <= applied) {
        let found = run.snapshot_hash();
        if save.snapshot_hash != found {
            warn!(inputs_before = save.inputs_before, pointer = save.pointer, "save diverged");
            return Err(ReplayError::SaveMismatch {
                inputs_before: save.inputs_before,
                expected: save.snapshot_hash,
                found,
            });
        }
    }
    Ok(())
}
