use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use quizrun_core::journal_file::JournalWriter;
use quizrun_core::snapshot_file::SnapshotFile;
use quizrun_core::{
    AnswerReceived, DriveStep, GateId, HeadlessDriver, Question, Run, RunEvent, RunJournal,
    RunMode,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tools::{
    ModeArg, default_data_path, init_tracing, load_config, load_library, load_questions,
    unix_time_ms,
};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AnswerArg {
    Correct,
    Wrong,
    /// Wrong the first time a question is asked, right afterwards
    FirstTryWrong,
    Random,
}

#[derive(Parser)]
#[command(author, version, about = "Play a scripted run headlessly", long_about = None)]
struct Args {
    /// JSON question list; a quiz-less free-play run when omitted
    #[arg(short, long)]
    questions: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = ModeArg::Practice)]
    mode: ModeArg,
    /// TOML run config
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory of template JSON files
    #[arg(short, long)]
    templates: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = AnswerArg::FirstTryWrong)]
    answers: AnswerArg,
    #[arg(long, default_value_t = 7)]
    answer_seed: u64,
    /// Resume from this snapshot file instead of starting fresh
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Where save events are written; the platform data directory by default
    #[arg(long)]
    save: Option<PathBuf>,
    #[arg(long)]
    no_save: bool,
    /// Also write a hash-chained input journal here
    #[arg(short, long)]
    journal: Option<PathBuf>,
    /// Stop after this many answered gates, leaving the run resumable
    #[arg(long)]
    stop_after: Option<usize>,
    #[arg(long, default_value_t = 256)]
    max_steps: usize,
}

struct Policy {
    kind: AnswerArg,
    rng: ChaCha8Rng,
    asked: BTreeSet<String>,
}

impl Policy {
    fn answer(&mut self, gate: GateId, question: Option<&Question>) -> AnswerReceived {
        let correct = match self.kind {
            AnswerArg::Correct => true,
            AnswerArg::Wrong => false,
            AnswerArg::FirstTryWrong => {
                let key = question.map_or_else(|| format!("gate-{}", gate.0), |q| q.id.clone());
                !self.asked.insert(key)
            }
            AnswerArg::Random => self.rng.next_u64() % 3 != 0,
        };
        AnswerReceived { correct, time_left: 20.0 }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let library = load_library(args.templates.as_deref())?;
    let questions = args.questions.as_deref().map(load_questions).transpose()?;
    let snapshot = args
        .resume
        .as_deref()
        .map(|path| {
            SnapshotFile::load(path)
                .with_context(|| format!("Failed to load snapshot: {}", path.display()))
        })
        .transpose()?
        .map(|file| file.snapshot);
    let save_path = if args.no_save {
        None
    } else {
        args.save.clone().or_else(|| default_data_path("progress.json"))
    };

    let mode: RunMode = snapshot.as_ref().map_or(args.mode.into(), |snapshot| snapshot.mode);
    let (mut run, layout) = Run::start(
        Box::new(library.clone()),
        config.clone(),
        questions.clone(),
        snapshot.clone(),
        mode,
    )
    .map_err(|error| anyhow!("Run failed to start: {error}"))?;
    info!(
        seed = run.seed().as_str(),
        gates = layout.gates.len(),
        coins = layout.coins.len(),
        eggs = layout.eggs.len(),
        "run started"
    );

    let mut writer = match &args.journal {
        Some(path) => {
            let mut header = RunJournal::new(mode, questions, config, library.content_hash());
            header.resume_from = snapshot;
            Some(
                JournalWriter::create(path, &header)
                    .with_context(|| format!("Failed to create journal: {}", path.display()))?,
            )
        }
        None => None,
    };

    let mut policy = Policy {
        kind: args.answers,
        rng: ChaCha8Rng::seed_from_u64(args.answer_seed),
        asked: BTreeSet::new(),
    };
    let mut answer = |gate: GateId, question: Option<&Question>| policy.answer(gate, question);
    let mut answered = 0;
    for _ in 0..args.max_steps {
        let step = HeadlessDriver::new(&mut run).step(&mut answer);
        if let Some(writer) = writer.as_mut() {
            writer.append_all(&run.drain_inputs()).context("Failed to append journal")?;
        }
        let mut saved = false;
        for event in run.drain_events() {
            match event {
                RunEvent::SaveProgress(snapshot) => {
                    saved = true;
                    if let Some(path) = &save_path {
                        SnapshotFile::new(*snapshot, run.snapshot_hash(), unix_time_ms())
                            .write_atomic(path)
                            .with_context(|| format!("Failed to save: {}", path.display()))?;
                    }
                }
                other => println!("{other:?}"),
            }
        }
        if let (true, Some(writer)) = (saved, writer.as_mut()) {
            writer.record_save(&run).context("Failed to mark save in journal")?;
        }

        match step {
            DriveStep::Answered { .. } => answered += 1,
            DriveStep::Finished(_) | DriveStep::Stalled => break,
        }
        if args.stop_after.is_some_and(|limit| answered >= limit) {
            println!("Stopped after {answered} answers; resume with --resume.");
            break;
        }
    }

    println!("Mode: {:?}", run.mode());
    println!("Seed: {}", run.seed().as_str());
    println!("Outcome: {:?}", run.outcome());
    println!("Gates cleared: {}/{}", run.pointer(), run.gate_count());
    println!("Extensions: {:?}", run.extended_chunk_log());
    println!("Coins: {}  Eggs: {}", run.coin_total(), run.egg_total());
    println!("Final Tick: {}", run.current_tick());
    println!("Snapshot Hash: 0x{:016x}", run.snapshot_hash());
    if let Some(path) = &save_path {
        println!("Progress: {}", path.display());
    }

    Ok(())
}
