use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use quizrun_core::{
    AnswerReceived, GateId, HeadlessDriver, ProgressSnapshot, Question, Run, RunConfig, RunMode,
    RunPhase, TemplateLibrary,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tools::{init_tracing, load_config};
use tracing::debug;

const DIFFICULTIES: &[&str] = &["easy", "medium", "hard", "unknown"];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    /// Number of runs to play
    #[arg(short, long, default_value_t = 50)]
    runs: u32,
    /// Host actions per run
    #[arg(short, long, default_value_t = 400)]
    actions: u32,
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn choose<T: Clone>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p].clone()
}

fn random_questions(rng: &mut ChaCha8Rng) -> Option<Vec<Question>> {
    if rng.next_u64() % 8 == 0 {
        return None;
    }
    let count = 1 + rng.next_u64() as usize % 8;
    Some(
        (0..count)
            .map(|_| Question::new((rng.next_u64() % 1000).to_string(), choose(rng, DIFFICULTIES)))
            .collect(),
    )
}

fn check_invariants(run: &Run) -> Result<()> {
    let world = run.world();
    if run.pointer() > run.gate_count() {
        bail!("pointer {} past {} gates", run.pointer(), run.gate_count());
    }
    if world.gates().iter().enumerate().any(|(index, gate)| gate.id.index() != index) {
        bail!("gate ids are not contiguous");
    }
    let armed = world.active_triggers();
    if armed.len() > 1 {
        bail!("{} triggers armed at once", armed.len());
    }
    if run.phase() == RunPhase::Running && armed.iter().any(|gate| gate.0 != run.pointer()) {
        bail!("armed trigger does not belong to gate {}", run.pointer());
    }
    if run.mode() == RunMode::Practice && !run.extended_chunk_log().is_empty() {
        bail!("practice run extended the map");
    }
    if run.player().health > run.config().max_health {
        bail!("health above maximum");
    }
    Ok(())
}

fn check_round_trip(run: &Run, library: &TemplateLibrary) -> Result<()> {
    let snapshot = run.snapshot();
    let json = snapshot.to_json().map_err(|error| anyhow!("snapshot encode: {error}"))?;
    let decoded = ProgressSnapshot::from_json(&json)
        .map_err(|error| anyhow!("snapshot decode: {error}"))?;
    let source = Box::new(library.clone());
    let (restored, _) = Run::start(source, run.config().clone(), None, Some(decoded), run.mode())
        .map_err(|error| anyhow!("resume failed: {error}"))?;
    if restored.snapshot() != snapshot {
        bail!("snapshot changed across a resume");
    }
    if restored.gate_count() != run.gate_count() {
        bail!("resume rebuilt {} gates, expected {}", restored.gate_count(), run.gate_count());
    }
    Ok(())
}

fn fuzz_one(
    rng: &mut ChaCha8Rng,
    library: &TemplateLibrary,
    config: &RunConfig,
    actions: u32,
) -> Result<Run> {
    let mode = choose(rng, &[RunMode::Practice, RunMode::Assessment]);
    let (mut run, _) =
        Run::start(Box::new(library.clone()), config.clone(), random_questions(rng), None, mode)
            .map_err(|error| anyhow!("start failed: {error}"))?;

    for _ in 0..actions {
        if run.outcome().is_some() {
            break;
        }
        let roll = rng.next_u64();
        match roll % 12 {
            0..=6 => {
                let mut policy = |_: GateId, _: Option<&Question>| AnswerReceived {
                    correct: roll % 5 >= 2,
                    time_left: if roll % 97 == 0 { 0.0 } else { 12.0 },
                };
                HeadlessDriver::new(&mut run).step(&mut policy);
            }
            7 => {
                HeadlessDriver::new(&mut run).touch_hazard();
            }
            8 => HeadlessDriver::new(&mut run).fall_out(),
            9 => {
                HeadlessDriver::new(&mut run).collect_reachable_pickups();
            }
            10 => {
                for _ in 0..roll % 90 {
                    run.tick();
                }
            }
            _ => {
                if run.phase() == RunPhase::Running {
                    check_round_trip(&run, library)?;
                }
            }
        }
        run.drain_events();
        check_invariants(&run)?;
    }
    Ok(run)
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    println!("Starting fuzz harness on seed {} for {} runs...", args.seed, args.runs);
    let library = TemplateLibrary::build_default();
    let config = load_config(args.config.as_deref())?;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut completed = 0;
    for index in 0..args.runs {
        let run = fuzz_one(&mut rng, &library, &config, args.actions)
            .map_err(|error| anyhow!("run {index} (seed {}): {error}", args.seed))?;
        debug!(index, outcome = ?run.outcome(), gates = run.gate_count(), "fuzz run finished");
        if run.outcome().is_some() {
            completed += 1;
        }
    }

    println!("Fuzzing completed successfully: {completed}/{} runs ended.", args.runs);
    Ok(())
}
