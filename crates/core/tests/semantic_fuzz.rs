use quizrun_core::{
    AnswerReceived, GateId, HeadlessDriver, Question, Run, RunConfig, RunMode, RunPhase,
    TemplateLibrary,
};
use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

const DIFFICULTIES: &[&str] = &["easy", "medium", "hard", "Hard", "expert", ""];

fn choose<T: Clone>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p].clone()
}

fn random_questions(rng: &mut ChaCha8Rng) -> Vec<Question> {
    let count = 1 + rng.next_u64() as usize % 6;
    (0..count)
        .map(|_| {
            let id = rng.next_u64() % 500;
            Question::new(id.to_string(), choose(rng, DIFFICULTIES))
        })
        .collect()
}

fn check_invariants(run: &Run, seed: u64) -> Result<(), String> {
    let world = run.world();
    if run.pointer() > run.gate_count() {
        return Err(format!(
            "pointer {} past {} gates (seed {seed})",
            run.pointer(),
            run.gate_count()
        ));
    }
    for (index, gate) in world.gates().iter().enumerate() {
        if gate.id != GateId(index as u32) {
            return Err(format!("gate ids not contiguous at {index} (seed {seed})"));
        }
    }
    let armed = world.active_triggers();
    if armed.len() > 1 {
        return Err(format!("{} triggers armed at once (seed {seed})", armed.len()));
    }
    if run.phase() == RunPhase::Running
        && !run.is_resolving()
        && let Some(gate) = armed.first()
        && gate.0 != run.pointer()
    {
        return Err(format!(
            "armed gate {} differs from pointer {} (seed {seed})",
            gate.0,
            run.pointer()
        ));
    }
    if run.questions().len() < run.base_question_count() {
        return Err(format!("question sequence shrank (seed {seed})"));
    }
    let requeued = run.questions().len() - run.base_question_count();
    if requeued > run.extended_chunk_log().len() {
        return Err(format!("{requeued} re-queued questions without extensions (seed {seed})"));
    }
    if run.mode() == RunMode::Practice && !run.extended_chunk_log().is_empty() {
        return Err(format!("practice run extended the map (seed {seed})"));
    }
    if world.bounds().width != world.cursor_x() {
        return Err(format!("bounds lag the assembly cursor (seed {seed})"));
    }
    Ok(())
}

fn check_resume(run: &Run, seed: u64) -> Result<(), String> {
    let snapshot = run.snapshot();
    let (restored, _) = Run::start(
        Box::new(TemplateLibrary::build_default()),
        run.config().clone(),
        None,
        Some(snapshot.clone()),
        run.mode(),
    )
    .map_err(|error| format!("resume failed: {error} (seed {seed})"))?;
    if restored.snapshot() != snapshot {
        return Err(format!("snapshot did not survive a resume (seed {seed})"));
    }
    if restored.gate_count() != run.gate_count() {
        return Err(format!(
            "resume rebuilt {} gates, expected {} (seed {seed})",
            restored.gate_count(),
            run.gate_count()
        ));
    }
    Ok(())
}

fn run_fuzz_simulation(quiz_seed: u64, choice_seed: u64, max_actions: u32) -> Result<(), String> {
    let mut quiz_rng = ChaCha8Rng::seed_from_u64(quiz_seed);
    let mut rng = ChaCha8Rng::seed_from_u64(choice_seed);
    let mode = choose(&mut rng, &[RunMode::Practice, RunMode::Assessment]);
    let (mut run, _) = Run::start(
        Box::new(TemplateLibrary::build_default()),
        RunConfig::default(),
        Some(random_questions(&mut quiz_rng)),
        None,
        mode,
    )
    .map_err(|error| format!("start failed: {error}"))?;

    for _ in 0..max_actions {
        if run.outcome().is_some() {
            break;
        }
        let action = rng.next_u64() % 10;
        let roll = rng.next_u64();
        match action {
            0..=5 => {
                let mut policy = |_: GateId, _: Option<&Question>| AnswerReceived {
                    correct: roll % 3 != 0,
                    time_left: if roll % 50 == 0 { 0.0 } else { 10.0 },
                };
                HeadlessDriver::new(&mut run).step(&mut policy);
            }
            6 => {
                HeadlessDriver::new(&mut run).touch_hazard();
            }
            7 => HeadlessDriver::new(&mut run).fall_out(),
            8 => {
                for _ in 0..roll % 60 {
                    run.tick();
                }
            }
            _ => {
                if run.phase() == RunPhase::Running {
                    check_resume(&run, quiz_seed)?;
                }
            }
        }
        run.drain_events();
        check_invariants(&run, quiz_seed)?;
    }

    Ok(())
}

#[test]
fn test_fuzz_run_progression() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(24));
    let seeds = (any::<u64>(), any::<u64>());

    runner
        .run(&seeds, |(quiz_seed, choice_seed)| {
            run_fuzz_simulation(quiz_seed, choice_seed, 200).map_err(TestCaseError::fail)?;
            Ok(())
        })
        .expect("semantic fuzz simulation should preserve invariants");
}
