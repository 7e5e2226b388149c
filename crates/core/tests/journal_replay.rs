use std::collections::BTreeSet;
use std::fs;

use quizrun_core::journal_file::{JournalLoadError, JournalWriter, load_journal_from_file};
use quizrun_core::snapshot_file::SnapshotFile;
use quizrun_core::{
    AnswerReceived, DriveStep, GateId, HeadlessDriver, Question, Run, RunConfig, RunJournal,
    RunMode, RunOutcome, TemplateLibrary, replay_journal, replay_run,
};
use tempfile::tempdir;

const QUIZ: &[(&str, &str)] = &[("a", "easy"), ("b", "hard"), ("c", "medium"), ("d", "hard")];

fn questions() -> Vec<Question> {
    QUIZ.iter().map(|(id, difficulty)| Question::new(*id, *difficulty)).collect()
}

fn first_try_wrong() -> impl FnMut(GateId, Option<&Question>) -> AnswerReceived {
    let mut asked = BTreeSet::new();
    move |gate, question| {
        let key = question.map_or_else(|| format!("gate-{}", gate.0), |q| q.id.clone());
        AnswerReceived { correct: !asked.insert(key), time_left: 9.0 }
    }
}

fn start(library: &TemplateLibrary, mode: RunMode) -> Run {
    Run::start(Box::new(library.clone()), RunConfig::default(), Some(questions()), None, mode)
        .expect("run should start")
        .0
}

#[test]
fn streamed_journal_replays_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    let library = TemplateLibrary::build_default();
    let mut run = start(&library, RunMode::Assessment);
    let header = RunJournal::new(
        RunMode::Assessment,
        Some(questions()),
        RunConfig::default(),
        library.content_hash(),
    );
    let mut writer = JournalWriter::create(&path, &header).unwrap();

    let mut policy = first_try_wrong();
    let mut driver = HeadlessDriver::new(&mut run);
    for _ in 0..64 {
        let step = driver.step(&mut policy);
        writer.append_all(&driver.run_mut().drain_inputs()).unwrap();
        writer.record_save(driver.run_mut()).unwrap();
        if matches!(step, DriveStep::Finished(_) | DriveStep::Stalled) {
            break;
        }
    }
    drop(writer);
    assert_eq!(run.outcome(), Some(RunOutcome::Completed));

    let loaded = load_journal_from_file(&path).unwrap();
    let replayed = replay_journal(&library, &loaded.journal).unwrap();

    assert_eq!(replayed.final_snapshot_hash, run.snapshot_hash());
    assert_eq!(replayed.snapshot.extended_chunk_log, run.extended_chunk_log());
    assert!(replayed.saves_verified > 0);
    assert_eq!(replayed.saves_verified, loaded.journal.saves.len());
}

#[test]
fn crash_recovery_continues_the_same_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("recover.jsonl");
    let library = TemplateLibrary::build_default();
    let header = RunJournal::new(
        RunMode::Practice,
        Some(questions()),
        RunConfig::default(),
        library.content_hash(),
    );

    let mut policy = first_try_wrong();
    let mut run = start(&library, RunMode::Practice);
    let mut writer = JournalWriter::create(&path, &header).unwrap();
    HeadlessDriver::new(&mut run).step(&mut policy);
    writer.append_all(&run.drain_inputs()).unwrap();
    drop(writer);
    drop(run);

    let loaded = load_journal_from_file(&path).unwrap();
    let mut recovered = replay_run(&library, &loaded.journal).unwrap();
    recovered.drain_inputs();
    let mut writer = JournalWriter::resume(&path, &loaded).unwrap();
    HeadlessDriver::new(&mut recovered).play_to_end(&mut policy, 64);
    writer.append_all(&recovered.drain_inputs()).unwrap();
    drop(writer);

    let reloaded = load_journal_from_file(&path).unwrap();
    let replayed = replay_journal(&library, &reloaded.journal).unwrap();
    assert_eq!(replayed.final_snapshot_hash, recovered.snapshot_hash());
    assert_eq!(replayed.final_outcome, Some(RunOutcome::Completed));
}

#[test]
fn snapshot_file_resume_then_journal_from_there() {
    let dir = tempdir().unwrap();
    let library = TemplateLibrary::build_default();
    let mut policy = first_try_wrong();

    let mut run = start(&library, RunMode::Assessment);
    HeadlessDriver::new(&mut run).step(&mut policy);
    let snapshot_path = dir.path().join("progress.json");
    SnapshotFile::new(run.snapshot(), run.snapshot_hash(), 1_700_000_000_000)
        .write_atomic(&snapshot_path)
        .unwrap();

    let saved = SnapshotFile::load(&snapshot_path).unwrap();
    assert_eq!(saved.snapshot, run.snapshot());
    let (mut resumed, _) = Run::start(
        Box::new(library.clone()),
        RunConfig::default(),
        None,
        Some(saved.snapshot.clone()),
        RunMode::Practice,
    )
    .unwrap();
    assert_eq!(resumed.mode(), RunMode::Assessment);

    let journal_path = dir.path().join("session2.jsonl");
    let header = RunJournal::new(
        RunMode::Assessment,
        None,
        RunConfig::default(),
        library.content_hash(),
    )
    .resumed_from(saved.snapshot);
    let mut writer = JournalWriter::create(&journal_path, &header).unwrap();
    HeadlessDriver::new(&mut resumed).play_to_end(&mut policy, 64);
    writer.append_all(&resumed.drain_inputs()).unwrap();

    let loaded = load_journal_from_file(&journal_path).unwrap();
    let replayed = replay_journal(&library, &loaded.journal).unwrap();
    assert_eq!(replayed.final_snapshot_hash, resumed.snapshot_hash());
}

#[test]
fn corrupted_journals_are_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.jsonl");
    let library = TemplateLibrary::build_default();
    let header = RunJournal::new(
        RunMode::Assessment,
        Some(questions()),
        RunConfig::default(),
        library.content_hash(),
    );
    let mut run = start(&library, RunMode::Assessment);
    let mut writer = JournalWriter::create(&path, &header).unwrap();
    HeadlessDriver::new(&mut run).step(&mut first_try_wrong());
    writer.append_all(&run.drain_inputs()).unwrap();
    drop(writer);

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"correct\":false"));
    fs::write(&path, content.replacen("\"correct\":false", "\"correct\":true", 1)).unwrap();

    assert!(matches!(
        load_journal_from_file(&path),
        Err(JournalLoadError::ChainBroken { .. })
    ));
}
