use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use quizrun_core::journal_file::load_journal_from_file;
use quizrun_core::{ReplayResult, replay_journal};
use tools::{init_tracing, load_library};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSONL journal to replay
    #[arg(short, long)]
    journal: PathBuf,
    /// Directory of template JSON files; the built-in set when omitted
    #[arg(short, long)]
    templates: Option<PathBuf>,
    /// Fail unless the final snapshot hash matches (hex, with or without `0x`)
    #[arg(long)]
    expect_hash: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let loaded = load_journal_from_file(&args.journal)
        .with_context(|| format!("Failed to load journal file: {}", args.journal.display()))?;
    let library = load_library(args.templates.as_deref())?;

    let result: ReplayResult = replay_journal(&library, &loaded.journal)
        .with_context(|| "Replay failed during execution")?;

    println!("Replay complete.");
    println!("Inputs: {}", loaded.journal.inputs.len());
    println!("Final Tick: {}", result.final_tick);
    println!("Phase: {:?}", result.final_phase);
    println!("Outcome: {:?}", result.final_outcome);
    println!("Gates cleared: {}", result.snapshot.progression_pointer);
    println!("Extensions: {}", result.snapshot.extended_chunk_log.len());
    println!("Saves verified: {}", result.saves_verified);
    println!("Snapshot Hash: 0x{:016x}", result.final_snapshot_hash);

    if let Some(expected) = args.expect_hash {
        let digits = expected.trim_start_matches("0x");
        let expected = u64::from_str_radix(digits, 16)
            .with_context(|| format!("Invalid expected hash: {expected}"))?;
        if expected != result.final_snapshot_hash {
            bail!(
                "snapshot hash mismatch: expected 0x{expected:016x}, replayed 0x{:016x}",
                result.final_snapshot_hash
            );
        }
        println!("Hash verified.");
    }

    Ok(())
}
