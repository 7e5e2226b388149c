pub mod assembler;
pub mod config;
pub mod content;
pub mod driver;
pub mod journal;
pub mod journal_file;
pub mod replay;
pub mod rng;
pub mod run;
pub mod seed;
pub mod sequencer;
pub mod snapshot;
pub mod snapshot_file;
pub mod types;
pub mod world;

pub use assembler::{AssemblyError, ChunkAssembler, CollectedIds};
pub use config::RunConfig;
pub use content::{ChunkTemplate, TemplateLibrary, TemplateSource};
pub use driver::{AnswerPolicy, DriveStep, HeadlessDriver};
pub use journal::{InputRecord, RunInput, RunJournal, SaveMark, ZoneRef};
pub use replay::*;
pub use run::{InputError, PlayerState, Run, RunError, RunLayout};
pub use seed::RunSeed;
pub use snapshot::{ProgressSnapshot, SnapshotError};
pub use types::*;
