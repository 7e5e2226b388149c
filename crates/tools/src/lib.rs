//! Setup shared by the `replay`, `simulate` and `fuzz` binaries.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use quizrun_core::{Question, RunConfig, RunMode, TemplateLibrary};
use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "QuizRun";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Practice,
    Assessment,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Practice => RunMode::Practice,
            ModeArg::Assessment => RunMode::Assessment,
        }
    }
}

/// Logs go to stderr so the tools' stdout stays machine-readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Reads a TOML run config; missing keys keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let Some(path) = path else {
        return Ok(RunConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid run config: {}", path.display()))
}

/// Reads a JSON array of `{ "id": ..., "difficulty": ... }` records.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read question file: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| "Failed to deserialize question JSON")
}

/// The built-in template set, or every `*.json` template under `dir`.
pub fn load_library(dir: Option<&Path>) -> Result<TemplateLibrary> {
    match dir {
        Some(dir) => TemplateLibrary::load_dir(dir)
            .with_context(|| format!("Failed to load templates from {}", dir.display())),
        None => Ok(TemplateLibrary::build_default()),
    }
}

pub fn default_data_path(file_name: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|proj_dirs| {
        let mut path = proj_dirs.data_dir().to_path_buf();
        path.push(file_name);
        path
    })
}

pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
