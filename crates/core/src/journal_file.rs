//! Append-only run journal on disk.
//!
//! One JSON object per line. Line 1 is the session header: catalog hash, mode, the question
//! list, the run config and the snapshot a resumed session started from. Every later line is a
//! host input or a save mark, each carrying the running chain digest
//! `SHA-256(previous digest || entry json)`. The chain starts from the digest of the header
//! line itself, so editing the quiz, the config or any entry breaks every link after it.
//!
//! Entries are flushed as they are written; a session that dies mid-run leaves a file that
//! loads up to its last complete line and can be reopened with [`JournalWriter::resume`].

use std::error::Error;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::journal::{InputRecord, RunInput, RunJournal, SaveMark};
use crate::run::Run;
use crate::snapshot::ProgressSnapshot;
use crate::types::{Question, RunMode};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct SessionHeader {
    format_version: u16,
    build_id: String,
    content_hash: u64,
    mode: RunMode,
    questions: Option<Vec<Question>>,
    #[serde(default)]
    resume_from: Option<ProgressSnapshot>,
    #[serde(default)]
    config: RunConfig,
}

impl From<&RunJournal> for SessionHeader {
    fn from(journal: &RunJournal) -> Self {
        Self {
            format_version: journal.format_version,
            build_id: journal.build_id.clone(),
            content_hash: journal.content_hash,
            mode: journal.mode,
            questions: journal.questions.clone(),
            resume_from: journal.resume_from.clone(),
            config: journal.config.clone(),
        }
    }
}

impl SessionHeader {
    /// A resumed session must start from a snapshot the run would accept, in the header's mode.
    fn check(&self) -> Result<(), String> {
        let Some(snapshot) = &self.resume_from else {
            return Ok(());
        };
        snapshot.validate().map_err(|error| error.to_string())?;
        if snapshot.mode != self.mode {
            return Err(format!(
                "resume snapshot is a {:?} run but the session is {:?}",
                snapshot.mode, self.mode
            ));
        }
        Ok(())
    }

    fn into_journal(self) -> RunJournal {
        RunJournal {
            format_version: self.format_version,
            build_id: self.build_id,
            content_hash: self.content_hash,
            mode: self.mode,
            questions: self.questions,
            resume_from: self.resume_from,
            config: self.config,
            inputs: Vec::new(),
            saves: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Entry {
    Input { seq: u64, tick: u64, input: RunInput },
    Save(SaveMark),
}

#[derive(Serialize, Deserialize)]
struct Line<E> {
    entry: E,
    chain: String,
}

fn digest(bytes: &[u8]) -> String {
    format!("{:064x}", Sha256::digest(bytes))
}

fn link(previous: &str, entry_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update(entry_json.as_bytes());
    format!("{:064x}", hasher.finalize())
}

/// Streams one session's inputs and saves to a journal file.
pub struct JournalWriter {
    out: BufWriter<File>,
    chain: String,
    next_seq: u64,
}

impl JournalWriter {
    /// Creates the file and writes the session header followed by whatever `journal` already
    /// holds, with each save placed after the inputs it covers.
    pub fn create(path: &Path, journal: &RunJournal) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);
        let header =
            serde_json::to_string(&SessionHeader::from(journal)).map_err(io::Error::other)?;
        writeln!(out, "{header}")?;
        out.flush()?;

        let mut writer = Self { out, chain: digest(header.as_bytes()), next_seq: 0 };
        let mut saves = journal.saves.iter().peekable();
        for record in &journal.inputs {
            while let Some(save) = saves.next_if(|save| save.inputs_before <= writer.next_seq) {
                writer.write_entry(&Entry::Save(*save))?;
            }
            writer.append(record.tick_boundary, &record.input)?;
        }
        for save in saves {
            writer.write_entry(&Entry::Save(*save))?;
        }
        Ok(writer)
    }

    /// Reopens a journal loaded by [`load_journal_from_file`] to keep appending to it.
    pub fn resume(path: &Path, loaded: &LoadedJournal) -> io::Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            out: BufWriter::new(file),
            chain: loaded.chain_tip.clone(),
            next_seq: loaded.next_seq,
        })
    }

    pub fn append(&mut self, tick: u64, input: &RunInput) -> io::Result<()> {
        self.write_entry(&Entry::Input { seq: self.next_seq, tick, input: input.clone() })?;
        self.next_seq += 1;
        Ok(())
    }

    /// Appends inputs drained from a run; the file numbers them itself.
    pub fn append_all(&mut self, records: &[InputRecord]) -> io::Result<()> {
        for record in records {
            self.append(record.tick_boundary, &record.input)?;
        }
        Ok(())
    }

    /// Marks that the host persisted `run` as it stands after every input written so far.
    pub fn record_save(&mut self, run: &Run) -> io::Result<SaveMark> {
        let mark = SaveMark {
            inputs_before: self.next_seq,
            tick: run.current_tick(),
            pointer: run.pointer(),
            snapshot_hash: run.snapshot_hash(),
        };
        self.write_entry(&Entry::Save(mark))?;
        Ok(mark)
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    fn write_entry(&mut self, entry: &Entry) -> io::Result<()> {
        let entry_json = serde_json::to_string(entry).map_err(io::Error::other)?;
        let chain = link(&self.chain, &entry_json);
        let line = serde_json::to_string(&Line { entry, chain: chain.clone() })
            .map_err(io::Error::other)?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        self.chain = chain;
        Ok(())
    }
}

#[derive(Debug)]
pub struct LoadedJournal {
    pub journal: RunJournal,
    /// Digest of the last entry, or of the header when there are none.
    pub chain_tip: String,
    /// Sequence number the next input will carry.
    pub next_seq: u64,
}

#[derive(Debug)]
pub enum JournalLoadError {
    Io(io::Error),
    EmptyFile,
    /// The header is unreadable or describes a session no run could start from.
    InvalidHeader(String),
    /// An entry is unreadable or out of order with the entries before it.
    InvalidEntry { line: usize, message: String },
    /// The file ends without a newline, as a crash mid-write leaves it.
    IncompleteLine { line: usize },
    /// The digest stored on `line` does not follow from the lines above it.
    ChainBroken { line: usize },
}

impl fmt::Display for JournalLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "journal I/O error: {e}"),
            Self::EmptyFile => write!(f, "journal file is empty"),
            Self::InvalidHeader(message) => write!(f, "invalid session header: {message}"),
            Self::InvalidEntry { line, message } => {
                write!(f, "invalid journal entry at line {line}: {message}")
            }
            Self::IncompleteLine { line } => write!(f, "journal line {line} is incomplete"),
            Self::ChainBroken { line } => write!(f, "journal chain broken at line {line}"),
        }
    }
}

impl Error for JournalLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Reads a journal back, verifying the header and every link of the chain.
pub fn load_journal_from_file(path: &Path) -> Result<LoadedJournal, JournalLoadError> {
    let content = fs::read_to_string(path).map_err(JournalLoadError::Io)?;
    let lines: Vec<&str> = content.lines().collect();
    let Some(header_line) = lines.first() else {
        return Err(JournalLoadError::EmptyFile);
    };
    if !content.ends_with('\n') {
        return Err(JournalLoadError::IncompleteLine { line: lines.len() });
    }

    let header: SessionHeader = serde_json::from_str(header_line)
        .map_err(|e| JournalLoadError::InvalidHeader(e.to_string()))?;
    header.check().map_err(JournalLoadError::InvalidHeader)?;

    let mut journal = header.into_journal();
    let mut chain = digest(header_line.as_bytes());
    for (index, raw) in lines.iter().enumerate().skip(1) {
        let line = index + 1;
        let invalid = |message: String| JournalLoadError::InvalidEntry { line, message };

        let parsed: Line<Entry> =
            serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        let entry_json = serde_json::to_string(&parsed.entry).map_err(|e| invalid(e.to_string()))?;
        let expected = link(&chain, &entry_json);
        if parsed.chain != expected {
            warn!(line, "journal chain broken");
            return Err(JournalLoadError::ChainBroken { line });
        }

        let inputs_so_far = journal.inputs.len() as u64;
        match parsed.entry {
            Entry::Input { seq, tick, input } => {
                if seq != inputs_so_far {
                    return Err(invalid(format!("expected input {inputs_so_far}, found {seq}")));
                }
                journal.inputs.push(InputRecord { seq, tick_boundary: tick, input });
            }
            Entry::Save(mark) => {
                if mark.inputs_before != inputs_so_far {
                    return Err(invalid(format!(
                        "save claims {} inputs before it, the file has {inputs_so_far}",
                        mark.inputs_before
                    )));
                }
                journal.saves.push(mark);
            }
        }
        chain = parsed.chain;
    }

    let next_seq = journal.inputs.len() as u64;
    debug!(inputs = next_seq, saves = journal.saves.len(), "journal loaded");
    Ok(LoadedJournal { journal, chain_tip: chain, next_seq })
}
