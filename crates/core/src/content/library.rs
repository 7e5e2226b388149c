//! Template catalog with a resident set standing in for the host's asset loader.
//! A template must be loaded (resident) before the assembler may place it.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use xxhash_rust::xxh3::Xxh3;

use super::{ChunkTemplate, build_default_templates};
use crate::types::Tier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The catalog has no template with this id.
    UnknownTemplate { template_id: String },
    /// A template file could not be read.
    Io { path: String, message: String },
    /// A template file is not valid template JSON.
    Malformed { path: String, message: String },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTemplate { template_id } => {
                write!(f, "no chunk template named '{template_id}'")
            }
            Self::Io { path, message } => write!(f, "failed to read template {path}: {message}"),
            Self::Malformed { path, message } => {
                write!(f, "malformed template {path}: {message}")
            }
        }
    }
}

impl Error for AssetError {}

/// Asset-loader seam consumed by the assembler.
pub trait TemplateSource {
    fn is_loaded(&self, template_id: &str) -> bool;

    /// Resident template data; `None` until [`TemplateSource::load_template`] succeeded.
    fn template(&self, template_id: &str) -> Option<&ChunkTemplate>;

    fn load_template(&mut self, template_id: &str) -> Result<&ChunkTemplate, AssetError>;

    /// Template ids grouped by tier, in a stable order.
    fn pools(&self) -> BTreeMap<Tier, Vec<String>>;
}

#[derive(Clone, Debug, Default)]
pub struct TemplateLibrary {
    catalog: BTreeMap<String, ChunkTemplate>,
    resident: BTreeSet<String>,
}

impl TemplateLibrary {
    pub fn new(templates: impl IntoIterator<Item = ChunkTemplate>) -> Self {
        let mut library = Self::default();
        for template in templates {
            library.insert(template);
        }
        library
    }

    pub fn build_default() -> Self {
        Self::new(build_default_templates())
    }

    /// Reads every `*.json` file in `dir` as one template, in file-name order.
    pub fn load_dir(dir: &Path) -> Result<Self, AssetError> {
        let io_error = |path: &Path, error: &dyn fmt::Display| AssetError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_error(dir, &e))? {
            let path = entry.map_err(|e| io_error(dir, &e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut library = Self::default();
        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|e| io_error(&path, &e))?;
            let template: ChunkTemplate =
                serde_json::from_str(&raw).map_err(|e| AssetError::Malformed {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            debug!(template_id = %template.id, path = %path.display(), "template read");
            library.insert(template);
        }
        Ok(library)
    }

    /// Adds or replaces a catalog entry. Replacing evicts it from the resident set.
    pub fn insert(&mut self, template: ChunkTemplate) {
        self.resident.remove(&template.id);
        self.catalog.insert(template.id.clone(), template);
    }

    pub fn contains(&self, template_id: &str) -> bool {
        self.catalog.contains_key(template_id)
    }

    /// Loads every id it can; unknown ids are logged and left unloaded so assembly of
    /// those chunks fails on its own.
    pub fn preload<'a>(&mut self, template_ids: impl IntoIterator<Item = &'a str>) {
        for template_id in template_ids {
            if let Err(error) = self.load_template(template_id) {
                warn!(%error, "template preload failed");
            }
        }
    }

    /// Fingerprint of the catalog, recorded in journals so replays run against the same data.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for template in self.catalog.values() {
            match serde_json::to_vec(template) {
                Ok(bytes) => hasher.update(&bytes),
                Err(error) => warn!(%error, template_id = %template.id, "template not hashable"),
            }
        }
        hasher.digest()
    }

    pub fn preload_all(&mut self) {
        self.resident.extend(self.catalog.keys().cloned());
    }

    pub fn unload(&mut self, template_id: &str) {
        self.resident.remove(template_id);
    }
}

impl TemplateSource for TemplateLibrary {
    fn is_loaded(&self, template_id: &str) -> bool {
        self.resident.contains(template_id)
    }

    fn template(&self, template_id: &str) -> Option<&ChunkTemplate> {
        if !self.is_loaded(template_id) {
            return None;
        }
        self.catalog.get(template_id)
    }

    fn load_template(&mut self, template_id: &str) -> Result<&ChunkTemplate, AssetError> {
        let Some(template) = self.catalog.get(template_id) else {
            return Err(AssetError::UnknownTemplate { template_id: template_id.to_string() });
        };
        self.resident.insert(template_id.to_string());
        Ok(template)
    }

    fn pools(&self) -> BTreeMap<Tier, Vec<String>> {
        let mut pools: BTreeMap<Tier, Vec<String>> =
            Tier::ALL.iter().map(|tier| (*tier, Vec::new())).collect();
        for template in self.catalog.values() {
            pools.entry(template.tier).or_default().push(template.id.clone());
        }
        pools
    }
}
