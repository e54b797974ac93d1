//! Settings and definition loading
//!
//! Definitions are read from TOML or JSON files (picked by extension).
//! Directories are walked recursively in sorted order. Files declaring the
//! same realm are merged in the order they were read, and step positions
//! are assigned once everything is loaded.

use crate::paths;
use crate::schema::RealmDefinition;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported definition file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Toml,
    Json,
}

impl DefinitionFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn parse(self, content: &str) -> Result<RealmDefinition> {
        match self {
            Self::Toml => toml::from_str(content).context("Invalid TOML definition"),
            Self::Json => serde_json::from_str(content).context("Invalid JSON definition"),
        }
    }
}

/// All realm definitions of one run, merged by realm name.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub realms: Vec<RealmDefinition>,
    /// Files that contributed, in load order
    pub sources: Vec<PathBuf>,
}

impl Batch {
    /// Add a definition, merging into an earlier one for the same realm
    pub fn push(&mut self, definition: RealmDefinition) {
        match self.realms.iter_mut().find(|r| r.realm == definition.realm) {
            Some(existing) => existing.merge(definition),
            None => self.realms.push(definition),
        }
    }

    pub fn flow_count(&self) -> usize {
        self.realms.iter().map(|r| r.flows.len()).sum()
    }
}

/// Load every definition reachable from `inputs`.
///
/// With no inputs, the default definitions directory is used.
pub fn load_batch(inputs: &[String]) -> Result<Batch> {
    let roots: Vec<PathBuf> = if inputs.is_empty() {
        vec![paths::definitions_dir()?]
    } else {
        inputs.iter().map(|p| paths::expand(p)).collect()
    };

    let mut batch = Batch::default();
    for root in &roots {
        for file in collect_files(root)? {
            let definition = load_file(&file)?;
            log::debug!(
                "Loaded realm '{}' ({} flows) from {}",
                definition.realm,
                definition.flows.len(),
                file.display()
            );
            batch.push(definition);
            batch.sources.push(file);
        }
    }

    for realm in &mut batch.realms {
        realm.assign_positions();
    }
    Ok(batch)
}

/// Files under `root` with a supported extension, sorted by path
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("Definition path does not exist: {}", root.display());
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Could not walk {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && DefinitionFormat::from_path(path).is_some() {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Parse one definition file
pub fn load_file(path: &Path) -> Result<RealmDefinition> {
    let format = DefinitionFormat::from_path(path)
        .with_context(|| format!("Unsupported definition file: {}", path.display()))?;
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    let definition = format
        .parse(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if definition.realm.trim().is_empty() {
        bail!("{}: realm name is empty", path.display());
    }
    Ok(definition)
}

// ============================================================================
// Tests
// ============================================================================
