//! JSON-backed preset store.
//!
//! The backing file is a single JSON object keyed by preset name. Every
//! mutation rewrites the whole file. There is no locking: one process is
//! assumed to own the file, and the last writer wins.
use crate::config::ParameterRecord;
use crate::error::{FlowlineError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_PRESET_FILE: &str = "grd2stream_presets.json";

#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    // Vec keeps listing order; the store holds a handful of entries
    presets: Vec<(String, ParameterRecord)>,
}

fn read_presets(path: &Path) -> Result<Vec<(String, ParameterRecord)>> {
    let text = fs::read_to_string(path)
        .map_err(|e| FlowlineError::StoreIo(format!("cannot read {}: {}", path.display(), e)))?;
    let map: Map<String, Value> = serde_json::from_str(&text)
        .map_err(|e| FlowlineError::StoreIo(format!("cannot decode {}: {}", path.display(), e)))?;
    map.into_iter()
        .map(|(name, value)| {
            serde_json::from_value::<ParameterRecord>(value)
                .map(|record| (name.clone(), record))
                .map_err(|e| {
                    FlowlineError::StoreIo(format!("invalid preset '{}' in {}: {}", name, path.display(), e))
                })
        })
        .collect()
}

fn write_presets<'a>(
    path: &Path,
    presets: impl Iterator<Item = (&'a String, &'a ParameterRecord)>,
) -> Result<()> {
    let mut map = Map::new();
    for (name, record) in presets {
        let value = serde_json::to_value(record)
            .map_err(|e| FlowlineError::StoreIo(format!("cannot encode preset '{}': {}", name, e)))?;
        map.insert(name.clone(), value);
    }
    let text = serde_json::to_string_pretty(&Value::Object(map))
        .map_err(|e| FlowlineError::StoreIo(e.to_string()))?;
    fs::write(path, text)
        .map_err(|e| FlowlineError::StoreIo(format!("cannot write {}: {}", path.display(), e)))
}

impl PresetStore {
    /// Opens the store at `path`. A missing or unreadable file gives an empty
    /// store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = PresetStore {
            path: path.into(),
            presets: Vec::new(),
        };
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads from disk, falling back to an empty store on any error.
    pub fn load(&mut self) {
        if !self.path.exists() {
            self.presets.clear();
            return;
        }
        self.presets = match read_presets(&self.path) {
            Ok(presets) => presets,
            Err(e) => {
                warn!("Error loading presets: {}", e);
                Vec::new()
            }
        };
    }

    /// Writes the whole store back. Returns false when the write failed.
    pub fn save(&self) -> bool {
        match write_presets(&self.path, self.presets.iter().map(|(n, r)| (n, r))) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error saving presets: {}", e);
                false
            }
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.presets.iter().position(|(n, _)| n == name)
    }

    fn insert(&mut self, name: &str, mut record: ParameterRecord) {
        record.touch();
        match self.position(name) {
            Some(idx) => self.presets[idx].1 = record,
            None => self.presets.push((name.to_string(), record)),
        }
    }

    /// Stores `record` under `name`, replacing any existing entry.
    pub fn add(&mut self, name: &str, record: ParameterRecord) -> bool {
        self.insert(name, record);
        self.save()
    }

    /// Replaces an existing preset; false when `name` is unknown.
    pub fn update(&mut self, name: &str, record: ParameterRecord) -> bool {
        if self.position(name).is_none() {
            return false;
        }
        self.insert(name, record);
        self.save()
    }

    pub fn delete(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.presets.remove(idx);
                self.save()
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterRecord> {
        self.presets.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Renames a preset in place. The new name must be non-empty and unused.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let new = new.trim();
        if new.is_empty() {
            return Err(FlowlineError::config("Please enter a name for the preset."));
        }
        if old != new && self.contains(new) {
            return Err(FlowlineError::config(format!(
                "Preset '{}' already exists.",
                new
            )));
        }
        let idx = self
            .position(old)
            .ok_or_else(|| FlowlineError::config(format!("Preset '{}' not found.", old)))?;
        let entry = &mut self.presets[idx];
        entry.0 = new.to_string();
        entry.1.touch();
        if self.save() {
            Ok(())
        } else {
            Err(FlowlineError::StoreIo(format!(
                "could not persist rename to {}",
                self.path.display()
            )))
        }
    }

    /// Writes a single-entry file `{name: record}`.
    pub fn export(&self, name: &str, filepath: &Path) -> bool {
        let Some(record) = self.get(name) else {
            return false;
        };
        let name = name.to_string();
        match write_presets(filepath, std::iter::once((&name, record))) {
            Ok(()) => {
                info!("Exported preset '{}' to {}", name, filepath.display());
                true
            }
            Err(e) => {
                warn!("Error exporting preset: {}", e);
                false
            }
        }
    }

    /// Merges every entry of `filepath` into the store, overwriting same-name
    /// presets, then persists. Nothing changes when the file cannot be read.
    pub fn import(&mut self, filepath: &Path) -> bool {
        let imported = match read_presets(filepath) {
            Ok(imported) => imported,
            Err(e) => {
                warn!("Error importing preset: {}", e);
                return false;
            }
        };
        info!("Importing {} preset(s) from {}", imported.len(), filepath.display());
        for (name, record) in imported {
            self.insert(&name, record);
        }
        self.save()
    }
}
