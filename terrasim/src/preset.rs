//! Preset store: named template objects that live objects are copied from.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use crate::config::{ConfigError, LoadReport};
use crate::movable::{MovableObject, ObjectKind};
use crate::registry::UniqueIdCounter;
use crate::script::ScriptRuntime;
use crate::time::SimClock;

/// Templates keyed by name, bucketed under every class tag of their kind.
#[derive(Debug, Default)]
pub struct PresetStore {
    presets: Vec<MovableObject>,
    by_tag: HashMap<&'static str, Vec<usize>>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a preset. Unnamed presets are refused. A preset of the same kind and
    /// name is replaced only when `overwrite` is set.
    pub fn add(&mut self, preset: MovableObject, overwrite: bool) -> bool {
        if preset.preset_name.is_empty() || preset.preset_name == "None" {
            log::warn!("refusing to store a {} preset without a name", preset.class_name());
            return false;
        }

        let existing = self.presets.iter().position(|stored| {
            stored.kind() == preset.kind() && stored.preset_name == preset.preset_name
        });
        match existing {
            Some(index) if overwrite => {
                log::debug!("replacing preset {} {}", preset.class_name(), preset.preset_name);
                self.presets[index] = preset;
                true
            }
            Some(_) => false,
            None => {
                let index = self.presets.len();
                for tag in preset.kind().capability_tags() {
                    self.by_tag.entry(*tag).or_default().push(index);
                }
                self.presets.push(preset);
                true
            }
        }
    }

    fn find(&self, tag: &str, name: &str) -> Option<usize> {
        let named = |index: &usize| self.presets[*index].preset_name == name;
        let bucket = self.by_tag.get(tag)?;
        bucket
            .iter()
            .copied()
            .filter(named)
            .find(|&index| self.presets[index].class_name() == tag)
            .or_else(|| bucket.iter().copied().find(named))
    }

    /// Preset called `name` whose kind answers to `tag`. A preset whose own
    /// class is `tag` wins over one that only specializes it.
    pub fn get(&self, tag: &str, name: &str) -> Option<&MovableObject> {
        self.find(tag, name).map(|index| &self.presets[index])
    }

    pub fn get_mut(&mut self, tag: &str, name: &str) -> Option<&mut MovableObject> {
        self.find(tag, name).map(move |index| &mut self.presets[index])
    }

    /// Names of every preset answering to `tag`, in insertion order.
    pub fn names_tagged(&self, tag: &str) -> Vec<&str> {
        self.by_tag
            .get(tag)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| self.presets[index].preset_name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovableObject> {
        self.presets.iter()
    }

    /// Load presets from a JSON file holding an array of property objects.
    ///
    /// Each object names its `Kind`. Properties that cannot be applied are
    /// collected in the report and the rest of the preset still loads. Only an
    /// unreadable or unparsable file is an error.
    pub fn load_file(
        &mut self,
        path: impl AsRef<Path>,
        ids: &mut UniqueIdCounter,
        clock: &SimClock,
        rt: &mut ScriptRuntime,
    ) -> Result<LoadReport> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read preset file {:?}: {}", path, e))?;
        let entries: Vec<Map<String, Value>> = serde_json::from_str(&json)
            .map_err(|e| anyhow!("Invalid preset file {:?}: {}", path, e))?;

        let file = path.display().to_string();
        let mut report = LoadReport::default();
        for entry in &entries {
            self.load_entry(entry, &file, ids, clock, rt, &mut report);
        }

        log::info!(
            "loaded {} presets from {file} with {} errors",
            report.loaded,
            report.errors.len()
        );
        Ok(report)
    }

    fn load_entry(
        &mut self,
        entry: &Map<String, Value>,
        file: &str,
        ids: &mut UniqueIdCounter,
        clock: &SimClock,
        rt: &mut ScriptRuntime,
        report: &mut LoadReport,
    ) {
        let label = entry
            .get("PresetName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let error = |property: &str, message: String| ConfigError {
            file: file.to_string(),
            preset: label.clone(),
            property: property.to_string(),
            message,
        };

        let Some(kind) = entry
            .get("Kind")
            .and_then(Value::as_str)
            .and_then(ObjectKind::from_class_name)
        else {
            report.push(error("Kind", "missing or unknown object kind".to_string()));
            return;
        };

        let mut preset = MovableObject::new(kind, ids, clock);
        // The name goes first so scripts loaded below see it.
        if let Some(name) = entry.get("PresetName") {
            if let Err(err) = preset.read_property("PresetName", name, rt) {
                report.push(error("PresetName", err.to_string()));
            }
        }
        for (name, value) in entry {
            if name == "Kind" || name == "PresetName" {
                continue;
            }
            if let Err(err) = preset.read_property(name, value, rt) {
                report.push(error(name.as_str(), err.to_string()));
            }
        }
        preset.effect.settle_stop_time(preset.lifetime_ms);

        if self.add(preset, true) {
            report.loaded += 1;
        } else {
            report.push(error("PresetName", "a preset needs a name".to_string()));
        }
    }
}
