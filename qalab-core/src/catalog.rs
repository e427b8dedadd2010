//! Scenario catalog - the read-only registry of scenario definitions.
//!
//! Built once at startup from a TOML table (embedded by default, or a file
//! named by `catalog.path`) and then shared behind an `Arc`. There is no
//! mutation path.

use std::collections::{HashMap, HashSet};

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::config::CatalogConfig;
use crate::error::QalabError;
use crate::models::{ActionKind, ScenarioDefinition};

const BUILTIN_CATALOG: &str = include_str!("../catalog/scenarios.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    scenarios: Vec<ScenarioEntry>,
}

#[derive(Debug, Deserialize)]
struct ScenarioEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    expected_action: String,
    expected_target: String,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<ScenarioDefinition>,
    index: HashMap<String, usize>,
}

impl ScenarioCatalog {
    /// Catalog compiled into the binary.
    pub fn builtin() -> Result<Self, QalabError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &str) -> Result<Self, QalabError> {
        let file: CatalogFile = Config::builder()
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()?;
        Self::from_entries(file.scenarios)
    }

    /// Catalog selected by `[catalog] path`, falling back to the built-in table.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, QalabError> {
        match &config.path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, QalabError> {
        let file: CatalogFile = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::from_entries(file.scenarios)
    }

    pub fn from_definitions(defs: Vec<ScenarioDefinition>) -> Result<Self, QalabError> {
        let mut catalog = Self::default();
        for def in defs {
            catalog.push(def)?;
        }
        Ok(catalog)
    }

    fn from_entries(entries: Vec<ScenarioEntry>) -> Result<Self, QalabError> {
        let mut catalog = Self::default();
        for entry in entries {
            let expected_action: ActionKind = entry
                .expected_action
                .parse()
                .map_err(|e| QalabError::Catalog(format!("scenario '{}': {}", entry.id, e)))?;
            let def = ScenarioDefinition {
                title: entry.title.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                description: entry.description,
                expected_action,
                expected_target: entry.expected_target,
                labels: entry.labels,
            };
            catalog.push(def)?;
        }
        Ok(catalog)
    }

    fn push(&mut self, mut def: ScenarioDefinition) -> Result<(), QalabError> {
        if def.id.trim().is_empty() {
            return Err(QalabError::Catalog("scenario id must not be empty".to_string()));
        }
        if def.expected_target.trim().is_empty() {
            return Err(QalabError::Catalog(format!(
                "scenario '{}': expected_target must not be empty",
                def.id
            )));
        }
        if self.index.contains_key(&def.id) {
            return Err(QalabError::Catalog(format!("duplicate scenario id '{}'", def.id)));
        }

        // Labels form an ordered set: keep first occurrence, drop repeats.
        let mut seen = HashSet::new();
        let mut labels = Vec::with_capacity(def.labels.len());
        for label in def.labels.drain(..) {
            if !is_label(&label) {
                return Err(QalabError::Catalog(format!(
                    "scenario '{}': label '{}' is not of the form dimension=value",
                    def.id, label
                )));
            }
            if seen.insert(label.clone()) {
                labels.push(label);
            }
        }
        def.labels = labels;

        self.index.insert(def.id.clone(), self.scenarios.len());
        self.scenarios.push(def);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ScenarioDefinition> {
        self.index.get(id).map(|&i| &self.scenarios[i])
    }

    pub fn all_ids(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn all(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    /// Scenarios carrying every one of `labels`, in catalog order.
    pub fn filter_by_labels(&self, labels: &[String]) -> Vec<ScenarioDefinition> {
        self.scenarios
            .iter()
            .filter(|s| s.has_labels(labels))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

fn is_label(label: &str) -> bool {
    match label.split_once('=') {
        Some((dimension, value)) => !dimension.trim().is_empty() && !value.trim().is_empty(),
        None => false,
    }
}
