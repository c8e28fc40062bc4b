//! The registry of installed packages.
//!
//! One JSON document, `installed.json`, holds a manifest per installed
//! package. It is loaded fully before any mutation and rewritten atomically
//! afterwards; an unreadable document is a hard error for every operation
//! that needs it.
//!
//! The `dependents` sets inside it are derived by this module: an edge is
//! added when a dependent registers and deliberately kept when that
//! dependent is later removed. That recorded history is what lets the
//! orphan cascade find packages whose entire set of former dependents is
//! gone, and it is merged across upserts so update/repair never lose it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EngineError;
use crate::package::{Manifest, PackageId};
use crate::runtime::Runtime;

/// In-memory form of the registry document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Registry {
    #[serde(default)]
    pub installed: Vec<Manifest>,
}

impl Registry {
    pub fn get(&self, id: &PackageId) -> Option<&Manifest> {
        self.installed
            .iter()
            .find(|m| m.author == id.author && m.name == id.name)
    }

    pub fn get_mut(&mut self, id: &PackageId) -> Option<&mut Manifest> {
        self.installed
            .iter_mut()
            .find(|m| m.author == id.author && m.name == id.name)
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.get(id).is_some()
    }

    fn contains_id_string(&self, id: &str) -> bool {
        self.installed.iter().any(|m| m.id_string() == id)
    }

    /// Upsert a manifest and maintain the reverse-dependency edges.
    ///
    /// Every registered dependency of the new entry gains this package in
    /// its `dependents` set, and the new entry picks up every registered
    /// package that already declares it. If an entry with the same identity
    /// is replaced, its recorded dependents carry over into the new one.
    pub fn register(&mut self, mut manifest: Manifest) {
        let id = manifest.id_string();

        for dep in &manifest.dependencies {
            if let Some(target) = self
                .installed
                .iter_mut()
                .find(|m| m.id_string() == dep.id)
            {
                target.dependents.insert(id.clone());
            }
        }

        let incoming: Vec<String> = self
            .installed
            .iter()
            .filter(|m| m.dependencies.iter().any(|d| d.id == id))
            .map(Manifest::id_string)
            .collect();
        manifest.dependents.extend(incoming);

        if let Some(previous) = self.remove(&manifest.identity()) {
            manifest.dependents.extend(previous.dependents);
        }
        self.installed.push(manifest);
    }

    /// Remove and return the entry for `id`, if present. The `dependents`
    /// sets of remaining entries are left untouched (see module docs).
    pub fn remove(&mut self, id: &PackageId) -> Option<Manifest> {
        let position = self
            .installed
            .iter()
            .position(|m| m.author == id.author && m.name == id.name)?;
        Some(self.installed.remove(position))
    }

    /// Recorded dependents of `id` that are still registered. This is the
    /// uninstall safety gate.
    pub fn registered_dependents(&self, id: &PackageId) -> Vec<PackageId> {
        let Some(manifest) = self.get(id) else {
            return vec![];
        };
        manifest
            .dependents
            .iter()
            .filter(|d| self.contains_id_string(d))
            .filter_map(|d| d.parse().ok())
            .collect()
    }

    /// Orphans: packages with a non-empty dependent history, none of which
    /// is still registered. A package that never had dependents is not an
    /// orphan; it was installed deliberately.
    pub fn orphans(&self) -> Vec<PackageId> {
        self.installed
            .iter()
            .filter(|m| !m.dependents.is_empty())
            .filter(|m| m.dependents.iter().all(|d| !self.contains_id_string(d)))
            .map(Manifest::identity)
            .collect()
    }
}

/// Durable storage for the registry document.
pub struct RegistryStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> RegistryStore<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self { runtime, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full document. A missing file is an empty registry; an
    /// unreadable or unparseable one is `RegistryCorrupt`.
    pub fn load(&self) -> Result<Registry, EngineError> {
        if !self.runtime.exists(&self.path) {
            return Ok(Registry::default());
        }

        let raw = self
            .runtime
            .read_to_string(&self.path)
            .map_err(|e| EngineError::RegistryCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        serde_json::from_str(&raw).map_err(|e| EngineError::RegistryCorrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Persist the document atomically (write aside, then rename).
    pub fn save(&self, registry: &Registry) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(registry)?;
        let tmp_path = self.path.with_extension("json.tmp");

        self.runtime.write(&tmp_path, json.as_bytes())?;
        self.runtime
            .rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to persist registry to {:?}", self.path))?;
        Ok(())
    }

    /// Register one manifest in a full read-modify-write cycle.
    pub fn register(&self, manifest: Manifest) -> Result<(), EngineError> {
        let mut registry = self.load()?;
        registry.register(manifest);
        self.save(&registry)?;
        Ok(())
    }

    /// Add recorded dependents to an entry, if it exists. Used to carry
    /// reverse-dependency history across an uninstall/reinstall gap.
    pub fn extend_dependents(
        &self,
        id: &PackageId,
        dependents: impl IntoIterator<Item = String>,
    ) -> Result<(), EngineError> {
        let mut registry = self.load()?;
        if let Some(manifest) = registry.get_mut(id) {
            manifest.dependents.extend(dependents);
            self.save(&registry)?;
        }
        Ok(())
    }

    /// Read-only reverse-dependency query: which installed packages declare
    /// `id` among their dependencies. Entries with unexpected shapes are
    /// skipped rather than failing the whole query.
    pub fn who_depends_on(&self, id: &PackageId) -> Result<Vec<PackageId>, EngineError> {
        if !self.runtime.exists(&self.path) {
            return Ok(vec![]);
        }

        let raw = self
            .runtime
            .read_to_string(&self.path)
            .map_err(|e| EngineError::RegistryCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        let document: Value =
            serde_json::from_str(&raw).map_err(|e| EngineError::RegistryCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let key = id.to_string();
        let mut dependents = Vec::new();

        let installed = document.get("installed").and_then(Value::as_array);
        for entry in installed.into_iter().flatten() {
            let Some(dependencies) = entry.get("dependencies").and_then(Value::as_array) else {
                continue;
            };
            let references = dependencies
                .iter()
                .any(|d| d.get("id").and_then(Value::as_str) == Some(key.as_str()));
            if !references {
                continue;
            }

            match (
                entry.get("author").and_then(Value::as_str),
                entry.get("name").and_then(Value::as_str),
            ) {
                (Some(author), Some(name)) => dependents.push(PackageId {
                    author: author.to_string(),
                    name: name.to_string(),
                }),
                _ => warn!("Skipping registry entry without an identity"),
            }
        }

        Ok(dependents)
    }
}
