//! The package lifecycle engine.
//!
//! Sole mutator of the registry and sole consumer of the catalog, the
//! artifact transport, the archive extractor and the hook runner. Every
//! entry point returns a discriminated outcome or a typed [`EngineError`];
//! the CLI front-end only formats them.
//!
//! All operations are single-threaded and blocking: each one performs a
//! full load of the registry, mutates it, and persists it before returning.

mod autoremove;
mod error;
mod install;
mod self_update;
mod uninstall;
mod update;
mod validate;

use std::path::Path;

use log::warn;

use crate::archive::Extractor;
use crate::catalog::{Catalog, CatalogPackage, find_package};
use crate::cleanup::SharedCleanupContext;
use crate::config::EngineConfig;
use crate::hooks::HookRunner;
use crate::http::HttpClient;
use crate::package::{Manifest, PackageId};
use crate::registry::RegistryStore;
use crate::runtime::Runtime;

pub use error::{EngineError, EngineResult};

/// Result of an install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { version: String },
    AlreadyInstalled,
}

/// Result of an uninstall request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Uninstalled { version: String },
    NotFound,
}

/// Result of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The package was not installed; the latest version was installed fresh.
    Installed { version: String },
    Updated { from: String, to: String },
    UpToDate { version: String },
}

/// Result of a self-update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateOutcome {
    Updated { from: String, to: String },
    UpToDate { version: String },
}

/// Per-package results of an update-all sweep.
#[derive(Debug, Default)]
pub struct UpdateAllReport {
    /// Packages updated, with their old and new version names.
    pub updated: Vec<(PackageId, String, String)>,
    /// Packages skipped because the catalog no longer lists them (or lists
    /// no latest version for them).
    pub skipped: Vec<PackageId>,
    /// Packages whose update failed; the sweep continues past them.
    pub failed: Vec<(PackageId, EngineError)>,
    /// Count of packages already at the catalog's latest version.
    pub up_to_date: usize,
}

/// Orchestrates the package lifecycle against injected collaborators.
pub struct Engine<R: Runtime, C: Catalog, X: Extractor, H: HookRunner> {
    runtime: R,
    catalog: C,
    extractor: X,
    hooks: H,
    http: HttpClient,
    config: EngineConfig,
    cleanup: SharedCleanupContext,
}

impl<R, C, X, H> Engine<R, C, X, H>
where
    R: Runtime + 'static,
    C: Catalog,
    X: Extractor,
    H: HookRunner,
{
    pub fn new(
        runtime: R,
        catalog: C,
        extractor: X,
        hooks: H,
        http: HttpClient,
        config: EngineConfig,
        cleanup: SharedCleanupContext,
    ) -> Self {
        Self {
            runtime,
            catalog,
            extractor,
            hooks,
            http,
            config,
            cleanup,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> RegistryStore<'_, R> {
        RegistryStore::new(&self.runtime, self.config.registry_path())
    }

    pub(crate) async fn index(&self) -> EngineResult<Vec<CatalogPackage>> {
        self.catalog.fetch().await.map_err(EngineError::Other)
    }

    /// Which installed packages declare `id` as a dependency.
    pub fn who_depends_on(&self, id: &PackageId) -> EngineResult<Vec<PackageId>> {
        self.store().who_depends_on(id)
    }

    /// Installed packages, minus hidden identities.
    pub fn installed(&self) -> EngineResult<Vec<Manifest>> {
        let registry = self.store().load()?;
        Ok(registry
            .installed
            .into_iter()
            .filter(|m| !self.config.is_hidden(&m.identity()))
            .collect())
    }

    /// Every catalog package, minus hidden identities.
    pub async fn available(&self) -> EngineResult<Vec<CatalogPackage>> {
        let index = self.index().await?;
        Ok(index
            .into_iter()
            .filter(|p| !self.config.is_hidden(&p.identity()))
            .collect())
    }

    /// Catalog packages whose name or canonical id contains `query`
    /// (case-insensitive).
    pub async fn search(&self, query: &str) -> EngineResult<Vec<CatalogPackage>> {
        let query = query.to_lowercase();
        let index = self.available().await?;
        Ok(index
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || p.id_string().to_lowercase().contains(&query)
            })
            .collect())
    }

    /// The catalog entry for one package, with all its versions.
    pub async fn versions_of(&self, id: &PackageId) -> EngineResult<CatalogPackage> {
        let index = self.index().await?;
        find_package(&index, id)
            .cloned()
            .ok_or_else(|| EngineError::NotFoundInCatalog(id.clone()))
    }

    /// Run a declared hook, best effort. A missing or failing hook is
    /// reported and never aborts the surrounding operation.
    pub(crate) fn run_hook(&self, package_dir: &Path, script: &str) {
        let path = package_dir.join(script);
        if !self.runtime.exists(&path) {
            warn!("Hook {} not found in {:?}", script, package_dir);
            return;
        }
        if let Err(e) = self.hooks.run(&path) {
            warn!("Hook {} failed: {}", script, e);
        }
    }
}
