//! Engine configuration - install root, catalog location and policy sets.
//!
//! All of this travels as one explicit value handed to the engine
//! constructor, so tests can run against a temporary root and an injected
//! catalog without touching process-wide state.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::package::PackageId;
use crate::runtime::Runtime;

/// Identity of the package manager's own self-update artifact. It is
/// installable but never becomes an ordinary dependency node, so it sits in
/// both exclusion sets by default.
pub const SELF_PACKAGE_ID: &str = "depot@depot";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory that receives package directories and `installed.json`.
    pub install_root: PathBuf,
    /// URL of the catalog index document.
    pub catalog_url: String,
    /// Identities never shown by list/search output.
    pub hidden: BTreeSet<String>,
    /// Identities installed without a registry entry.
    pub unregistered: BTreeSet<String>,
}

impl EngineConfig {
    /// Resolve the effective configuration from overrides and defaults.
    pub fn resolve<R: Runtime>(
        runtime: &R,
        root_override: Option<PathBuf>,
        catalog_url: Option<String>,
    ) -> Result<Self> {
        let install_root = match root_override {
            Some(path) => path,
            None => default_install_root(runtime)?,
        };
        info!("Using install root: {}", install_root.display());

        let mut excluded = BTreeSet::new();
        excluded.insert(SELF_PACKAGE_ID.to_string());

        Ok(Self {
            install_root,
            catalog_url: catalog_url.unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            hidden: excluded.clone(),
            unregistered: excluded,
        })
    }

    /// Path of the registry document.
    pub fn registry_path(&self) -> PathBuf {
        self.install_root.join("installed.json")
    }

    /// Destination directory for a package's files.
    ///
    /// Returns: `<install_root>/<author>/<name>`
    pub fn package_dir(&self, id: &PackageId) -> PathBuf {
        self.install_root.join(&id.author).join(&id.name)
    }

    /// The engine's own identity for self-update.
    pub fn self_id(&self) -> PackageId {
        PackageId {
            author: "depot".into(),
            name: "depot".into(),
        }
    }

    pub fn is_hidden(&self, id: &PackageId) -> bool {
        self.hidden.contains(&id.to_string())
    }

    pub fn is_unregistered(&self, id: &PackageId) -> bool {
        self.unregistered.contains(&id.to_string())
    }
}

/// Get the default installation root directory.
#[tracing::instrument(skip(runtime))]
fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_install_root().join("packages"))
    } else {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(".depot").join("packages"))
    }
}

#[cfg(target_os = "macos")]
fn system_install_root() -> PathBuf {
    PathBuf::from("/opt/depot")
}

#[cfg(target_os = "windows")]
fn system_install_root() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\depot")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_install_root() -> PathBuf {
    PathBuf::from("/usr/local/depot")
}
