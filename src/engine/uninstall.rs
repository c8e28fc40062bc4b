//! Uninstall orchestration.
//!
//! Removal of a package that still has registered dependents is a blocking
//! condition: the engine reports them and proceeds only on explicit
//! operator confirmation. The safety gate queries the registry's recorded
//! `dependents`, filtered to identities that are still registered.

use log::{info, warn};

use crate::archive::Extractor;
use crate::catalog::Catalog;
use crate::hooks::HookRunner;
use crate::package::PackageId;
use crate::runtime::Runtime;

use super::{Engine, EngineError, EngineResult, UninstallOutcome};

impl<R, C, X, H> Engine<R, C, X, H>
where
    R: Runtime + 'static,
    C: Catalog,
    X: Extractor,
    H: HookRunner,
{
    /// Remove a package. An identity that is not registered is a no-op
    /// reported as `NotFound`.
    pub fn uninstall(&self, id: &PackageId) -> EngineResult<UninstallOutcome> {
        let registry = self.store().load()?;
        if !registry.contains(id) {
            return Ok(UninstallOutcome::NotFound);
        }

        let dependents = registry.registered_dependents(id);
        if !dependents.is_empty() {
            let names = dependents
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            warn!("{} is required by: {}", id, names);
            let proceed = self
                .runtime
                .confirm(&format!("{} is required by {}. Remove it anyway?", id, names))
                .map_err(EngineError::Other)?;
            if !proceed {
                return Err(EngineError::UserAborted);
            }
        }

        self.uninstall_unchecked(id)
    }

    /// Removal without the dependent gate; update, repair and autoremove
    /// come through here.
    pub(super) fn uninstall_unchecked(&self, id: &PackageId) -> EngineResult<UninstallOutcome> {
        let store = self.store();
        let mut registry = store.load()?;
        let Some(manifest) = registry.remove(id) else {
            return Ok(UninstallOutcome::NotFound);
        };

        // the uninstall hook runs first, while the files are still on disk
        let package_dir = self.config.package_dir(id);
        if let Some(script) = &manifest.uninstall {
            self.run_hook(&package_dir, script);
        }

        if self.runtime.exists(&package_dir) {
            self.runtime
                .remove_dir_all(&package_dir)
                .map_err(EngineError::Other)?;
        }
        self.remove_empty_author_dir(id);

        store.save(&registry)?;
        info!("Uninstalled {} {}", id, manifest.version);
        Ok(UninstallOutcome::Uninstalled {
            version: manifest.version,
        })
    }

    fn remove_empty_author_dir(&self, id: &PackageId) {
        let author_dir = self.config.install_root.join(&id.author);
        if self.runtime.exists(&author_dir)
            && let Ok(entries) = self.runtime.read_dir(&author_dir)
            && entries.is_empty()
        {
            let _ = self.runtime.remove_dir_all(&author_dir);
        }
    }
}
