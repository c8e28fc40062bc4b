//! Orphan cascade.
//!
//! An orphan is a package whose recorded `dependents` set is non-empty but
//! no longer intersects the registry: everything that once pulled it in has
//! been removed. Packages installed deliberately (empty dependent history)
//! are never touched.

use log::info;

use crate::archive::Extractor;
use crate::catalog::Catalog;
use crate::hooks::HookRunner;
use crate::runtime::Runtime;

use super::{Engine, EngineResult, UninstallOutcome};

impl<R, C, X, H> Engine<R, C, X, H>
where
    R: Runtime + 'static,
    C: Catalog,
    X: Extractor,
    H: HookRunner,
{
    /// Remove orphaned packages until a full pass finds none, and return
    /// how many were removed. Removing one orphan can expose the next one
    /// up a dependency chain, hence the fixed-point loop.
    pub fn autoremove(&self) -> EngineResult<usize> {
        let mut removed = 0;
        loop {
            let registry = self.store().load()?;
            let orphans = registry.orphans();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                info!("Removing orphaned package {}", id);
                if let UninstallOutcome::Uninstalled { .. } = self.uninstall_unchecked(&id)? {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}
