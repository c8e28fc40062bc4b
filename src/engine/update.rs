//! Update and repair orchestration.
//!
//! Catalog-driven updates compare the installed version name against the
//! catalog's latest by exact string equality; only self-update (see
//! `self_update.rs`) uses the numeric comparator. An update is an uninstall
//! followed by a fresh install, with the recorded dependents carried across
//! the gap so reverse-dependency history survives the replacement.

use log::{info, warn};

use crate::archive::Extractor;
use crate::catalog::{Catalog, CatalogPackage, find_package};
use crate::hooks::HookRunner;
use crate::package::PackageId;
use crate::runtime::Runtime;

use super::{Engine, EngineError, EngineResult, InstallOutcome, UpdateAllReport, UpdateOutcome};

impl<R, C, X, H> Engine<R, C, X, H>
where
    R: Runtime + 'static,
    C: Catalog,
    X: Extractor,
    H: HookRunner,
{
    /// Bring one package to the catalog's latest version. Installs it fresh
    /// when it is not registered yet.
    pub async fn update(&self, id: &PackageId) -> EngineResult<UpdateOutcome> {
        let index = self.index().await?;
        let entry =
            find_package(&index, id).ok_or_else(|| EngineError::NotFoundInCatalog(id.clone()))?;
        let latest = entry
            .latest()
            .ok_or_else(|| EngineError::VersionNotFound {
                id: id.clone(),
                version: "latest".to_string(),
            })?;

        let registry = self.store().load()?;
        let Some(current) = registry.get(id) else {
            info!("{} is not installed; installing {}", id, latest.version);
            let mut resolving = Vec::new();
            self.install_inner(&index, id, None, &mut resolving).await?;
            return Ok(UpdateOutcome::Installed {
                version: latest.version.clone(),
            });
        };

        if current.version == latest.version {
            info!("{} is already at {}", id, current.version);
            return Ok(UpdateOutcome::UpToDate {
                version: current.version.clone(),
            });
        }

        let from = current.version.clone();
        info!("Updating {} {} -> {}", id, from, latest.version);
        self.reinstall(&index, id, &latest.version).await?;
        Ok(UpdateOutcome::Updated {
            from,
            to: latest.version.clone(),
        })
    }

    /// Bring every registered package to the catalog's latest version.
    /// Packages missing from the catalog are skipped with a warning; one
    /// package's failure does not stop the sweep.
    pub async fn update_all(&self) -> EngineResult<UpdateAllReport> {
        let index = self.index().await?;
        let installed = self.store().load()?.installed;

        let mut report = UpdateAllReport::default();
        for manifest in installed {
            let id = manifest.identity();
            let Some(entry) = find_package(&index, &id) else {
                warn!("{} is not in the catalog, skipping", id);
                report.skipped.push(id);
                continue;
            };
            let Some(latest) = entry.latest() else {
                warn!("No latest version for {}, skipping", id);
                report.skipped.push(id);
                continue;
            };
            if manifest.version == latest.version {
                report.up_to_date += 1;
                continue;
            }

            info!("Updating {} {} -> {}", id, manifest.version, latest.version);
            match self.reinstall(&index, &id, &latest.version).await {
                Ok(()) => {
                    report
                        .updated
                        .push((id, manifest.version.clone(), latest.version.clone()));
                }
                Err(e) => {
                    warn!("Failed to update {}: {}", id, e);
                    report.failed.push((id, e));
                }
            }
        }
        Ok(report)
    }

    /// Reinstall the currently-installed version verbatim.
    pub async fn repair(&self, id: &PackageId) -> EngineResult<InstallOutcome> {
        let registry = self.store().load()?;
        let Some(current) = registry.get(id) else {
            return Err(EngineError::NotInstalled(id.clone()));
        };
        let version = current.version.clone();

        info!("Repairing {} {}", id, version);
        let index = self.index().await?;
        self.reinstall(&index, id, &version).await?;
        Ok(InstallOutcome::Installed { version })
    }

    /// Uninstall-then-install, carrying the recorded dependents across the
    /// gap so replacing an entry never drops reverse-dependency history.
    pub(super) async fn reinstall(
        &self,
        index: &[CatalogPackage],
        id: &PackageId,
        version: &str,
    ) -> EngineResult<()> {
        let registry = self.store().load()?;
        let prior_dependents = registry
            .get(id)
            .map(|m| m.dependents.clone())
            .unwrap_or_default();

        self.uninstall_unchecked(id)?;

        let mut resolving = Vec::new();
        self.install_inner(index, id, Some(version), &mut resolving)
            .await?;

        if !prior_dependents.is_empty() {
            self.store().extend_dependents(id, prior_dependents)?;
        }
        Ok(())
    }
}
