//! Install orchestration.
//!
//! Resolution order for one package: registry check, catalog resolution,
//! artifact fetch, integrity check, manifest validation, dependencies
//! (depth first), file placement, post-install hook, registration. The
//! temporary artifact is released on every exit path. Dependencies already
//! installed when a later step fails are left in place; autoremove is the
//! cleanup path for them.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use log::{info, warn};

use crate::archive::Extractor;
use crate::catalog::{Catalog, CatalogPackage, VersionRecord, find_package};
use crate::checksum;
use crate::hooks::HookRunner;
use crate::package::PackageId;
use crate::runtime::Runtime;

use super::{Engine, EngineError, EngineResult, InstallOutcome};

impl<R, C, X, H> Engine<R, C, X, H>
where
    R: Runtime + 'static,
    C: Catalog,
    X: Extractor,
    H: HookRunner,
{
    /// Install a package and, recursively, its dependencies.
    ///
    /// Asking for an already-installed identity is a no-op reported as
    /// `AlreadyInstalled`; the registry is not touched.
    pub async fn install(
        &self,
        id: &PackageId,
        version: Option<&str>,
    ) -> EngineResult<InstallOutcome> {
        if self.store().load()?.contains(id) {
            info!("{} is already installed", id);
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let index = self.index().await?;
        let mut resolving = Vec::new();
        self.install_inner(&index, id, version, &mut resolving)
            .await
    }

    /// Recursive entry point shared with update/repair/self-update. The
    /// `resolving` chain is how a dependency cycle is caught before it can
    /// recurse forever.
    pub(super) fn install_inner<'a>(
        &'a self,
        index: &'a [CatalogPackage],
        id: &'a PackageId,
        version: Option<&'a str>,
        resolving: &'a mut Vec<PackageId>,
    ) -> BoxFuture<'a, EngineResult<InstallOutcome>> {
        Box::pin(async move {
            if self.store().load()?.contains(id) {
                return Ok(InstallOutcome::AlreadyInstalled);
            }
            if resolving.contains(id) {
                let mut chain: Vec<String> = resolving.iter().map(ToString::to_string).collect();
                chain.push(id.to_string());
                return Err(EngineError::CyclicDependency { chain });
            }

            resolving.push(id.clone());
            let result = self.install_one(index, id, version, resolving).await;
            resolving.pop();
            result
        })
    }

    async fn install_one(
        &self,
        index: &[CatalogPackage],
        id: &PackageId,
        version: Option<&str>,
        resolving: &mut Vec<PackageId>,
    ) -> EngineResult<InstallOutcome> {
        let entry =
            find_package(index, id).ok_or_else(|| EngineError::NotFoundInCatalog(id.clone()))?;
        let record = match version {
            Some(v) => entry
                .version_named(v)
                .ok_or_else(|| EngineError::VersionNotFound {
                    id: id.clone(),
                    version: v.to_string(),
                })?,
            None => entry
                .latest()
                .ok_or_else(|| EngineError::VersionNotFound {
                    id: id.clone(),
                    version: "latest".to_string(),
                })?,
        };
        info!("Installing {} {}", id, record.version);

        let artifact = self.fetch_artifact(id, record).await?;
        let result = self
            .install_artifact(&artifact, index, entry, record, id, resolving)
            .await;
        self.release_artifact(&artifact);
        result
    }

    async fn install_artifact(
        &self,
        artifact: &Path,
        index: &[CatalogPackage],
        entry: &CatalogPackage,
        record: &VersionRecord,
        id: &PackageId,
        resolving: &mut Vec<PackageId>,
    ) -> EngineResult<InstallOutcome> {
        self.check_integrity(artifact, id, &record.hash)?;

        let mut manifest = self
            .extractor
            .read_manifest(&self.runtime, artifact)
            .map_err(|e| EngineError::ManifestInconsistent {
                id: id.clone(),
                reason: e.to_string(),
            })?;
        super::validate::check_against_catalog(&manifest, entry, &record.version)?;
        // dependents is registry-owned; whatever the archive claims is dropped
        manifest.dependents.clear();

        for dep in &manifest.dependencies {
            let dep_id: PackageId =
                dep.id
                    .parse()
                    .map_err(|e: anyhow::Error| EngineError::DependencyFailed {
                        id: id.clone(),
                        dependency: dep.id.clone(),
                        source: Box::new(EngineError::Other(e)),
                    })?;
            info!("Installing dependency {} of {}", dep_id, id);
            if let Err(e) = self
                .install_inner(index, &dep_id, dep.version.as_deref(), resolving)
                .await
            {
                return Err(EngineError::DependencyFailed {
                    id: id.clone(),
                    dependency: dep.id.clone(),
                    source: Box::new(e),
                });
            }
        }

        let dest = self.config.package_dir(id);
        self.place_files(artifact, &dest)?;

        if let Some(script) = manifest.post_install.clone() {
            self.run_hook(&dest, &script);
        }

        if self.config.is_unregistered(id) {
            info!("{} is excluded from the registry", id);
        } else {
            self.store().register(manifest)?;
        }

        Ok(InstallOutcome::Installed {
            version: record.version.clone(),
        })
    }

    /// Download the artifact into a temporary file, registered for cleanup
    /// in case of an interrupt.
    #[tracing::instrument(skip(self, record))]
    async fn fetch_artifact(
        &self,
        id: &PackageId,
        record: &VersionRecord,
    ) -> EngineResult<PathBuf> {
        let temp_path = self.runtime.temp_dir().join(format!(
            "depot-{}-{}-{}.zip",
            id.author, id.name, record.version
        ));
        self.cleanup.lock().unwrap().add(temp_path.clone());

        info!("Downloading {} from {}...", id, record.download_url);
        let destination = temp_path.clone();
        self.http
            .download_file(&record.download_url, || {
                self.runtime.create_file(&destination)
            })
            .await
            .map_err(|e| EngineError::Other(e.context(format!("Failed to download {}", id))))?;

        Ok(temp_path)
    }

    /// Every exit path, success or failure, releases the temporary artifact.
    fn release_artifact(&self, path: &Path) {
        if self.runtime.exists(path)
            && let Err(e) = self.runtime.remove_file(path)
        {
            warn!("Failed to remove temporary artifact {:?}: {}", path, e);
        }
        self.cleanup.lock().unwrap().remove(path);
    }

    /// A checksum mismatch is surfaced to the operator; installation goes on
    /// only after an explicit affirmative answer.
    fn check_integrity(&self, artifact: &Path, id: &PackageId, expected: &str) -> EngineResult<()> {
        let matches = checksum::matches_digest(&self.runtime, artifact, expected)
            .map_err(EngineError::Other)?;
        if matches {
            return Ok(());
        }

        warn!("Checksum mismatch for {}", id);
        let proceed = self
            .runtime
            .confirm(&format!(
                "Checksum of {} does not match the catalog. Install anyway?",
                id
            ))
            .map_err(EngineError::Other)?;
        if proceed {
            Ok(())
        } else {
            Err(EngineError::IntegrityMismatch { id: id.clone() })
        }
    }

    /// Place the package files, retrying once behind the elevation
    /// collaborator when the filesystem refuses the write.
    fn place_files(&self, artifact: &Path, dest: &Path) -> EngineResult<()> {
        match self.extractor.extract(&self.runtime, artifact, dest) {
            Ok(()) => Ok(()),
            Err(e) if is_permission_denied(&e) => {
                warn!(
                    "Permission denied while writing to {:?}; requesting elevation",
                    dest
                );
                self.runtime
                    .elevate()
                    .map_err(|_| EngineError::PermissionDenied {
                        path: dest.to_path_buf(),
                    })?;
                self.extractor
                    .extract(&self.runtime, artifact, dest)
                    .map_err(|_| EngineError::PermissionDenied {
                        path: dest.to_path_buf(),
                    })
            }
            Err(e) => Err(EngineError::Other(e)),
        }
    }
}

fn is_permission_denied(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
    })
}
