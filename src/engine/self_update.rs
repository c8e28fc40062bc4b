//! Self-update.
//!
//! The package manager's own artifact lives in the catalog under a
//! dedicated identity that sits in both exclusion sets: it installs like
//! any package but never registers, and never shows up in listings. Unlike
//! catalog-driven updates, version selection here is strictly numeric
//! (`major.minor.patch`), since the running binary must know whether a
//! catalog version is actually newer than itself.

use log::info;

use crate::archive::Extractor;
use crate::catalog::{Catalog, find_package};
use crate::hooks::HookRunner;
use crate::runtime::Runtime;
use crate::version::TripleVersion;

use super::{Engine, EngineError, EngineResult, SelfUpdateOutcome};

impl<R, C, X, H> Engine<R, C, X, H>
where
    R: Runtime + 'static,
    C: Catalog,
    X: Extractor,
    H: HookRunner,
{
    /// Install the newest catalog version of the engine itself that is
    /// strictly greater than `current`. Catalog versions that are not
    /// numeric triples are ignored.
    pub async fn self_update(&self, current: &str) -> EngineResult<SelfUpdateOutcome> {
        let running: TripleVersion = current.parse().map_err(EngineError::Other)?;

        let index = self.index().await?;
        let self_id = self.config.self_id();
        let entry = find_package(&index, &self_id)
            .ok_or_else(|| EngineError::NotFoundInCatalog(self_id.clone()))?;

        let newest = entry
            .versions
            .iter()
            .filter_map(|record| {
                record
                    .version
                    .parse::<TripleVersion>()
                    .ok()
                    .map(|version| (version, record))
            })
            .filter(|(version, _)| *version > running)
            .max_by_key(|(version, _)| *version);

        let Some((version, record)) = newest else {
            info!("{} is already the newest version", current);
            return Ok(SelfUpdateOutcome::UpToDate {
                version: current.to_string(),
            });
        };

        info!("Updating {} {} -> {}", self_id, current, version);
        let mut resolving = Vec::new();
        self.install_inner(&index, &self_id, Some(&record.version), &mut resolving)
            .await?;

        Ok(SelfUpdateOutcome::Updated {
            from: current.to_string(),
            to: record.version.clone(),
        })
    }
}
