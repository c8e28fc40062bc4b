use anyhow::{Context, Result, anyhow};
use log::debug;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::package::Manifest;
use crate::runtime::Runtime;

use super::Extractor;

/// Name of the manifest entry every package artifact must carry.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Extractor for zip package artifacts.
pub struct ZipExtractor;

impl ZipExtractor {
    fn open_archive<R: Runtime + 'static>(
        runtime: &R,
        archive: &Path,
    ) -> Result<ZipArchive<Cursor<Vec<u8>>>> {
        let mut reader = runtime
            .open(archive)
            .with_context(|| format!("Failed to open archive at {:?}", archive))?;

        // zip requires Read + Seek, but Runtime::open only hands out a reader.
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive))?;

        ZipArchive::new(Cursor::new(buffer)).context("Failed to parse package archive")
    }
}

impl Extractor for ZipExtractor {
    fn read_manifest<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive: &Path,
    ) -> Result<Manifest> {
        let mut zip = Self::open_archive(runtime, archive)?;
        let entry = zip
            .by_name(MANIFEST_ENTRY)
            .map_err(|_| anyhow!("Archive has no {} at its root", MANIFEST_ENTRY))?;

        serde_json::from_reader(entry).context("Failed to parse the embedded manifest")
    }

    #[tracing::instrument(skip(self, runtime))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive: &Path,
        dest: &Path,
    ) -> Result<()> {
        debug!("Extracting package archive to {:?}...", dest);

        let mut zip = Self::open_archive(runtime, archive)?;
        runtime.create_dir_all(dest)?;

        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .with_context(|| format!("Failed to read archive entry {}", i))?;

            let Some(relative) = entry.enclosed_name() else {
                debug!("Skipping archive entry with unsafe path: {}", entry.name());
                continue;
            };
            let out_path = dest.join(relative);

            if entry.is_dir() {
                runtime.create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent()
                && !runtime.exists(parent)
            {
                runtime.create_dir_all(parent)?;
            }

            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .with_context(|| format!("Failed to decompress {}", entry.name()))?;
            runtime.write(&out_path, &contents)?;

            if let Some(mode) = entry.unix_mode() {
                runtime.set_permissions(&out_path, mode)?;
            }
        }

        Ok(())
    }
}
