//! Package artifact archives.
//!
//! Every package ships as a zip archive carrying a `manifest.json` at its
//! root plus the files to install. The [`Extractor`] trait is the engine's
//! only view of the format.

mod zip;

use anyhow::Result;
use std::path::Path;

use crate::package::Manifest;
use crate::runtime::Runtime;

pub use zip::ZipExtractor;

/// Access to a downloaded package artifact.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Read and parse the manifest embedded at the archive root.
    fn read_manifest<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive: &Path,
    ) -> Result<Manifest>;

    /// Unpack the archive contents into `dest`.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive: &Path,
        dest: &Path,
    ) -> Result<()>;
}
