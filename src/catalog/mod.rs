//! Catalog access - the read-only source of truth for available packages.
//!
//! The catalog is an externally published JSON index of packages, each with
//! an ordered set of versions. The engine only ever reads it; everything it
//! needs is behind the [`Catalog`] trait so tests can inject a fake index.

mod remote;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::package::PackageId;

pub use remote::{RemoteCatalog, DEFAULT_CATALOG_URL};

/// One installable version of a catalog package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct VersionRecord {
    #[serde(rename = "versionName")]
    pub version: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    /// Hex-encoded SHA-256 of the artifact.
    pub hash: String,
    /// At most one version per package carries this flag; the catalog owns
    /// that invariant, the engine just selects by it.
    #[serde(default)]
    pub latest: bool,
}

/// A package as described by the catalog index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CatalogPackage {
    pub author: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
}

impl CatalogPackage {
    pub fn identity(&self) -> PackageId {
        PackageId {
            author: self.author.clone(),
            name: self.name.clone(),
        }
    }

    /// Canonical `author@name` string.
    pub fn id_string(&self) -> String {
        format!("{}@{}", self.author, self.name)
    }

    /// The version flagged as latest, if any.
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.latest)
    }

    /// Exact match by version name.
    pub fn version_named(&self, name: &str) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.version == name)
    }
}

/// Find a package by identity in a fetched index.
pub fn find_package<'a>(
    index: &'a [CatalogPackage],
    id: &PackageId,
) -> Option<&'a CatalogPackage> {
    index
        .iter()
        .find(|p| p.author == id.author && p.name == id.name)
}

/// Source of the package index.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch the current index.
    async fn fetch(&self) -> Result<Vec<CatalogPackage>>;
}
