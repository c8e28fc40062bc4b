use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::PackageId;

/// One dependency declaration inside a manifest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DependencyRef {
    /// Identity of the required package (`author@name`).
    pub id: String,
    /// Exact version to install; the catalog's latest when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The descriptive record for one package version.
///
/// `dependents` is derived state owned by the registry: it is computed when
/// packages register and is never trusted from an archive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pub author: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
    #[serde(
        default,
        rename = "postInstallScript",
        skip_serializing_if = "Option::is_none"
    )]
    pub post_install: Option<String>,
    #[serde(
        default,
        rename = "uninstallScript",
        skip_serializing_if = "Option::is_none"
    )]
    pub uninstall: Option<String>,
    /// Identities of registered packages that declared this one as a dependency.
    #[serde(default)]
    pub dependents: BTreeSet<String>,
    /// Fields this version of depot does not know about; preserved on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
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
}
