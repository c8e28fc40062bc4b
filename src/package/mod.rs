//! Package identity and manifest types.
//!
//! A package is named by its `author@name` pair across the catalog and the
//! registry. The manifest is the authoritative description of one package
//! version: it ships inside the artifact and is mirrored into the registry
//! once the package is installed.

mod manifest;

use std::fmt;
use std::str::FromStr;

pub use manifest::{DependencyRef, Manifest};

/// Package identifier (`author@name` format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    pub author: String,
    pub name: String,
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.author, self.name)
    }
}

impl FromStr for PackageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('@').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            anyhow::bail!("Invalid package id. Expected 'author@name'.")
        } else {
            Ok(PackageId {
                author: parts[0].to_string(),
                name: parts[1].to_string(),
            })
        }
    }
}
