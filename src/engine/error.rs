use std::path::PathBuf;

use thiserror::Error;

use crate::package::PackageId;

/// Typed failures surfaced by the lifecycle engine.
///
/// The CLI front-end only formats these and picks an exit status; nothing
/// here escapes as an uncaught fault. Hook failures are deliberately absent:
/// they are logged and never abort an operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Package {0} not found in the catalog")]
    NotFoundInCatalog(PackageId),

    #[error("Version '{version}' of {id} not found in the catalog")]
    VersionNotFound { id: PackageId, version: String },

    /// Recoverable through explicit operator confirmation at the prompt;
    /// this variant means the operator declined (or no confirmation came).
    #[error("Checksum of {id} does not match the catalog; installation aborted")]
    IntegrityMismatch { id: PackageId },

    #[error("Manifest of {id} does not match the catalog: {reason}")]
    ManifestInconsistent { id: PackageId, reason: String },

    #[error("Failed to install dependency {dependency} of {id}: {source}")]
    DependencyFailed {
        id: PackageId,
        dependency: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Cyclic dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    #[error("Registry at {path:?} is unreadable: {reason}")]
    RegistryCorrupt { path: PathBuf, reason: String },

    #[error("Permission denied while writing to {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("Package {0} is not installed")]
    NotInstalled(PackageId),

    #[error("Aborted by the operator")]
    UserAborted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let id: PackageId = "Acme@tool".parse().unwrap();

        let err = EngineError::NotFoundInCatalog(id.clone());
        assert_eq!(err.to_string(), "Package Acme@tool not found in the catalog");

        let err = EngineError::CyclicDependency {
            chain: vec!["a@a".into(), "b@b".into(), "a@a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic dependency: a@a -> b@b -> a@a");

        let err = EngineError::DependencyFailed {
            id: id.clone(),
            dependency: "Acme@core".into(),
            source: Box::new(EngineError::VersionNotFound {
                id: "Acme@core".parse().unwrap(),
                version: "2.0.0".into(),
            }),
        };
        assert!(err.to_string().contains("Acme@core"));
        assert!(err.to_string().contains("2.0.0"));
    }
}
