//! Cross-checks an embedded manifest against the catalog entry it claims
//! to describe. Any disagreement is fatal for the install.

use crate::catalog::CatalogPackage;
use crate::package::Manifest;

use super::error::EngineError;

pub(super) fn check_against_catalog(
    manifest: &Manifest,
    entry: &CatalogPackage,
    version: &str,
) -> Result<(), EngineError> {
    let id = entry.identity();

    if manifest.author != entry.author || manifest.name != entry.name {
        return Err(EngineError::ManifestInconsistent {
            id,
            reason: format!(
                "archive identifies itself as {}@{}",
                manifest.author, manifest.name
            ),
        });
    }
    if manifest.version != version {
        return Err(EngineError::ManifestInconsistent {
            id,
            reason: format!(
                "archive carries version '{}', expected '{}'",
                manifest.version, version
            ),
        });
    }
    if manifest.description != entry.description {
        return Err(EngineError::ManifestInconsistent {
            id,
            reason: "description differs from the catalog".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogPackage;

    fn entry() -> CatalogPackage {
        CatalogPackage {
            author: "Acme".into(),
            name: "tool".into(),
            description: "A tool".into(),
            versions: vec![],
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            author: "Acme".into(),
            name: "tool".into(),
            description: "A tool".into(),
            version: "1.0.0".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_matching_manifest_passes() {
        assert!(check_against_catalog(&manifest(), &entry(), "1.0.0").is_ok());
    }

    #[test]
    fn test_identity_mismatch() {
        let mut m = manifest();
        m.name = "impostor".into();
        let err = check_against_catalog(&m, &entry(), "1.0.0").unwrap_err();
        assert!(err.to_string().contains("identifies itself"));
    }

    #[test]
    fn test_version_mismatch() {
        let err = check_against_catalog(&manifest(), &entry(), "2.0.0").unwrap_err();
        assert!(err.to_string().contains("expected '2.0.0'"));
    }

    #[test]
    fn test_description_mismatch() {
        let mut m = manifest();
        m.description = "Something else".into();
        let err = check_against_catalog(&m, &entry(), "1.0.0").unwrap_err();
        assert!(err.to_string().contains("description"));
    }
}
