//! Numeric `major.minor.patch` ordering.
//!
//! Catalog version names are free-form strings and are compared by exact
//! equality everywhere except self-update, which requires this strict
//! three-part numeric form.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripleVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FromStr for TripleVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3 {
            anyhow::bail!("'{}' is not a major.minor.patch version", s);
        }

        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| anyhow::anyhow!("'{}' is not a major.minor.patch version", s))
        };

        Ok(TripleVersion {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
        })
    }
}

impl fmt::Display for TripleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
