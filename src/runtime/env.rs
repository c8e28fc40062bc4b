//! Environment, system information and privilege operations.

use anyhow::Result;
use std::env;
use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn home_dir_impl(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn temp_dir_impl(&self) -> PathBuf {
        env::temp_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_privileged_impl(&self) -> bool {
        #[cfg(unix)]
        return nix::unistd::geteuid().as_raw() == 0;

        #[cfg(windows)]
        return is_elevated::is_elevated();
    }

    /// Relaunching with elevated privileges is owned by an external
    /// collaborator; this process can only tell the operator what to do.
    pub(crate) fn elevate_impl(&self) -> Result<()> {
        if self.is_privileged_impl() {
            return Ok(());
        }
        anyhow::bail!("insufficient privileges; re-run the command as an elevated user")
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};

    #[test]
    fn test_real_runtime_env_and_dirs() {
        let runtime = RealRuntime;

        // PATH should exist on all systems
        assert!(runtime.env_var("PATH").is_ok());

        // temp_dir should always return a valid path
        let temp = runtime.temp_dir();
        assert!(temp.is_absolute() || cfg!(windows));

        // is_privileged should work without panic
        let _ = runtime.is_privileged();
    }

    #[test]
    fn test_elevate_without_privilege() {
        let runtime = RealRuntime;
        if !runtime.is_privileged() {
            assert!(runtime.elevate().is_err());
        } else {
            assert!(runtime.elevate().is_ok());
        }
    }
}
