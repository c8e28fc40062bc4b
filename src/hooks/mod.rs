//! Hook execution capability.
//!
//! Packages may ship post-install and uninstall scripts. The engine never
//! spawns processes itself; it asks this one-method capability to run a
//! script and only cares whether it succeeded.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

#[cfg_attr(test, mockall::automock)]
pub trait HookRunner: Send + Sync {
    /// Run the executable at `script`. Err when it cannot be spawned or
    /// exits non-zero.
    fn run(&self, script: &Path) -> Result<()>;
}

/// Runs hooks as child processes from the package directory.
pub struct ProcessHookRunner;

impl HookRunner for ProcessHookRunner {
    #[tracing::instrument(skip(self))]
    fn run(&self, script: &Path) -> Result<()> {
        debug!("Running hook {:?}", script);

        let mut command = Command::new(script);
        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }

        let status = command
            .status()
            .with_context(|| format!("Failed to spawn hook {:?}", script))?;

        if !status.success() {
            anyhow::bail!("Hook {:?} exited with {}", script, status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_hook() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "ok.sh", "exit 0");

        assert!(ProcessHookRunner.run(&script).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_hook_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "fail.sh", "exit 3");

        let err = ProcessHookRunner.run(&script).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn test_missing_hook_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("absent.sh");

        assert!(ProcessHookRunner.run(&script).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_hook_runs_from_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "touch.sh", "touch marker");

        ProcessHookRunner.run(&script).unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
