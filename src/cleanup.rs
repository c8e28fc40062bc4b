//! Cleanup tracking for temporary artifacts.
//!
//! Downloads land in temporary files that must be released on every exit
//! path, including an operator interrupt. Paths are registered here while an
//! operation is in flight; the Ctrl-C handler in `main` drains the context
//! before exiting.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Tracks paths that need cleanup on interruption.
#[derive(Default)]
pub struct CleanupContext {
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path to be cleaned up on interruption.
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Drop a path from the cleanup list (e.g., once it has been released).
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every registered path from disk.
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Type alias for a shared cleanup context.
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

/// Create a new shared cleanup context.
pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}
