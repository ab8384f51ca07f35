use log::{info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;

/// Files and directories left behind by one detection run.
#[derive(Debug, Default, Clone)]
pub struct CleanupTask {
    pub files: Vec<PathBuf>,
    /// Request-private directories, removed with their contents after the
    /// files.
    pub dirs: Vec<PathBuf>,
}

impl CleanupTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.files.push(path.into());
        self
    }

    pub fn dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.dirs.push(path.into());
        self
    }

    /// Best-effort removal; returns how many paths could not be removed.
    pub async fn run(self) -> usize {
        let total = self.files.len() + self.dirs.len();
        match spawn_blocking(move || cleanup(&self.files, &self.dirs)).await {
            Ok(failures) => failures,
            Err(err) => {
                warn!("Cleanup task panicked: {}", err);
                total
            }
        }
    }
}

/// Deletes every path independently. Failures are logged, never raised.
pub fn cleanup(files: &[PathBuf], dirs: &[PathBuf]) -> usize {
    let mut failures = 0;
    for path in files {
        if !delete_file(path) {
            failures += 1;
        }
    }
    for dir in dirs {
        if !delete_dir(dir) {
            failures += 1;
        }
    }
    failures
}

fn delete_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Deleted file: {:?}", path);
            true
        }
        Err(err) if err.kind() == ErrorKind::NotFound => true,
        Err(err) => {
            warn!("Failed to cleanup temporary file {:?}: {}", path, err);
            false
        }
    }
}

fn delete_dir(path: &Path) -> bool {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            info!("Deleted directory: {:?}", path);
            true
        }
        Err(err) if err.kind() == ErrorKind::NotFound => true,
        Err(err) => {
            warn!("Failed to remove request directory {:?}: {}", path, err);
            false
        }
    }
}
