//! Best-effort removal of files created during a processing run.

use log::*;
use std::io;
use std::path::{Path, PathBuf};

/// Paths created by the current run, in creation order.
///
/// Owned by a single run. On failure every recorded path is removed in reverse
/// order of creation; removal errors are logged and never raised.
#[derive(Debug, Default)]
pub struct CleanupSet {
    paths: Vec<PathBuf>,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl CleanupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path created by the run. Re-recording a path is a no-op.
    pub fn record(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            debug!("Tracking {} for cleanup", path.display());
            self.paths.push(path);
        }
    }

    /// Stop tracking a path, e.g. once the run removed it itself.
    pub fn forget(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every recorded path, newest first, and empty the set.
    ///
    /// Paths that no longer exist count as removed.
    pub fn run(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.paths.is_empty() {
            return report;
        }

        info!("Cleaning up created files due to failure...");
        while let Some(path) = self.paths.pop() {
            match remove_path(&path) {
                Ok(()) => {
                    info!("Removed {}", path.display());
                    report.removed.push(path);
                }
                Err(e) => {
                    warn!("Failed to clean up {}: {}", path.display(), e);
                    report.failed.push(path);
                }
            }
        }
        report
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_removes_in_reverse_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2024-05-01_10.00");
        let frames = target.join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        let video = target.join("small.mp4");
        std::fs::write(&video, b"video").unwrap();
        std::fs::write(frames.join("frame_0001.jpg"), b"jpg").unwrap();

        let mut cleanup = CleanupSet::new();
        cleanup.record(&target);
        cleanup.record(&video);
        cleanup.record(&frames);

        let report = cleanup.run();
        assert_eq!(report.removed, vec![frames, video, target.clone()]);
        assert!(report.failed.is_empty());
        assert!(!target.exists());
        assert!(cleanup.is_empty());
    }

    #[test]
    fn test_missing_paths_count_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut cleanup = CleanupSet::new();
        cleanup.record(dir.path().join("never-created.m4a"));

        let report = cleanup.run();
        assert_eq!(report.removed.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_removal_failure_is_reported_and_does_not_stop_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let note = dir.path().join("note.txt");
        std::fs::write(&note, b"notes").unwrap();
        let audio = dir.path().join("audio.m4a");
        std::fs::write(&audio, b"audio").unwrap();
        // A regular file cannot have children, so this path fails with ENOTDIR.
        let unremovable = note.join("frames");

        let mut cleanup = CleanupSet::new();
        cleanup.record(&audio);
        cleanup.record(&unremovable);

        let report = cleanup.run();
        assert_eq!(report.failed, vec![unremovable]);
        assert_eq!(report.removed, vec![audio.clone()]);
        assert!(!audio.exists());
        assert!(cleanup.is_empty());
    }

    #[test]
    fn test_record_is_idempotent_and_forget_untracks() {
        let mut cleanup = CleanupSet::new();
        cleanup.record("a");
        cleanup.record("b");
        cleanup.record("a");
        assert_eq!(cleanup.len(), 2);

        cleanup.forget(Path::new("a"));
        assert_eq!(cleanup.paths(), [PathBuf::from("b")]);
    }

    #[test]
    fn test_run_twice_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.txt");
        std::fs::write(&file, b"notes").unwrap();

        let mut cleanup = CleanupSet::new();
        cleanup.record(&file);
        assert_eq!(cleanup.run().removed.len(), 1);
        assert_eq!(cleanup.run(), CleanupReport::default());
    }
}
