//! Staging of uploaded bytes into local preview files.
//!
//! A staged preview is the engine-side analog of a transient object URL:
//! it exists only while its page does, and must be released exactly once
//! when the page's preview is replaced or its batch is deleted.

use std::fs;
use std::io;
use std::path::PathBuf;

/// Storage for local preview files referenced by `ImageRef::Local`.
///
/// `release` is deliberately infallible: a failed delete is logged, not
/// surfaced, since the record removal it accompanies must still happen.
pub trait PreviewStore: Send + Sync {
    /// Persist uploaded bytes and return a locator for them.
    fn stage(&self, filename: &str, bytes: &[u8]) -> io::Result<String>;

    /// Release a previously staged locator.
    fn release(&self, locator: &str);
}

/// Filesystem-backed preview store.
///
/// Stages each upload under a fresh UUID-prefixed name so identical
/// filenames in one batch never collide.
pub struct FsPreviewStore {
    dir: PathBuf,
}

impl FsPreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PreviewStore for FsPreviewStore {
    fn stage(&self, filename: &str, bytes: &[u8]) -> io::Result<String> {
        fs::create_dir_all(&self.dir)?;
        let name = format!("{}_{filename}", uuid::Uuid::new_v4());
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn release(&self, locator: &str) {
        if let Err(e) = fs::remove_file(locator) {
            tracing::warn!(locator, error = %e, "Failed to remove preview file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_writes_bytes_under_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPreviewStore::new(dir.path());

        let a = store.stage("page.png", b"first").unwrap();
        let b = store.stage("page.png", b"second").unwrap();

        assert_ne!(a, b);
        assert_eq!(fs::read(&a).unwrap(), b"first");
        assert_eq!(fs::read(&b).unwrap(), b"second");
    }

    #[test]
    fn release_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPreviewStore::new(dir.path());

        let locator = store.stage("page.png", b"bytes").unwrap();
        store.release(&locator);
        assert!(!std::path::Path::new(&locator).exists());
    }

    #[test]
    fn release_of_missing_file_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPreviewStore::new(dir.path());
        store.release(&dir.path().join("never-staged.png").to_string_lossy());
    }
}
