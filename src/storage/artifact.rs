//! Request-scoped local copies of images
//!
//! Every artifact is a uniquely named file inside the scratch directory, owned by
//! exactly one workflow execution and deleted when dropped.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::Result;

const ARTIFACT_PREFIX: &str = "tryon-";

/// A local file that is removed when it goes out of scope
#[derive(Debug)]
pub struct TransientArtifact {
    path: Option<TempPath>,
}

impl TransientArtifact {
    pub fn path(&self) -> &Path {
        self.path.as_deref().expect("artifact path is only taken on drop")
    }
}

impl Deref for TransientArtifact {
    type Target = Path;
    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

impl AsRef<Path> for TransientArtifact {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

impl Drop for TransientArtifact {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let path_str = path.display().to_string();
            match path.close() {
                Ok(()) => debug!("Removed transient artifact {}", path_str),
                Err(e) => warn!("Failed to remove transient artifact {}: {}", path_str, e),
            }
        }
    }
}

/// Directory in which transient artifacts are allocated
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Allocate an empty artifact, keeping the extension of `hint` if it has one
    pub fn allocate(&self, hint: &str) -> Result<TransientArtifact> {
        let suffix = Path::new(hint)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;

        Ok(TransientArtifact {
            path: Some(file.into_temp_path()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_artifact_removed_on_drop() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let artifact = scratch.allocate("abc.jpg").unwrap();
        std::fs::write(artifact.path(), b"jpeg bytes").unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "jpg");
        assert!(path.starts_with(dir.path()));

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_paths() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let a = scratch.allocate("same.png").unwrap();
        let b = scratch.allocate("same.png").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_odd_hint_has_no_suffix() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let artifact = scratch.allocate("https://host/result?x=1").unwrap();
        assert!(artifact.path().extension().is_none());
    }

    #[test]
    fn test_creates_missing_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("scratch/nested");
        let scratch = ScratchSpace::new(&nested).unwrap();
        assert!(scratch.dir().is_dir());
    }
}
