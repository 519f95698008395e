//! Where encoded captures end up.

use std::fs;
use std::path::{Path, PathBuf};
use stillshot_core::{CaptureError, Result};
use tracing::info;

/// Opaque sink for encoded captures.
pub trait StorageSink {
    /// Persist `bytes` under `logical_name` and return where they went.
    fn write(&self, bytes: &[u8], logical_name: &str) -> Result<PathBuf>;
}

/// Writes `<root>/<logical_name>.<extension>`, creating `root` on demand.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
    extension: String,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "png".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The user's pictures directory, or the working directory when unknown.
    pub fn pictures() -> Self {
        let root = dirs::picture_dir()
            .map(|dir| dir.join("StillShot"))
            .unwrap_or_else(|| PathBuf::from("captures"));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, logical_name: &str) -> Result<PathBuf> {
        let valid = !logical_name.is_empty()
            && logical_name != "."
            && logical_name != ".."
            && !logical_name.contains(['/', '\\']);
        if !valid {
            return Err(CaptureError::Storage(format!(
                "invalid capture name {logical_name:?}"
            )));
        }
        Ok(self
            .root
            .join(format!("{logical_name}.{}", self.extension)))
    }
}

impl StorageSink for DirectoryStorage {
    fn write(&self, bytes: &[u8], logical_name: &str) -> Result<PathBuf> {
        let path = self.path_for(logical_name)?;
        fs::create_dir_all(&self.root)?;
        fs::write(&path, bytes)?;
        info!("Saved capture to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path().join("nested/out"));
        let path = storage.write(b"png-bytes", "capture_1").unwrap();
        assert_eq!(path, dir.path().join("nested/out/capture_1.png"));
        assert_eq!(fs::read(&path).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path()).with_extension("bin");
        let path = storage.write(&[1, 2, 3], "raw").unwrap();
        assert_eq!(path.extension().unwrap(), "bin");
    }

    #[test]
    fn test_extension_follows_encoder() {
        use crate::encoder::{ImageEncoder, PngEncoder};

        let dir = tempfile::tempdir().unwrap();
        let encoder = PngEncoder::default();
        let storage = DirectoryStorage::new(dir.path()).with_extension(encoder.extension());
        let bytes = encoder.encode(&[9, 9, 9, 255], 1, 1).unwrap();
        let path = storage.write(&bytes, "one").unwrap();
        assert_eq!(path, dir.path().join("one.png"));
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path());
        for name in ["", "..", "a/b", "a\\b"] {
            let err = storage.write(b"x", name).unwrap_err();
            assert!(matches!(err, CaptureError::Storage(_)), "{name:?}");
        }
    }
}
