//! Write-temp-file-then-rename primitive (§B.7). Shared by the Catalog
//! Store's file backend and the Analytics Engine's dated-snapshot cache —
//! kept as its own module since the relational backend has no use for it.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: File,
}

impl AtomicWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = Self::temp_path(&final_path);
        let file = File::create(&temp_path)?;
        Ok(Self {
            temp_path,
            final_path,
            file,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    /// Sync, flush, then atomically rename the temp file onto the final path.
    pub fn commit(mut self) -> Result<()> {
        self.file.sync_all()?;
        self.file.flush()?;
        let temp_path = self.temp_path.clone();
        let final_path = self.final_path.clone();
        std::mem::forget(self); // don't let Drop delete the temp file we're about to rename
        fs::rename(&temp_path, &final_path)?;
        Ok(())
    }

    fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Write `data` to `path` atomically in one call: the common case used by
/// callers that don't need the incremental `write` API.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let mut writer = AtomicWriter::new(path)?;
    writer.write(data)?;
    writer.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_commit_produces_final_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/catalog.json");
        write_atomic(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn drop_without_commit_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        {
            let mut writer = AtomicWriter::new(&path).unwrap();
            writer.write(b"uncommitted").unwrap();
        }
        assert!(!path.exists());
        assert!(!dir.path().join("catalog.json.tmp").exists());
    }

    #[test]
    fn commit_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
