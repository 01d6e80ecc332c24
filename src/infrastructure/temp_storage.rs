//! Scoped on-disk copy of an upload
//!
//! Extractors work on paths, so every upload is written to a temp file
//! first. The file is removed when the guard is dropped, which covers
//! success, early return, timeout and panic unwinding alike.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

pub struct ScopedTempFile {
    file: NamedTempFile,
}

impl ScopedTempFile {
    /// Writes `bytes` to a fresh temp file ending in `suffix`.
    /// `dir` overrides the OS temp directory.
    pub fn write(bytes: &[u8], suffix: &str, dir: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix("upload-").suffix(suffix);
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;
        debug!("Wrote {} bytes to {}", bytes.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}
