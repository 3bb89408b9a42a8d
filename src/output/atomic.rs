//! Same-directory temp + fsync + rename write protocol.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from the atomic write protocol, each tagged with the path involved.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("create temp file in {}: {source}", path.display())]
    CreateTemp {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write temp file for {}: {source}", path.display())]
    WriteTemp {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("sync temp file for {}: {source}", path.display())]
    SyncTemp {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("rename temp file over {}: {source}", path.display())]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("output path {} has no parent directory", path.display())]
    NoParent { path: PathBuf },
}

/// Write `bytes` to `path` atomically.
///
/// The temp file lives in the destination's directory so the final rename
/// stays on one filesystem. Readers of `path` observe either the old or the
/// new content in full; the destination is never modified in place. The temp
/// file is removed on any failure (tempfile handles this on drop).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let dir = path.parent().ok_or_else(|| WriteError::NoParent {
        path: path.to_path_buf(),
    })?;

    fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".confb-")
        .tempfile_in(dir)
        .map_err(|source| WriteError::CreateTemp {
            path: dir.to_path_buf(),
            source,
        })?;

    tmp.write_all(bytes).map_err(|source| WriteError::WriteTemp {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.flush().map_err(|source| WriteError::WriteTemp {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.as_file()
        .sync_all()
        .map_err(|source| WriteError::SyncTemp {
            path: path.to_path_buf(),
            source,
        })?;

    tmp.persist(path).map_err(|e| WriteError::Rename {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    // Best-effort fsync of the parent directory.
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }

    Ok(())
}
