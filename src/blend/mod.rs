//! Format-specific blenders.
//!
//! Each blender folds an ordered list of fragment files into one canonical
//! document string under the rules carried by the target's
//! [`MergeKind`](crate::config::MergeKind) variant:
//!
//! - [`structured`] — tree merge for yaml / json / toml
//! - [`kdl`] — hierarchical named blocks with `(name, head)` identity
//! - [`ini`] — flat sections of key/value lines
//!
//! All three serialize deterministically and end the document with exactly
//! one newline; recomputing a blend from unchanged inputs yields identical
//! bytes.

mod ini;
mod kdl;
mod structured;

pub use ini::blend_ini;
pub use kdl::blend_kdl;
pub use structured::blend_structured;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from reading, parsing, or serializing fragments.
#[derive(Debug, Error)]
pub enum BlendError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: not valid UTF-8", path.display())]
    InvalidUtf8 { path: PathBuf },

    #[error("parse {}: {detail}", path.display())]
    Parse { path: PathBuf, detail: String },

    #[error("serialize merged document: {detail}")]
    Serialize { detail: String },
}

/// Read a fragment as UTF-8 text.
fn read_utf8(path: &Path) -> Result<String, BlendError> {
    let bytes = fs::read(path).map_err(|source| BlendError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| BlendError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}
