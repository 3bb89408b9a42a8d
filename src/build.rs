//! Per-target build dispatch: blend or concatenate, then hash.

use std::path::PathBuf;

use thiserror::Error;

use crate::blend::{blend_ini, blend_kdl, blend_structured, BlendError};
use crate::config::{Format, MergeKind, Target};
use crate::output::{normalize_files, sha256_hex, NormalizeError};

/// Canonical bytes for one target plus their content hash.
#[derive(Debug)]
pub struct BuildOutput {
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub hash: String,
    /// Whether the merge path produced the bytes (vs. plain concatenation).
    pub merged: bool,
}

/// Errors from building a target's output.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Blend(#[from] BlendError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("merge rules for {rules} do not match target format {format}")]
    RuleMismatch { format: Format, rules: &'static str },
}

/// Produce the canonical output for `target` from the planned `files`.
///
/// Pure with respect to `(target, file contents)`: recomputing yields an
/// identical byte sequence and hash.
pub fn build_target(target: &Target, files: &[PathBuf]) -> Result<BuildOutput, BuildError> {
    let text = match (&target.merge, target.format) {
        (Some(MergeKind::Structured(rules)), Format::Yaml | Format::Json | Format::Toml) => {
            Some(blend_structured(target.format, rules, files)?)
        }
        (Some(MergeKind::Kdl(rules)), Format::Kdl) => Some(blend_kdl(rules, files)?),
        (Some(MergeKind::Ini(rules)), Format::Ini) => Some(blend_ini(rules, files)?),
        (Some(kind), format) => {
            // Validation constructs rules from the format, so this only
            // trips on a hand-built Target.
            return Err(BuildError::RuleMismatch {
                format,
                rules: match kind {
                    MergeKind::Structured(_) => "structured formats",
                    MergeKind::Kdl(_) => "kdl",
                    MergeKind::Ini(_) => "ini",
                },
            });
        }
        (None, _) => None,
    };

    match text {
        Some(text) => Ok(BuildOutput {
            hash: sha256_hex(text.as_bytes()),
            bytes: text.into_bytes(),
            merged: true,
        }),
        None => {
            let text = normalize_files(files)?;
            Ok(BuildOutput {
                hash: sha256_hex(text.as_bytes()),
                bytes: text.into_bytes(),
                merged: false,
            })
        }
    }
}
