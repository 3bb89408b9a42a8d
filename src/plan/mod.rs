//! Source resolution: expand, sort, and dedupe a target's source list into a
//! concrete build plan.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{expand_tilde, Config, Dedupe, SortOrder, Target};

/// The concrete build plan for one target: which files to read, in order.
#[derive(Debug, Clone)]
pub struct Plan {
    pub name: String,
    /// Final output path (already tilde-expanded by the loader).
    pub output: PathBuf,
    /// Absolute paths to read, in order. Never empty.
    pub files: Vec<PathBuf>,
    /// Absolute paths dropped by `by_path` dedupe.
    pub deduped: Vec<PathBuf>,
}

/// Errors from resolving a target's sources.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{target}: sources[{index}] invalid glob {pattern:?}: {source}")]
    InvalidGlob {
        target: String,
        index: usize,
        pattern: String,
        source: glob::PatternError,
    },

    #[error("{target}: sources[{index}] pattern {pattern:?} matched no files")]
    EmptyGlob {
        target: String,
        index: usize,
        pattern: String,
    },

    #[error("{target}: sources[{index}] {path} is a directory (use a glob like {path}/*)")]
    IsDirectory {
        target: String,
        index: usize,
        path: String,
    },

    #[error("{target}: sources[{index}] file {path:?}: {source}")]
    Stat {
        target: String,
        index: usize,
        path: String,
        source: std::io::Error,
    },

    #[error("{target}: resolved file list is empty")]
    EmptyPlan { target: String },
}

/// Resolve globs, expand `~`, apply sort + optional + dedupe rules.
///
/// Deterministic for a fixed filesystem snapshot and configuration.
pub fn resolve(
    config: &Config,
    target: &Target,
    output_override: Option<&Path>,
) -> Result<Plan, PlanError> {
    let output = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| target.output.clone());

    let mut files = Vec::new();
    let mut deduped = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for (index, src) in target.sources.iter().enumerate() {
        let path = absolutize(&config.base_dir, &src.path);

        let matches = if has_glob_meta(&path) {
            expand_glob(target, index, src.optional, src.sort, &path)?
        } else {
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    return Err(PlanError::IsDirectory {
                        target: target.name.clone(),
                        index,
                        path: src.path.clone(),
                    });
                }
                Ok(_) => vec![path],
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && src.optional => continue,
                Err(source) => {
                    return Err(PlanError::Stat {
                        target: target.name.clone(),
                        index,
                        path: src.path.clone(),
                        source,
                    });
                }
            }
        };

        for m in matches {
            if target.dedupe == Dedupe::ByPath {
                if seen.contains(&m) {
                    deduped.push(m);
                    continue;
                }
                seen.insert(m.clone());
            }
            files.push(m);
        }
    }

    if files.is_empty() {
        return Err(PlanError::EmptyPlan {
            target: target.name.clone(),
        });
    }

    Ok(Plan {
        name: target.name.clone(),
        output,
        files,
        deduped,
    })
}

/// Parent directories of every source path, for filesystem watch
/// registration. For a glob this is the directory portion of the pattern.
pub fn watch_dirs(config: &Config, target: &Target) -> HashSet<PathBuf> {
    let mut dirs = HashSet::new();
    for src in &target.sources {
        let path = absolutize(&config.base_dir, &src.path);
        if let Some(parent) = path.parent() {
            dirs.insert(parent.to_path_buf());
        }
    }
    dirs
}

/// Expand `~` and anchor relative paths at the config's base directory.
fn absolutize(base_dir: &Path, path: &str) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

fn has_glob_meta(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?', '['])
}

fn expand_glob(
    target: &Target,
    index: usize,
    optional: bool,
    sort: SortOrder,
    pattern: &Path,
) -> Result<Vec<PathBuf>, PlanError> {
    let pattern_str = pattern.to_string_lossy();

    let paths = glob::glob(&pattern_str).map_err(|source| PlanError::InvalidGlob {
        target: target.name.clone(),
        index,
        pattern: pattern_str.to_string(),
        source,
    })?;

    let mut matches: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();

    // Explicit deterministic sort; never rely on platform glob ordering.
    if sort != SortOrder::None {
        matches.sort();
    }

    if matches.is_empty() && !optional {
        return Err(PlanError::EmptyGlob {
            target: target.name.clone(),
            index,
            pattern: pattern_str.to_string(),
        });
    }

    Ok(matches)
}
