//! Validated configuration model.
//!
//! These types are what the rest of the crate consumes. They are produced by
//! the loader from the raw serde structs in `load.rs`; by the time a
//! [`Config`] exists, every enum field holds a checked value and every merge
//! rule is consistent with its target's format.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A validated configuration document plus the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct Config {
    /// Schema version; only version 1 is accepted.
    pub version: u32,
    /// Build targets in document order. Non-empty, names unique.
    pub targets: Vec<Target>,
    /// Absolute directory of the configuration file. Relative source paths
    /// resolve against this.
    pub base_dir: PathBuf,
}

/// A single build target (one output file).
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub format: Format,
    /// Destination path, tilde-expanded at load time.
    pub output: PathBuf,
    /// Ordered source entries. Non-empty.
    pub sources: Vec<Source>,
    pub dedupe: Dedupe,
    /// Format-tagged merge rules; `None` selects the concatenation path.
    pub merge: Option<MergeKind>,
    /// Command template run after a successful write.
    pub on_change: Option<String>,
}

/// A source entry: a literal file path or a glob pattern.
#[derive(Debug, Clone)]
pub struct Source {
    pub path: String,
    /// A missing file or non-matching glob is not an error when set.
    pub optional: bool,
    pub sort: SortOrder,
}

/// Output format of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
    Kdl,
    Ini,
    Raw,
    Auto,
}

impl Format {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "kdl" => Some(Self::Kdl),
            "ini" => Some(Self::Ini),
            "raw" => Some(Self::Raw),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Kdl => "kdl",
            Self::Ini => "ini",
            Self::Raw => "raw",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How duplicate resolved paths are handled within one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dedupe {
    /// Keep the first occurrence of each absolute path.
    #[default]
    ByPath,
    /// Admit duplicates as-is.
    None,
}

/// Ordering of glob matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lexicographic byte order, independent of platform glob order.
    #[default]
    Lex,
    None,
}

/// Merge rules, tagged by the family of format they apply to.
///
/// Constructed at validation time, so a `Target` can never carry rules that
/// are foreign to its format.
#[derive(Debug, Clone)]
pub enum MergeKind {
    /// yaml / json / toml.
    Structured(StructuredRules),
    Kdl(KdlRules),
    Ini(IniRules),
}

/// Rules for tree-shaped documents (yaml/json/toml).
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredRules {
    pub maps: MapMerge,
    pub arrays: ArrayMerge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMerge {
    #[default]
    Deep,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayMerge {
    #[default]
    Replace,
    Append,
    UniqueAppend,
}

/// Rules for hierarchical-block documents (kdl).
#[derive(Debug, Clone, Default)]
pub struct KdlRules {
    pub keys: KeyPolicy,
    /// Top-level section names eligible for merging. Empty means all.
    pub section_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    #[default]
    LastWins,
    FirstWins,
    Append,
}

/// Rules for section/key documents (ini).
#[derive(Debug, Clone, Copy, Default)]
pub struct IniRules {
    pub repeated_keys: RepeatedKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatedKeys {
    #[default]
    LastWins,
    Append,
}

/// All semantic issues found in a configuration document, reported together.
#[derive(Debug, Error)]
#[error("configuration invalid:\n  - {}", .issues.join("\n  - "))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl ValidationError {
    pub(crate) fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub(crate) fn add(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Errors from loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
