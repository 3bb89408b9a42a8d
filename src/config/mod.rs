//! Configuration loading and validation.
//!
//! The configuration document (`confb.yaml`) is deserialized into loose
//! [`raw`] structs first, then validated as a whole: every issue is collected
//! into a single [`ValidationError`] so the user sees the full list at once.
//! Validation also resolves merge rules into the format-tagged [`MergeKind`],
//! which is where foreign rule fields for a target's format are rejected.

mod load;
mod types;

pub use load::{expand_tilde, load};
pub use types::{
    ArrayMerge, Config, ConfigError, Dedupe, Format, IniRules, KdlRules, KeyPolicy, MapMerge,
    MergeKind, RepeatedKeys, Source, SortOrder, StructuredRules, Target, ValidationError,
};
