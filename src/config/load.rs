//! Loader: deserialize `confb.yaml`, apply defaults, validate everything.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::types::{
    ArrayMerge, Config, ConfigError, Dedupe, Format, IniRules, KdlRules, KeyPolicy, MapMerge,
    MergeKind, RepeatedKeys, Source, SortOrder, StructuredRules, Target, ValidationError,
};

/// Loose document shape. Field values are checked during validation so that
/// every problem in the file is reported at once; serde only enforces the
/// structure (and rejects unknown fields).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    #[serde(default)]
    name: String,
    format: Option<String>,
    #[serde(default)]
    output: String,
    #[serde(default)]
    sources: Vec<RawSource>,
    dedupe: Option<String>,
    newline: Option<String>,
    encoding: Option<String>,
    merge: Option<RawMerge>,
    on_change: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    #[serde(default)]
    path: String,
    #[serde(default)]
    optional: bool,
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMerge {
    rules: Option<RawRules>,
}

/// One flat record for all formats; validation picks the fields that belong
/// to the target's format and rejects the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRules {
    maps: Option<String>,
    arrays: Option<String>,
    keys: Option<String>,
    section_keys: Option<Vec<String>>,
    repeated_keys: Option<String>,
}

/// Read a configuration file, remember its directory, validate it.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let abs = std::path::absolute(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let data = fs::read_to_string(&abs).map_err(|source| ConfigError::Read {
        path: abs.clone(),
        source,
    })?;

    let raw: RawConfig = serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
        path: abs.clone(),
        source,
    })?;

    // Relative source paths resolve against the config file's directory.
    let base_dir = abs
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    validate(raw, base_dir).map_err(ConfigError::from)
}

/// Expand a leading `~` to the user's home directory. Paths without the
/// prefix (and `~user` forms) pass through unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn validate(raw: RawConfig, base_dir: PathBuf) -> Result<Config, ValidationError> {
    let mut verr = ValidationError::new();

    if raw.version != 1 {
        verr.add(format!("version must be 1 (got {})", raw.version));
    }
    if raw.targets.is_empty() {
        verr.add("targets must not be empty");
    }

    let mut seen_names: Vec<&str> = Vec::new();
    let mut targets = Vec::with_capacity(raw.targets.len());

    for (idx, t) in raw.targets.iter().enumerate() {
        let name = t.name.trim();
        if name.is_empty() {
            verr.add(format!("targets[{idx}].name is required and must be non-empty"));
        } else if seen_names.contains(&name) {
            verr.add(format!("duplicate target name {name:?}"));
        } else {
            seen_names.push(name);
        }
        let loc = |field: &str| format!("{field} (target {name})");

        let format_str = t.format.as_deref().unwrap_or("auto");
        let format = match Format::parse(format_str) {
            Some(f) => f,
            None => {
                verr.add(format!(
                    "{}: format must be one of auto|yaml|toml|ini|json|kdl|raw (got {format_str:?})",
                    loc("format")
                ));
                Format::Auto
            }
        };

        if t.output.trim().is_empty() {
            verr.add(format!("{}: output is required", loc("output")));
        }

        let dedupe = match t.dedupe.as_deref() {
            None | Some("by_path") => Dedupe::ByPath,
            Some("none") => Dedupe::None,
            Some(other) => {
                verr.add(format!(
                    "{}: dedupe must be by_path|none (got {other:?})",
                    loc("dedupe")
                ));
                Dedupe::ByPath
            }
        };

        if let Some(nl) = t.newline.as_deref() {
            if nl != "\n" {
                verr.add(format!("{}: newline must be \\n (got {nl:?})", loc("newline")));
            }
        }
        if let Some(enc) = t.encoding.as_deref() {
            if !enc.eq_ignore_ascii_case("utf8") {
                verr.add(format!(
                    "{}: encoding must be utf8 (got {enc:?})",
                    loc("encoding")
                ));
            }
        }

        if t.sources.is_empty() {
            verr.add(format!("{}: sources must not be empty", loc("sources")));
        }
        let mut sources = Vec::with_capacity(t.sources.len());
        for (j, s) in t.sources.iter().enumerate() {
            if s.path.trim().is_empty() {
                verr.add(format!("{}: sources[{j}].path is required", loc("sources")));
            }
            let sort = match s.sort.as_deref() {
                None | Some("lex") => SortOrder::Lex,
                Some("none") => SortOrder::None,
                Some(other) => {
                    verr.add(format!(
                        "{}: sources[{j}].sort must be lex|none (got {other:?})",
                        loc("sources")
                    ));
                    SortOrder::Lex
                }
            };
            sources.push(Source {
                path: s.path.clone(),
                optional: s.optional,
                sort,
            });
        }

        let merge = match &t.merge {
            Some(m) => resolve_merge(format, m.rules.as_ref(), &loc, &mut verr),
            None => None,
        };

        let on_change = t
            .on_change
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        targets.push(Target {
            name: name.to_string(),
            format,
            output: expand_tilde(t.output.trim()),
            sources,
            dedupe,
            merge,
            on_change,
        });
    }

    if !verr.is_empty() {
        return Err(verr);
    }

    Ok(Config {
        version: raw.version,
        targets,
        base_dir,
    })
}

/// Construct the format-tagged merge rules, flagging any rule field that
/// belongs to a different format family. Missing fields take their defaults.
fn resolve_merge(
    format: Format,
    rules: Option<&RawRules>,
    loc: &dyn Fn(&str) -> String,
    verr: &mut ValidationError,
) -> Option<MergeKind> {
    let default_rules = RawRules::default();
    let r = rules.unwrap_or(&default_rules);

    let foreign = |verr: &mut ValidationError, field: &str| {
        verr.add(format!(
            "{}: merge.rules.{field} does not apply to format {format}",
            loc("merge")
        ));
    };

    match format {
        Format::Yaml | Format::Json | Format::Toml => {
            for (field, present) in [
                ("keys", r.keys.is_some()),
                ("section_keys", r.section_keys.is_some()),
                ("repeated_keys", r.repeated_keys.is_some()),
            ] {
                if present {
                    foreign(verr, field);
                }
            }

            let maps = match r.maps.as_deref() {
                None | Some("deep") => MapMerge::Deep,
                Some("replace") => MapMerge::Replace,
                Some(other) => {
                    verr.add(format!(
                        "{}: merge.rules.maps must be deep|replace (got {other:?})",
                        loc("merge")
                    ));
                    MapMerge::Deep
                }
            };
            let arrays = match r.arrays.as_deref() {
                None | Some("replace") => ArrayMerge::Replace,
                Some("append") => ArrayMerge::Append,
                Some("unique_append") => ArrayMerge::UniqueAppend,
                Some(other) => {
                    verr.add(format!(
                        "{}: merge.rules.arrays must be replace|append|unique_append (got {other:?})",
                        loc("merge")
                    ));
                    ArrayMerge::Replace
                }
            };
            Some(MergeKind::Structured(StructuredRules { maps, arrays }))
        }

        Format::Kdl => {
            for (field, present) in [
                ("maps", r.maps.is_some()),
                ("arrays", r.arrays.is_some()),
                ("repeated_keys", r.repeated_keys.is_some()),
            ] {
                if present {
                    foreign(verr, field);
                }
            }

            let keys = match r.keys.as_deref() {
                None | Some("last_wins") => KeyPolicy::LastWins,
                Some("first_wins") => KeyPolicy::FirstWins,
                Some("append") => KeyPolicy::Append,
                Some(other) => {
                    verr.add(format!(
                        "{}: merge.rules.keys must be last_wins|first_wins|append (got {other:?})",
                        loc("merge")
                    ));
                    KeyPolicy::LastWins
                }
            };
            Some(MergeKind::Kdl(KdlRules {
                keys,
                section_keys: r.section_keys.clone().unwrap_or_default(),
            }))
        }

        Format::Ini => {
            for (field, present) in [
                ("maps", r.maps.is_some()),
                ("arrays", r.arrays.is_some()),
                ("keys", r.keys.is_some()),
                ("section_keys", r.section_keys.is_some()),
            ] {
                if present {
                    foreign(verr, field);
                }
            }

            let repeated_keys = match r.repeated_keys.as_deref() {
                None | Some("last_wins") => RepeatedKeys::LastWins,
                Some("append") => RepeatedKeys::Append,
                Some(other) => {
                    verr.add(format!(
                        "{}: merge.rules.repeated_keys must be last_wins|append (got {other:?})",
                        loc("merge")
                    ));
                    RepeatedKeys::LastWins
                }
            };
            Some(MergeKind::Ini(IniRules { repeated_keys }))
        }

        Format::Raw | Format::Auto => {
            verr.add(format!(
                "{}: merge is not supported for format {format}",
                loc("merge")
            ));
            None
        }
    }
}
