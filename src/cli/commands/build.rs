//! One-shot build of all targets.

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::build_target;
use crate::config::{
    self, ArrayMerge, Format, KeyPolicy, MapMerge, MergeKind, RepeatedKeys, Target,
};
use crate::output::{sha256_hex, write_atomic};
use crate::plan::{self, Plan};

/// Build every target once; the first failure aborts the run.
pub fn execute(
    config_path: &Path,
    dry_run: bool,
    trace: bool,
    annotate: bool,
    overrides: &[String],
) -> Result<(), Box<dyn Error>> {
    let cfg = config::load(config_path)?;
    let overrides = parse_overrides(overrides)?;

    if trace {
        eprintln!("confb: baseDir = {}", cfg.base_dir.display());
        eprintln!("confb: config = {}", std::path::absolute(config_path)?.display());
    }

    for target in &cfg.targets {
        let override_path = overrides.get(&target.name).map(PathBuf::as_path);
        let plan = plan::resolve(&cfg, target, override_path)?;

        if trace {
            print_plan(target, &plan);
        }

        if dry_run {
            eprintln!(
                "confb: {} -> {} (dry-run)",
                target.name,
                plan.output.display()
            );
            continue;
        }

        let built = build_target(target, &plan.files)?;
        let bytes = match annotation_header(target, &plan, annotate) {
            Some(mut header) => {
                header.extend_from_slice(&built.bytes);
                header
            }
            None => built.bytes,
        };
        write_atomic(&plan.output, &bytes)?;

        let action = if built.merged { "merged" } else { "concatenated" };
        crate::log_event!(
            &target.name,
            action,
            "wrote {}",
            plan.output.display()
        );
    }

    Ok(())
}

/// Parse repeated `--output-override TARGET=PATH` flags.
fn parse_overrides(list: &[String]) -> Result<HashMap<String, PathBuf>, Box<dyn Error>> {
    let mut out = HashMap::with_capacity(list.len());
    for entry in list {
        let Some((target, path)) = entry.split_once('=') else {
            return Err(format!("invalid --output-override {entry:?} (expected TARGET=PATH)").into());
        };
        let target = target.trim();
        let path = path.trim();
        if target.is_empty() || path.is_empty() {
            return Err(format!("invalid --output-override {entry:?} (empty key or value)").into());
        }
        out.insert(target.to_string(), PathBuf::from(path));
    }
    Ok(out)
}

fn print_plan(target: &Target, plan: &Plan) {
    eprintln!("target: {} (format={})", target.name, target.format);
    eprintln!("  output: {}", plan.output.display());
    if !plan.files.is_empty() {
        eprintln!("  files:");
        for file in &plan.files {
            eprintln!("    - {}", file.display());
        }
    }
    if let Some(summary) = merge_summary(target) {
        eprintln!("  merge.rules: {summary}");
    }
}

/// Single-line comment prefix for a format, if it supports comments at all.
fn comment_prefix(format: Format) -> Option<&'static str> {
    match format {
        Format::Kdl => Some("// "),
        Format::Toml | Format::Yaml => Some("# "),
        Format::Ini => Some("; "),
        // json and raw output is never annotated
        Format::Json | Format::Raw | Format::Auto => None,
    }
}

fn merge_summary(target: &Target) -> Option<String> {
    match target.merge.as_ref()? {
        MergeKind::Structured(rules) => {
            let maps = match rules.maps {
                MapMerge::Deep => "deep",
                MapMerge::Replace => "replace",
            };
            let arrays = match rules.arrays {
                ArrayMerge::Replace => "replace",
                ArrayMerge::Append => "append",
                ArrayMerge::UniqueAppend => "unique_append",
            };
            Some(format!("maps={maps} arrays={arrays}"))
        }
        MergeKind::Kdl(rules) => {
            let keys = match rules.keys {
                KeyPolicy::LastWins => "last_wins",
                KeyPolicy::FirstWins => "first_wins",
                KeyPolicy::Append => "append",
            };
            if rules.section_keys.is_empty() {
                Some(format!("keys={keys}"))
            } else {
                Some(format!(
                    "keys={keys} section_keys=[{}]",
                    rules.section_keys.join(",")
                ))
            }
        }
        MergeKind::Ini(rules) => {
            let repeated = match rules.repeated_keys {
                RepeatedKeys::LastWins => "last_wins",
                RepeatedKeys::Append => "append",
            };
            Some(format!("repeated_keys={repeated}"))
        }
    }
}

/// Annotation header listing sources, their hashes, and the merge rules.
/// `None` when annotation is off or the format has no comment syntax.
fn annotation_header(target: &Target, plan: &Plan, annotate: bool) -> Option<Vec<u8>> {
    if !annotate {
        return None;
    }
    let prefix = comment_prefix(target.format)?;

    let mut lines = vec![
        "confb build".to_string(),
        format!("version: {}", env!("CARGO_PKG_VERSION")),
        format!("fmt: {}", target.format),
        format!("target: {}", target.name),
        format!("output: {}", plan.output.display()),
        format!("time: {}", chrono::Local::now().to_rfc3339()),
    ];
    if let Some(summary) = merge_summary(target) {
        lines.push(format!("merge.rules: {summary}"));
    }

    lines.push(format!("sources[{}]:", plan.files.len()));
    for (i, file) in plan.files.iter().enumerate() {
        let sha = fs::read(file)
            .map(|bytes| sha256_hex(&bytes))
            .unwrap_or_default();
        lines.push(format!("  {}) {} sha256={sha}", i + 1, file.display()));
    }

    let mut out = Vec::new();
    for line in &lines {
        out.extend_from_slice(prefix.as_bytes());
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    // Blank line after the header.
    out.push(b'\n');
    Some(out)
}
