//! Merge for section/key documents in the INI style.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{IniRules, RepeatedKeys};

use super::{read_utf8, BlendError};

/// One `[name]` section. The unnamed ("global") section uses an empty name
/// and renders without a header.
#[derive(Debug, Default)]
struct Section {
    name: String,
    /// Key to ordered values; more than one value per key exists only under
    /// the `append` policy.
    keys: BTreeMap<String, Vec<String>>,
}

/// Merge INI fragments under `rules`.
///
/// Sections keep their cross-fragment encounter order; keys render in
/// lexicographic order. Comment lines (`;`, `#`), blank lines, and lines
/// without a `=` are ignored.
pub fn blend_ini(rules: &IniRules, files: &[PathBuf]) -> Result<String, BlendError> {
    let mut sections: Vec<Section> = Vec::new();

    for path in files {
        let text = read_utf8(path)?;
        // Lines before any header belong to the global section.
        let mut cur = section_index(&mut sections, "");

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = header_name(line) {
                cur = section_index(&mut sections, name);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                // Malformed line: ignore.
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                continue;
            }

            let keys = &mut sections[cur].keys;
            match rules.repeated_keys {
                RepeatedKeys::Append => {
                    keys.entry(key.to_string()).or_default().push(value.to_string());
                }
                RepeatedKeys::LastWins => {
                    keys.insert(key.to_string(), vec![value.to_string()]);
                }
            }
        }
    }

    Ok(render(&sections))
}

fn header_name(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim())
}

/// Index of the section with `name`, appending it when first seen.
fn section_index(sections: &mut Vec<Section>, name: &str) -> usize {
    match sections.iter().position(|s| s.name == name) {
        Some(idx) => idx,
        None => {
            sections.push(Section {
                name: name.to_string(),
                ..Section::default()
            });
            sections.len() - 1
        }
    }
}

fn render(sections: &[Section]) -> String {
    let mut out = String::new();

    for section in sections {
        // An empty global section leaves no trace in the output.
        if section.name.is_empty() && section.keys.is_empty() {
            continue;
        }
        if !section.name.is_empty() {
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
        }
        for (key, values) in &section.keys {
            for value in values {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        // Blank separator line after each section block.
        out.push('\n');
    }

    // Exactly one trailing newline.
    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
