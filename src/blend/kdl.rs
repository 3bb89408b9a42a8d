//! Merge for hierarchical-block documents in the KDL style.
//!
//! The parser is deliberately small: it recognizes block-opening lines
//! (`ident [args...] {`), closing braces, and property lines, and strips
//! `//` line comments. Block arguments (the "head") and property values are
//! kept as raw substrings so they round-trip unchanged through
//! serialization; string escapes are never interpreted.
//!
//! Two blocks are the same block iff they share both `name` and `head`.
//! Top-level merging is gated by the rule set's `section_keys`; inside a
//! merged block, children always coalesce by `(name, head)`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::{KdlRules, KeyPolicy};

use super::{read_utf8, BlendError};

/// One named block.
///
/// Children are bucketed by name; sorted-name iteration gives the serializer
/// its deterministic order for free, while each bucket keeps encounter order.
#[derive(Debug, Clone, Default)]
struct Node {
    name: String,
    /// Raw argument text between the name and `{`, surrounding whitespace
    /// trimmed. Part of the block's identity.
    head: String,
    /// Key to ordered raw values. Multiple values per key exist under the
    /// `append` policy.
    props: BTreeMap<String, Vec<String>>,
    children: BTreeMap<String, Vec<Node>>,
}

impl Node {
    fn new(name: &str, head: &str) -> Self {
        Self {
            name: name.to_string(),
            head: head.to_string(),
            ..Self::default()
        }
    }

    fn append_child(&mut self, child: Node) {
        self.children
            .entry(child.name.clone())
            .or_default()
            .push(child);
    }

    /// First child with the same `(name, head)`, created if absent.
    fn ensure_single(&mut self, name: &str, head: &str) -> &mut Node {
        let bucket = self.children.entry(name.to_string()).or_default();
        let pos = match bucket.iter().position(|c| c.head == head) {
            Some(pos) => pos,
            None => {
                bucket.push(Node::new(name, head));
                bucket.len() - 1
            }
        };
        &mut bucket[pos]
    }

    fn set_prop(&mut self, key: &str, value: String, policy: KeyPolicy) {
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        match policy {
            KeyPolicy::FirstWins => {
                self.props
                    .entry(key.to_string())
                    .or_insert_with(|| vec![value]);
            }
            KeyPolicy::Append => {
                self.props.entry(key.to_string()).or_default().push(value);
            }
            KeyPolicy::LastWins => {
                self.props.insert(key.to_string(), vec![value]);
            }
        }
    }

    /// Fold `src` into `self`: props under the key policy, children always
    /// coalesced by `(name, head)`.
    fn merge_from(&mut self, src: Node, rules: &KdlRules) {
        for (key, values) in src.props {
            for value in values {
                self.set_prop(&key, value, rules.keys);
            }
        }
        for instances in src.children.into_values() {
            for inst in instances {
                self.ensure_single(&inst.name, &inst.head)
                    .merge_from(inst, rules);
            }
        }
    }

    fn render(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);

        out.push_str(&indent);
        out.push_str(&self.name);
        if !self.head.is_empty() {
            out.push(' ');
            out.push_str(&self.head);
        }
        out.push_str(" {\n");

        for (key, values) in &self.props {
            for value in values {
                out.push_str(&indent);
                out.push_str("  ");
                out.push_str(key);
                if !value.is_empty() {
                    out.push(' ');
                    out.push_str(value);
                }
                out.push('\n');
            }
        }

        for instances in self.children.values() {
            for child in instances {
                child.render(depth + 1, out);
            }
        }

        out.push_str(&indent);
        out.push_str("}\n");
    }
}

/// Merge KDL fragments under `rules`.
pub fn blend_kdl(rules: &KdlRules, files: &[PathBuf]) -> Result<String, BlendError> {
    let merge_all = rules.section_keys.is_empty();
    let eligible: HashSet<&str> = rules.section_keys.iter().map(String::as_str).collect();

    let mut root = Node::default();

    for path in files {
        let text = read_utf8(path)?;
        let top = parse(&text, path)?;

        for (name, instances) in top.children {
            for inst in instances {
                if merge_all || eligible.contains(name.as_str()) {
                    root.ensure_single(&name, &inst.head).merge_from(inst, rules);
                } else {
                    // Section not gated for merging: keep each instance as a
                    // separate sibling.
                    root.append_child(inst);
                }
            }
        }
    }

    let mut out = String::new();
    for instances in root.children.values() {
        for child in instances {
            child.render(0, &mut out);
        }
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Parse a document into an anonymous root node.
///
/// Properties are collected with the `append` policy so every raw value
/// survives until the merge applies the target's actual key policy.
fn parse(text: &str, path: &Path) -> Result<Node, BlendError> {
    let parse_err = |detail: &str| BlendError::Parse {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    };

    let mut root = Node::default();
    // Chain of open blocks; the node under construction is the last entry.
    let mut stack: Vec<Node> = Vec::new();

    for raw_line in text.lines() {
        let line = strip_line_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if line == "}" {
            let done = match stack.pop() {
                Some(node) => node,
                None => return Err(parse_err("unmatched closing brace")),
            };
            match stack.last_mut() {
                Some(parent) => parent.append_child(done),
                None => root.append_child(done),
            }
            continue;
        }

        if let Some((name, head)) = block_start(line) {
            stack.push(Node::new(name, head));
            continue;
        }

        let (key, value) = split_first_token(line);
        let cur = match stack.last_mut() {
            Some(node) => node,
            None => &mut root,
        };
        cur.set_prop(key, value.to_string(), KeyPolicy::Append);
    }

    if !stack.is_empty() {
        return Err(parse_err("unclosed block(s)"));
    }
    Ok(root)
}

/// Drop everything from `//` to the end of the line. Naive on purpose:
/// `//` inside a quoted string is also treated as a comment start.
fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Recognize `ident [args...] {`, returning the identifier and the raw
/// trimmed head text.
fn block_start(line: &str) -> Option<(&str, &str)> {
    let left = line.strip_suffix('{')?.trim_end();
    if left.is_empty() {
        return None;
    }
    match left.find([' ', '\t']) {
        Some(idx) => {
            let name = left[..idx].trim();
            let head = left[idx + 1..].trim();
            if name.is_empty() {
                None
            } else {
                Some((name, head))
            }
        }
        None => Some((left, "")),
    }
}

/// Split a property line into its key (first token) and raw value (rest).
fn split_first_token(line: &str) -> (&str, &str) {
    match line.find([' ', '\t']) {
        Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
        None => (line, ""),
    }
}
