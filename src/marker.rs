//! The magic-string mini-language.
//!
//! Report authors declare artifacts inline with a marker such as
//! `{rpfy}:[results.png<width: 4>, summary.csv]`. The body is either a
//! single entry or a bracketed list; each entry is a file name with an
//! optional `<key: value, ...>` argument block. Parsing is total:
//! malformed fragments are dropped, never raised.

use crate::utils::split_artifact_name;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// The sentinel that opens every marker.
pub const MAGIC_PREFIX: &str = "{rpfy}:";

/// Extensions an artifact may carry; anything else is skipped with a
/// diagnostic by the placement and footnote passes.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "csv", "rds"];

/// Per-artifact rendering arguments (`width`, `height`, ...), keyed by
/// argument name with values kept as raw strings.
pub type ArtifactArgs = BTreeMap<String, String>;

/// What an artifact renders as in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Figure,
    Table,
}

/// Classifies an artifact by extension, or `None` when the extension is
/// not in [`SUPPORTED_EXTENSIONS`].
pub fn artifact_kind(name: &str) -> Option<ArtifactKind> {
    let (_, extension) = split_artifact_name(name);
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some(ArtifactKind::Figure),
        "csv" | "rds" => Some(ArtifactKind::Table),
        _ => None,
    }
}

/// One parsed marker: the raw matched text plus the declared artifacts
/// in reading order. Duplicate names keep their first position but the
/// later occurrence's arguments win.
#[derive(Debug, Clone, PartialEq)]
pub struct MagicMarker {
    pub raw: String,
    pub artifacts: IndexMap<String, ArtifactArgs>,
}

impl MagicMarker {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            artifacts: parse_magic_string(raw),
        }
    }

    /// Declared artifact names in reading order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.artifacts.keys()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Parses a marker body into an ordered artifact-name -> argument map.
///
/// Handles all of:
/// - `[file1.ext<width: 5, height: 8>, file2.ext<width: 4>, file3.ext]`
/// - `[file1.ext, file2.ext]`
/// - `file.ext<height: 6>`
/// - `file.ext`
pub fn parse_magic_string(input: &str) -> IndexMap<String, ArtifactArgs> {
    let body = input.replace(MAGIC_PREFIX, "");
    let body = body.trim();

    let entries = if body.starts_with('[') && body.ends_with(']') {
        split_entries(&body[1..body.len() - 1])
    } else {
        vec![body.to_string()]
    };

    let mut artifacts = IndexMap::new();
    for entry in entries {
        let (name, args) = parse_entry(&entry);
        if name.is_empty() {
            continue;
        }
        artifacts.insert(name, args);
    }

    artifacts
}

/// Splits a bracketed list body on commas at angle-bracket depth 0, so
/// argument lists like `<width: 4, height: 6>` survive intact.
fn split_entries(content: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for ch in content.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                entries.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        entries.push(current.trim().to_string());
    }

    entries
}

/// Parses one entry into `(file_name, args)`. The name is everything up
/// to the first `<`; arguments need a closed `<...>` block and pairs
/// without a `:` separator are dropped.
fn parse_entry(entry: &str) -> (String, ArtifactArgs) {
    let mut args = ArtifactArgs::new();

    let (name, arg_body) = match entry.find('<') {
        Some(open) => {
            let body = entry[open + 1..]
                .split_once('>')
                .map(|(inner, _)| inner);
            (&entry[..open], body)
        }
        None => (entry, None),
    };

    if let Some(body) = arg_body {
        for pair in body.split(',') {
            if let Some((key, value)) = pair.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    args.insert(key.to_string(), value.trim().to_string());
                }
            }
        }
    }

    (name.trim().to_string(), args)
}
