//! Footnote composition.
//!
//! Each artifact's sidecar metadata becomes a [`FootnoteRecord`] with
//! the named fields Source, Object, Notes and Abbreviations. When a
//! marker declares several artifacts, the per-artifact records merge
//! into a [`CombinedFootnote`] holding one fragment list per field,
//! with optional letter labeling, verbatim deduplication, and
//! placeholder suppression.

use crate::config::{FootnoteField, ReportConfig};
use crate::marker::ArtifactKind;
use crate::metadata::{FootnoteDictionary, MetadataRecord};
use crate::utils::{create_label, normalize_fragment};
use indexmap::IndexMap;
use log::warn;

/// Rendered in place of an empty Notes or Abbreviations field.
pub const PLACEHOLDER: &str = "N/A";

/// The sentinel metadata type meaning "no canonical note".
const NO_META_TYPE: &str = "NA";

/// One artifact's composed footnote fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteRecord {
    pub source: String,
    pub object: Option<String>,
    pub notes: String,
    pub abbreviations: String,
}

impl FootnoteRecord {
    pub fn field(&self, field: FootnoteField) -> Option<&str> {
        match field {
            FootnoteField::Source => Some(&self.source),
            FootnoteField::Object => self.object.as_deref(),
            FootnoteField::Notes => Some(&self.notes),
            FootnoteField::Abbreviations => Some(&self.abbreviations),
        }
    }
}

/// Derives one artifact's footnote record from its sidecar metadata.
///
/// Field shapes:
/// - `Source`: `"{path} {timestamp}"`, empty when either part is absent.
/// - `Object`: same shape, kept only when `include_object_path` is set
///   (or substituted for Source under `use_object_path_as_source`).
/// - `Notes`: the canonical note for the metadata type, then any ad-hoc
///   notes, each normalized to end `". "`; `N/A` when empty.
/// - `Abbreviations`: `"{token}: {expansion}. "` per token in order;
///   `N/A` when empty.
pub fn compose(
    footnotes: &FootnoteDictionary,
    metadata: &MetadataRecord,
    include_object_path: bool,
    kind: ArtifactKind,
    config: &ReportConfig,
) -> FootnoteRecord {
    let mut source = String::new();
    if let (Some(path), Some(timestamp)) =
        (&metadata.source_meta.path, metadata.source_meta.timestamp())
    {
        source = format!("{} {}", path, timestamp);
    }

    let mut object = None;
    if let (Some(path), Some(timestamp)) = (
        &metadata.object_meta.path,
        &metadata.object_meta.creation_time,
    ) {
        object = Some(format!("{} {}", path, timestamp));
    }

    let mut notes = String::new();
    match metadata.object_meta.meta_type.as_deref() {
        Some(meta_type) if meta_type != NO_META_TYPE => {
            match footnotes.canonical_note(kind, meta_type) {
                Some(note) if !note.is_empty() => notes.push_str(&normalize_fragment(note)),
                Some(_) => {}
                None => warn!("No canonical footnote for metadata type '{}'", meta_type),
            }
        }
        _ => {}
    }
    for note in &metadata.object_meta.footnotes.notes {
        notes.push_str(&normalize_fragment(note));
    }
    if notes.is_empty() {
        notes.push_str(PLACEHOLDER);
    }

    let mut abbreviations = String::new();
    for token in &metadata.object_meta.footnotes.abbreviations {
        match footnotes.expansion(token) {
            Some(expansion) => {
                abbreviations.push_str(&normalize_fragment(&format!("{}: {}", token, expansion)));
            }
            None => warn!("No expansion for abbreviation '{}'", token),
        }
    }
    if abbreviations.is_empty() {
        abbreviations.push_str(PLACEHOLDER);
    }

    if config.use_object_path_as_source {
        if let Some(substitute) = object.take() {
            source = substitute;
        }
    } else if !include_object_path {
        object = None;
    }

    FootnoteRecord {
        source,
        object,
        notes,
        abbreviations,
    }
}

/// A marker group's merged footnote: one ordered fragment list per
/// field, one fragment per contributing artifact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CombinedFootnote {
    pub fields: IndexMap<FootnoteField, Vec<String>>,
}

impl CombinedFootnote {
    pub fn fragments(&self, field: FootnoteField) -> Option<&Vec<String>> {
        self.fields.get(&field)
    }
}

/// Merges per-artifact records into a combined footnote.
///
/// Fragments are letter-labeled by artifact position when the group has
/// more than one record and `label_multi_figures` is on. Under
/// `combine_duplicate_footnotes` an already-present rendered fragment is
/// not appended again. A bare `N/A` placeholder is dropped from any
/// field list that also carries real content.
pub fn combine(records: &[FootnoteRecord], config: &ReportConfig) -> CombinedFootnote {
    let multi = records.len() > 1;
    let mut combined = CombinedFootnote::default();

    for field in FootnoteField::ALL {
        let mut fragments: Vec<String> = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let Some(value) = record.field(field) else {
                continue;
            };
            let fragment = if multi && config.label_multi_figures {
                format!("{}: {}", create_label(index), value)
            } else {
                value.to_string()
            };
            if config.combine_duplicate_footnotes && fragments.contains(&fragment) {
                continue;
            }
            fragments.push(fragment);
        }

        if fragments.len() > 1 && fragments.iter().any(|f| !is_placeholder(f)) {
            fragments.retain(|f| !is_placeholder(f));
        }

        if !fragments.is_empty() {
            combined.fields.insert(field, fragments);
        }
    }

    combined
}

/// A placeholder fragment is `N/A`, with or without a letter-label
/// prefix: a labeled `"B: N/A"` is still no information.
fn is_placeholder(fragment: &str) -> bool {
    let text = fragment.trim();
    let text = match text.split_once(": ") {
        Some((prefix, rest))
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => text,
    };
    text.trim() == PLACEHOLDER
}

/// Renders the combined footnote as one line per emitted field,
/// restricted and ordered by `config.footnote_order`.
pub fn render_lines(combined: &CombinedFootnote, config: &ReportConfig) -> Vec<String> {
    let mut lines = Vec::new();

    for field in &config.footnote_order {
        let Some(fragments) = combined.fields.get(field) else {
            continue;
        };
        let value = fragments
            .iter()
            .map(|f| f.trim_end())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format_field_line(*field, &value, config));
    }

    lines
}

/// Formats one field line, bracketing the path-bearing fields when
/// `wrap_path_in_[]` is set.
pub fn format_field_line(field: FootnoteField, value: &str, config: &ReportConfig) -> String {
    match field {
        FootnoteField::Source | FootnoteField::Object => {
            if config.wrap_path_in_brackets {
                format!("[{}: {}]", field.as_str(), value)
            } else {
                format!("{}: {}", field.as_str(), value)
            }
        }
        FootnoteField::Notes | FootnoteField::Abbreviations => {
            format!("{}: {}", field.as_str(), value)
        }
    }
}
