//! Typed run configuration.
//!
//! Loaded once per run from YAML; every field has the documented
//! default, so an empty (or absent) file is a valid configuration.
//! Unknown keys are ignored.

use crate::document::Alignment;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// The named footnote fields, in their canonical rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FootnoteField {
    Source,
    Object,
    Notes,
    Abbreviations,
}

impl FootnoteField {
    /// All fields in canonical order.
    pub const ALL: [FootnoteField; 4] = [
        FootnoteField::Source,
        FootnoteField::Object,
        FootnoteField::Notes,
        FootnoteField::Abbreviations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FootnoteField::Source => "Source",
            FootnoteField::Object => "Object",
            FootnoteField::Notes => "Notes",
            FootnoteField::Abbreviations => "Abbreviations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Letter-label each artifact's footnote fragments (and its raster
    /// copy) when a marker declares more than one artifact.
    pub label_multi_figures: bool,

    /// Fold identical rendered footnote fragments across a group.
    pub combine_duplicate_footnotes: bool,

    /// Substitute the Object path for Source and drop the Object field.
    pub use_object_path_as_source: bool,

    /// Which footnote fields are emitted, and in what order.
    pub footnote_order: Vec<FootnoteField>,

    /// Render Source/Object lines as `[Source: ...]` instead of bare.
    #[serde(rename = "wrap_path_in_[]")]
    pub wrap_path_in_brackets: bool,

    /// Cosmetic, passed through untouched to the host format.
    pub footnotes_font: String,
    pub footnotes_font_size: u32,

    /// Sizing policy knobs for the placement engine; see the sizing
    /// precedence on [`crate::placement::ArtifactPlacer`].
    pub use_embedded_size: bool,
    pub use_artifact_size: bool,
    pub default_fig_width: f64,

    pub fig_alignment: Alignment,

    /// Abort the run (writing no output) when any artifact's metadata
    /// sidecar is missing.
    pub fail_on_missing_metadata: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            label_multi_figures: false,
            combine_duplicate_footnotes: true,
            use_object_path_as_source: false,
            footnote_order: FootnoteField::ALL.to_vec(),
            wrap_path_in_brackets: true,
            footnotes_font: "Arial Narrow".to_string(),
            footnotes_font_size: 10,
            use_embedded_size: true,
            use_artifact_size: false,
            default_fig_width: 6.0,
            fig_alignment: Alignment::Center,
            fail_on_missing_metadata: false,
        }
    }
}

impl ReportConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }
}
