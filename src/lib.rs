//! # Report Annotator
//!
//! A library for post-processing generated word-processing reports.
//! Authors embed a magic-string marker in a paragraph — e.g.
//! `{rpfy}:[results.png<width: 4>, summary.csv]` — declaring the output
//! artifacts that belong at that location. The pipeline parses those
//! markers, places the artifact content, synthesizes footnotes from
//! sidecar metadata, and tags everything with machine-checkable
//! bookmarks and alt-text so the annotations can later be verified or
//! stripped again.
//!
//! ## Core Concepts
//!
//! - **Marker**: the `{rpfy}:...` token declaring one or more artifacts
//!   with optional per-artifact arguments.
//! - **Artifact**: a figure (`.png`) or table (`.csv`, `.rds`) produced
//!   upstream and referenced by a marker.
//! - **Footnote region**: a bookmark-delimited paragraph carrying
//!   source, notes and abbreviation metadata for one artifact group.
//! - **Label**: the spreadsheet-style letter (A, B, ..., AA, ...)
//!   identifying each artifact of a multi-artifact group.
//!
//! ## Example
//!
//! ```rust,ignore
//! use report_annotator::*;
//! use std::path::Path;
//!
//! let config = ReportConfig::from_yaml_file(Path::new("config.yaml"))?;
//! let footnotes = FootnoteDictionary::from_yaml_file(Path::new("footnotes.yaml"))?;
//! let dirs = ArtifactDirs::under(Path::new("outputs"));
//!
//! let engine = ReportEngine::new(config, footnotes, dirs);
//! let report = engine.process_file(Path::new("draft.json"), Path::new("final.json"))?;
//! for diagnostic in report.diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod footnote;
pub mod marker;
pub mod metadata;
pub mod overlay;
pub mod placement;
pub mod region;
pub mod scanner;
pub mod utils;

pub use config::{FootnoteField, ReportConfig};
pub use document::{
    Alignment, Block, Drawing, Paragraph, ParagraphChild, ReportDocument, Run, Table,
    VerticalAlign,
};
pub use engine::{
    keep_captions_with_artifacts, remove_footnote_regions, strip_figures, strip_magic_strings,
    strip_tables, ArtifactDirs, PassReport, ReportEngine, RunReport, CAPTION_STYLE,
};
pub use error::{ReportError, Result};
pub use footnote::{combine, compose, CombinedFootnote, FootnoteRecord};
pub use marker::{
    artifact_kind, parse_magic_string, ArtifactArgs, ArtifactKind, MagicMarker, MAGIC_PREFIX,
    SUPPORTED_EXTENSIONS,
};
pub use metadata::{load_metadata, FootnoteDictionary, MetadataRecord};
pub use placement::{ArtifactPlacer, PlacedArtifact, PlacementOutcome};
pub use region::{
    remove_regions, strip_bookmarks, RegionIdAllocator, FOOTNOTE_BOOKMARK_PREFIX,
};
pub use scanner::{find_artifact_blocks, find_markers, MarkerMatch, ScanOutcome};
pub use utils::create_label;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One locatable, non-fatal problem found during a pass: which block it
/// concerns, which artifact (when one is involved), and what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub block_index: Option<usize>,
    pub artifact: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.block_index, &self.artifact) {
            (Some(index), Some(artifact)) => {
                write!(f, "paragraph {}: {}: {}", index + 1, artifact, self.message)
            }
            (Some(index), None) => write!(f, "paragraph {}: {}", index + 1, self.message),
            (None, Some(artifact)) => write!(f, "{}: {}", artifact, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_includes_context() {
        let diagnostic = Diagnostic {
            block_index: Some(4),
            artifact: Some("fig.png".to_string()),
            message: "artifact file not found".to_string(),
        };
        assert_eq!(
            diagnostic.to_string(),
            "paragraph 5: fig.png: artifact file not found"
        );
    }
}
