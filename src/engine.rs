//! The annotation pipeline.
//!
//! [`ReportEngine`] owns one run's knobs (configuration, footnote
//! dictionary, artifact directories) and composes the passes over a
//! single in-memory document: scan, place, inject footnotes, tag.
//! The read/write boundary is owned once, by [`ReportEngine::process_file`];
//! under `fail_on_missing_metadata` the run aborts before anything is
//! written.
//!
//! The strip passes that reverse annotation (magic strings, figures,
//! tables, footnote regions, bookmarks) are standalone functions: they
//! need no run state and are each idempotent.

use crate::config::ReportConfig;
use crate::document::{Block, ParagraphChild, ReportDocument};
use crate::error::{ReportError, Result};
use crate::footnote::{combine, compose};
use crate::marker::{artifact_kind, ArtifactKind, MAGIC_PREFIX};
use crate::metadata::{load_metadata, FootnoteDictionary};
use crate::placement::ArtifactPlacer;
use crate::region::{self, inject_footnote, RegionIdAllocator, FOOTNOTE_BOOKMARK_PREFIX};
use crate::scanner::{find_artifact_blocks, find_following_table, find_markers, is_marker_block};
use crate::Diagnostic;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Paragraph style that marks a caption in the host document.
pub const CAPTION_STYLE: &str = "Caption";

/// Where a run's artifacts live: figures and tables in sibling
/// directories under one outputs root, mirroring the upstream
/// generator's layout.
#[derive(Debug, Clone)]
pub struct ArtifactDirs {
    pub figures: PathBuf,
    pub tables: PathBuf,
}

impl ArtifactDirs {
    pub fn new(figures: impl Into<PathBuf>, tables: impl Into<PathBuf>) -> Self {
        Self {
            figures: figures.into(),
            tables: tables.into(),
        }
    }

    /// The conventional layout: `<outputs>/figures` and `<outputs>/tables`.
    pub fn under(outputs_dir: &Path) -> Self {
        Self {
            figures: outputs_dir.join("figures"),
            tables: outputs_dir.join("tables"),
        }
    }

    pub fn for_kind(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Figure => &self.figures,
            ArtifactKind::Table => &self.tables,
        }
    }
}

/// What one pass did: blocks it touched, the diagnostics it emitted,
/// and which artifacts were missing their metadata sidecar.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub affected: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub missing_metadata: Vec<String>,
}

/// The aggregate of a full annotation run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub placement: PassReport,
    pub footnotes: PassReport,
    pub tags: PassReport,
}

impl RunReport {
    pub fn missing_metadata(&self) -> &[String] {
        &self.footnotes.missing_metadata
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.placement
            .diagnostics
            .iter()
            .chain(&self.footnotes.diagnostics)
            .chain(&self.tags.diagnostics)
    }
}

pub struct ReportEngine {
    config: ReportConfig,
    footnotes: FootnoteDictionary,
    dirs: ArtifactDirs,
    fig_width: Option<f64>,
    fig_height: Option<f64>,
    include_object_path: bool,
}

impl ReportEngine {
    pub fn new(config: ReportConfig, footnotes: FootnoteDictionary, dirs: ArtifactDirs) -> Self {
        Self {
            config,
            footnotes,
            dirs,
            fig_width: None,
            fig_height: None,
            include_object_path: false,
        }
    }

    /// Caller-supplied fallback figure dimensions (sizing tiers 4-6).
    pub fn with_figure_size(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.fig_width = width;
        self.fig_height = height;
        self
    }

    /// Emit the Object path line in footnotes.
    pub fn with_object_paths(mut self, include: bool) -> Self {
        self.include_object_path = include;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Runs the annotation passes over `doc`: place artifacts, inject
    /// footnotes, tag alt-text. Aborts with
    /// [`ReportError::MissingMetadata`] when a sidecar is missing and
    /// the configuration demands fail-fast.
    pub fn run(&self, doc: &mut ReportDocument) -> Result<RunReport> {
        info!("Annotating report with {} blocks", doc.len());

        let placement = self.place_artifacts(doc);
        let mut ids = RegionIdAllocator::new();
        let footnotes = self.inject_footnotes(doc, &mut ids);
        let tags = self.tag_artifacts(doc);

        let report = RunReport {
            placement,
            footnotes,
            tags,
        };

        if self.config.fail_on_missing_metadata && !report.missing_metadata().is_empty() {
            return Err(ReportError::MissingMetadata(
                report.missing_metadata().join(", "),
            ));
        }

        Ok(report)
    }

    /// Reads `input`, runs the pipeline, and writes `output`. Nothing
    /// is written when the run aborts.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<RunReport> {
        let mut doc = ReportDocument::load(input)?;
        let report = self.run(&mut doc)?;
        doc.save(output)?;
        info!("Processed report saved at '{}'.", output.display());
        Ok(report)
    }

    /// Places every marker's artifacts after its paragraph. Marker
    /// groups are processed back-to-front so insertions never shift a
    /// pending anchor.
    pub fn place_artifacts(&self, doc: &mut ReportDocument) -> PassReport {
        let mut report = PassReport::default();
        let scan = find_markers(doc);
        report.diagnostics.extend(scan.diagnostics);

        let placer = ArtifactPlacer::new(
            &self.dirs.figures,
            &self.dirs.tables,
            &self.config,
            self.fig_width,
            self.fig_height,
        );

        for found in scan.markers.iter().rev() {
            let outcome = placer.place_group(doc, &found.marker, found.block_index);
            report.affected += outcome.placed.len();
            report.diagnostics.extend(outcome.diagnostics);
        }

        report
    }

    /// Builds and injects one bookmark-wrapped footnote block per
    /// marker group, directly after the group's last artifact block.
    pub fn inject_footnotes(
        &self,
        doc: &mut ReportDocument,
        ids: &mut RegionIdAllocator,
    ) -> PassReport {
        let mut report = PassReport::default();
        let scan = find_markers(doc);
        report.diagnostics.extend(scan.diagnostics);

        for found in scan.markers.iter().rev() {
            let marker = &found.marker;
            if marker.is_empty() {
                continue;
            }

            let mut records = Vec::new();
            for name in marker.names() {
                let Some(kind) = artifact_kind(name) else {
                    continue;
                };
                match load_metadata(self.dirs.for_kind(kind), name) {
                    Ok(Some(metadata)) => records.push(compose(
                        &self.footnotes,
                        &metadata,
                        self.include_object_path,
                        kind,
                        &self.config,
                    )),
                    Ok(None) => {
                        report.missing_metadata.push(name.clone());
                        report.diagnostics.push(Diagnostic {
                            block_index: Some(found.block_index),
                            artifact: Some(name.clone()),
                            message: "missing metadata sidecar".to_string(),
                        });
                    }
                    Err(err) => {
                        warn!("Unreadable metadata for {}: {}", name, err);
                        report.diagnostics.push(Diagnostic {
                            block_index: Some(found.block_index),
                            artifact: Some(name.clone()),
                            message: format!("unreadable metadata sidecar: {}", err),
                        });
                    }
                }
            }
            if records.is_empty() {
                continue;
            }

            let artifact_blocks = find_artifact_blocks(doc, found.block_index, marker.len());
            let Some(&anchor) = artifact_blocks.last() else {
                debug!(
                    "No placed artifact found after paragraph {}; skipping footnote",
                    found.block_index + 1
                );
                continue;
            };

            let combined = combine(&records, &self.config);
            let Some(group_name) = marker.names().next().cloned() else {
                continue;
            };
            inject_footnote(doc, anchor, &combined, &group_name, ids, &self.config);
            report.affected += 1;
        }

        report
    }

    /// Stamps each marker's paragraph text as the alt-text of the
    /// artifact content in the immediately following block.
    pub fn tag_artifacts(&self, doc: &mut ReportDocument) -> PassReport {
        let mut report = PassReport::default();
        let scan = find_markers(doc);

        for found in &scan.markers {
            let index = found.block_index;
            let Some(text) = doc.blocks[index].as_paragraph().map(|p| p.text()) else {
                continue;
            };
            if index + 1 >= doc.len() {
                continue;
            }

            match &mut doc.blocks[index + 1] {
                Block::Paragraph(paragraph) => {
                    for drawing in paragraph.drawings_mut() {
                        drawing.alt_text = Some(text.clone());
                        report.affected += 1;
                    }
                }
                Block::Table(table) => {
                    table.description = Some(text.trim().to_string());
                    report.affected += 1;
                }
            }
        }

        report
    }

    /// Re-scans the document and reports every drawing or table whose
    /// stored alt-text no longer matches its marker paragraph.
    pub fn verify_tags(&self, doc: &ReportDocument) -> PassReport {
        let mut report = PassReport::default();
        let scan = find_markers(doc);

        for found in &scan.markers {
            let index = found.block_index;
            let Some(text) = doc.blocks[index].as_paragraph().map(|p| p.text()) else {
                continue;
            };
            if index + 1 >= doc.len() {
                continue;
            }

            match &doc.blocks[index + 1] {
                Block::Paragraph(paragraph) => {
                    for drawing in paragraph.drawings() {
                        if drawing.alt_text.as_deref() != Some(text.as_str()) {
                            warn!(
                                "Magic mismatch! magic string: {} != alt-text: {:?}",
                                text, drawing.alt_text
                            );
                            report.diagnostics.push(Diagnostic {
                                block_index: Some(index + 1),
                                artifact: None,
                                message: "figure alt-text does not match its marker".to_string(),
                            });
                        }
                    }
                }
                Block::Table(table) => {
                    if table.description.as_deref() != Some(text.trim()) {
                        warn!(
                            "Magic mismatch! magic string: {} != alt-text: {:?}",
                            text.trim(),
                            table.description
                        );
                        report.diagnostics.push(Diagnostic {
                            block_index: Some(index + 1),
                            artifact: None,
                            message: "table description does not match its marker".to_string(),
                        });
                    }
                }
            }
        }

        report
    }
}

/// Clears marker text from the document. A marker paragraph that also
/// carries a drawing keeps the drawing and loses its text runs; a
/// text-only marker paragraph is removed whole.
pub fn strip_magic_strings(doc: &mut ReportDocument) -> PassReport {
    let mut report = PassReport::default();
    let mut to_remove = Vec::new();

    for (index, block) in doc.blocks.iter_mut().enumerate() {
        let Some(paragraph) = block.as_paragraph_mut() else {
            continue;
        };
        if !paragraph.text().contains(MAGIC_PREFIX) {
            continue;
        }

        if paragraph.has_drawing() {
            paragraph
                .children
                .retain(|child| !matches!(child, ParagraphChild::Run(_)));
        } else {
            to_remove.push(index);
        }
        report.affected += 1;
    }

    for index in to_remove.into_iter().rev() {
        doc.remove(index);
    }

    report
}

/// Removes placed figures: drawings inside a marker paragraph, or a
/// drawing-only paragraph immediately following one.
pub fn strip_figures(doc: &mut ReportDocument) -> PassReport {
    let mut report = PassReport::default();
    let mut to_remove = Vec::new();

    for index in 0..doc.len() {
        let starts_marker = doc.blocks[index]
            .as_paragraph()
            .is_some_and(|p| p.text().starts_with(MAGIC_PREFIX));
        if !starts_marker {
            continue;
        }

        let has_drawing = doc.blocks[index]
            .as_paragraph()
            .is_some_and(|p| p.has_drawing());
        if has_drawing {
            if let Some(paragraph) = doc.blocks[index].as_paragraph_mut() {
                paragraph
                    .children
                    .retain(|child| !matches!(child, ParagraphChild::Drawing(_)));
                report.affected += 1;
            }
        } else if index + 1 < doc.len() {
            let next_is_figure = doc.blocks[index + 1]
                .as_paragraph()
                .is_some_and(|p| p.text().trim().is_empty() && p.has_drawing());
            if next_is_figure {
                to_remove.push(index + 1);
            }
        }
    }

    to_remove.dedup();
    for index in to_remove.into_iter().rev() {
        doc.remove(index);
        report.affected += 1;
    }

    report
}

/// Removes the table paired with each marker paragraph: the first
/// following table sibling, not crossing another paragraph.
pub fn strip_tables(doc: &mut ReportDocument) -> PassReport {
    let mut report = PassReport::default();
    let mut to_remove = Vec::new();

    for index in 0..doc.len() {
        let starts_marker = doc.blocks[index]
            .as_paragraph()
            .is_some_and(|p| p.text().starts_with(MAGIC_PREFIX));
        if !starts_marker {
            continue;
        }
        if let Some(table_index) = find_following_table(doc, index) {
            to_remove.push(table_index);
        }
    }

    to_remove.dedup();
    for index in to_remove.into_iter().rev() {
        doc.remove(index);
        report.affected += 1;
    }

    report
}

/// Removes every footnote region injected by the pipeline.
pub fn remove_footnote_regions(doc: &mut ReportDocument) -> usize {
    region::remove_regions(doc, |name| name.starts_with(FOOTNOTE_BOOKMARK_PREFIX))
}

/// Keeps captions glued to their artifacts: every caption-styled
/// paragraph gets the keep-with-next property, as does the nearest
/// following marker paragraph.
pub fn keep_captions_with_artifacts(doc: &mut ReportDocument) -> PassReport {
    let mut report = PassReport::default();

    for index in 0..doc.len() {
        let is_caption = doc.blocks[index]
            .as_paragraph()
            .is_some_and(|p| p.style.as_deref() == Some(CAPTION_STYLE));
        if !is_caption {
            continue;
        }

        if let Some(paragraph) = doc.blocks[index].as_paragraph_mut() {
            paragraph.keep_next = true;
            report.affected += 1;
        }

        for next in index + 1..doc.len() {
            if is_marker_block(doc, next) {
                if let Some(paragraph) = doc.blocks[next].as_paragraph_mut() {
                    paragraph.keep_next = true;
                }
                break;
            }
        }
    }

    report
}
