//! Artifact placement.
//!
//! For each marker group the placer resolves artifact files against
//! the figure/table directories, skips what it cannot place (with a
//! diagnostic), and inserts the surviving artifacts after the marker
//! paragraph. The host insertion primitive is insert-after-a-fixed-
//! anchor, so a multi-artifact group is inserted in reverse declared
//! order; labels are assigned by the original declared position, which
//! leaves the rendered top-to-bottom order and the labels both matching
//! the declaration.

use crate::config::ReportConfig;
use crate::document::{Block, Drawing, Paragraph, ParagraphChild, ReportDocument, Table};
use crate::error::Result;
use crate::marker::{artifact_kind, ArtifactArgs, ArtifactKind, MagicMarker};
use crate::overlay;
use crate::utils::split_artifact_name;
use crate::Diagnostic;
use log::{debug, warn};
use std::path::{Path, PathBuf};

pub struct ArtifactPlacer<'a> {
    figure_dir: PathBuf,
    table_dir: PathBuf,
    config: &'a ReportConfig,
    fig_width: Option<f64>,
    fig_height: Option<f64>,
}

/// One successfully placed artifact, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedArtifact {
    pub name: String,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementOutcome {
    pub placed: Vec<PlacedArtifact>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Survivor<'m> {
    declared_index: usize,
    name: &'m str,
    args: &'m ArtifactArgs,
    kind: ArtifactKind,
    path: PathBuf,
}

impl<'a> ArtifactPlacer<'a> {
    pub fn new(
        figure_dir: impl Into<PathBuf>,
        table_dir: impl Into<PathBuf>,
        config: &'a ReportConfig,
        fig_width: Option<f64>,
        fig_height: Option<f64>,
    ) -> Self {
        Self {
            figure_dir: figure_dir.into(),
            table_dir: table_dir.into(),
            config,
            fig_width,
            fig_height,
        }
    }

    /// Places every placeable artifact of `marker` directly after the
    /// block at `anchor_index`.
    pub fn place_group(
        &self,
        doc: &mut ReportDocument,
        marker: &MagicMarker,
        anchor_index: usize,
    ) -> PlacementOutcome {
        let mut outcome = PlacementOutcome::default();
        let survivors = self.surviving_artifacts(marker, anchor_index, &mut outcome.diagnostics);

        let label_artifacts = survivors.len() > 1 && self.config.label_multi_figures;

        // each insertion lands right after the anchor, pushing earlier
        // insertions down, so the declared order is restored by
        // inserting back-to-front
        for survivor in survivors.iter().rev() {
            match survivor.kind {
                ArtifactKind::Figure => {
                    self.insert_figure(doc, anchor_index, survivor, label_artifacts, &mut outcome)
                }
                ArtifactKind::Table => {
                    self.insert_table(doc, anchor_index, survivor, &mut outcome)
                }
            }
        }

        outcome.placed.reverse();
        outcome
    }

    fn surviving_artifacts<'m>(
        &self,
        marker: &'m MagicMarker,
        anchor_index: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Survivor<'m>> {
        let mut survivors = Vec::new();

        for (declared_index, (name, args)) in marker.artifacts.iter().enumerate() {
            let Some(kind) = artifact_kind(name) else {
                warn!("Unsupported artifact extension: {}. Skipping.", name);
                diagnostics.push(Diagnostic {
                    block_index: Some(anchor_index),
                    artifact: Some(name.clone()),
                    message: "unsupported artifact extension".to_string(),
                });
                continue;
            };

            let dir = match kind {
                ArtifactKind::Figure => &self.figure_dir,
                ArtifactKind::Table => &self.table_dir,
            };
            let path = dir.join(name);
            if !path.exists() {
                warn!("Artifact file not found: {}", path.display());
                diagnostics.push(Diagnostic {
                    block_index: Some(anchor_index),
                    artifact: Some(name.clone()),
                    message: "artifact file not found".to_string(),
                });
                continue;
            }

            survivors.push(Survivor {
                declared_index,
                name,
                args,
                kind,
                path,
            });
        }

        survivors
    }

    fn insert_figure(
        &self,
        doc: &mut ReportDocument,
        anchor_index: usize,
        survivor: &Survivor<'_>,
        label_artifacts: bool,
        outcome: &mut PlacementOutcome,
    ) {
        let source = if label_artifacts {
            match overlay::label_image(&survivor.path, survivor.declared_index) {
                Ok(labeled) => labeled,
                Err(err) => {
                    warn!("Could not label {}: {}. Using the original.", survivor.name, err);
                    outcome.diagnostics.push(Diagnostic {
                        block_index: Some(anchor_index),
                        artifact: Some(survivor.name.to_string()),
                        message: format!("label overlay failed: {}", err),
                    });
                    survivor.path.clone()
                }
            }
        } else {
            survivor.path.clone()
        };

        let (width, height) = self.resolve_size(survivor.args);
        debug!(
            "Placing figure {} (width: {:?}, height: {:?})",
            survivor.name, width, height
        );

        let paragraph = Paragraph {
            children: vec![ParagraphChild::Drawing(Drawing {
                source,
                width,
                height,
                alt_text: None,
            })],
            alignment: Some(self.config.fig_alignment),
            ..Default::default()
        };
        doc.insert_after(anchor_index, Block::Paragraph(paragraph));

        outcome.placed.push(PlacedArtifact {
            name: survivor.name.to_string(),
            kind: ArtifactKind::Figure,
        });
    }

    fn insert_table(
        &self,
        doc: &mut ReportDocument,
        anchor_index: usize,
        survivor: &Survivor<'_>,
        outcome: &mut PlacementOutcome,
    ) {
        let (_, extension) = split_artifact_name(survivor.name);
        if extension.eq_ignore_ascii_case("rds") {
            warn!(
                "No direct placement for .rds artifact {}; export it as .csv to place the table.",
                survivor.name
            );
            outcome.diagnostics.push(Diagnostic {
                block_index: Some(anchor_index),
                artifact: Some(survivor.name.to_string()),
                message: "no direct placement for .rds artifacts".to_string(),
            });
            return;
        }

        match table_from_csv(&survivor.path) {
            Ok(table) => {
                debug!("Placing table {} ({} rows)", survivor.name, table.rows.len());
                doc.insert_after(anchor_index, Block::Table(table));
                outcome.placed.push(PlacedArtifact {
                    name: survivor.name.to_string(),
                    kind: ArtifactKind::Table,
                });
            }
            Err(err) => {
                warn!("Could not read table {}: {}", survivor.name, err);
                outcome.diagnostics.push(Diagnostic {
                    block_index: Some(anchor_index),
                    artifact: Some(survivor.name.to_string()),
                    message: format!("unreadable table artifact: {}", err),
                });
            }
        }
    }

    /// Sizing precedence, first match wins:
    /// 1. the marker's own `width`/`height` args, if `use_embedded_size`
    /// 2. the artifact's native size, if `use_artifact_size`
    /// 3. the marker's own `width`/`height` args again
    /// 4. caller-supplied width and height
    /// 5. caller-supplied width
    /// 6. caller-supplied height
    /// 7. the configured `default_fig_width`
    pub fn resolve_size(&self, args: &ArtifactArgs) -> (Option<f64>, Option<f64>) {
        let width: Option<f64> = args.get("width").and_then(|v| v.parse().ok());
        let height: Option<f64> = args.get("height").and_then(|v| v.parse().ok());
        let has_embedded = width.is_some() || height.is_some();

        if self.config.use_embedded_size && has_embedded {
            return (width, height);
        }
        if self.config.use_artifact_size {
            return (None, None);
        }
        if has_embedded {
            return (width, height);
        }
        match (self.fig_width, self.fig_height) {
            (None, None) => (Some(self.config.default_fig_width), None),
            (caller_width, caller_height) => (caller_width, caller_height),
        }
    }
}

/// Reads a `.csv` artifact into a table block; the first row is the
/// header.
pub fn table_from_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table {
        rows,
        description: None,
    })
}
