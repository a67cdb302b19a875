use report_annotator::*;
use std::fs;
use std::path::{Path, PathBuf};

struct Fixture {
    _guard: tempfile::TempDir,
    outputs: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let guard = tempfile::tempdir().unwrap();
        let outputs = guard.path().join("outputs");
        fs::create_dir_all(outputs.join("figures")).unwrap();
        fs::create_dir_all(outputs.join("tables")).unwrap();
        Self {
            _guard: guard,
            outputs,
        }
    }

    fn figures(&self) -> PathBuf {
        self.outputs.join("figures")
    }

    fn tables(&self) -> PathBuf {
        self.outputs.join("tables")
    }

    fn write_figure(&self, name: &str) {
        let img = image::RgbaImage::from_pixel(320, 240, image::Rgba([60, 60, 60, 255]));
        img.save(self.figures().join(name)).unwrap();
    }

    fn write_metadata(&self, dir: &Path, artifact: &str, meta_type: &str, notes: &[&str]) {
        let (stem, ext) = artifact.rsplit_once('.').unwrap();
        let sidecar = dir.join(format!("{}_{}_metadata.json", stem, ext));
        let notes: Vec<String> = notes.iter().map(|n| n.to_string()).collect();
        let record = serde_json::json!({
            "source_meta": {
                "path": format!("scripts/make_{}.R", stem),
                "latest_time": "2025-03-02 10:15:00"
            },
            "object_meta": {
                "path": format!("outputs/{}", artifact),
                "creation_time": "2025-03-02 10:16:00",
                "meta_type": meta_type,
                "footnotes": { "notes": notes, "abbreviations": ["CI"] }
            }
        });
        fs::write(sidecar, serde_json::to_string_pretty(&record).unwrap()).unwrap();
    }
}

fn dictionary() -> FootnoteDictionary {
    serde_yaml::from_str(
        r#"
figure_footnotes:
  pk-conc: "Open circles denote observed concentrations"
table_footnotes:
  pk-param: "Values are geometric means"
abbreviations:
  CI: "confidence interval"
"#,
    )
    .unwrap()
}

fn paragraph(text: &str) -> Block {
    Block::Paragraph(Paragraph::with_text(text))
}

fn document_texts(doc: &ReportDocument) -> Vec<String> {
    doc.blocks
        .iter()
        .map(|block| match block {
            Block::Paragraph(p) => p.text(),
            Block::Table(_) => "<table>".to_string(),
        })
        .collect()
}

#[test]
fn test_two_figure_group_places_in_declared_order_with_sizes_and_labels() {
    let fixture = Fixture::new();
    fixture.write_figure("x.png");
    fixture.write_figure("y.png");
    fixture.write_metadata(&fixture.figures(), "x.png", "pk-conc", &["Dashed line is the fit"]);
    fixture.write_metadata(&fixture.figures(), "y.png", "NA", &[]);

    let config = ReportConfig {
        label_multi_figures: true,
        ..Default::default()
    };
    let engine = ReportEngine::new(config, dictionary(), ArtifactDirs::under(&fixture.outputs));

    let mut doc = ReportDocument::new(vec![
        paragraph("Results are shown below."),
        paragraph("{rpfy}:[x.png<width: 4>, y.png]"),
        paragraph("Discussion follows."),
    ]);
    let report = engine.run(&mut doc).unwrap();
    assert_eq!(report.placement.affected, 2);

    // marker, x.png figure, y.png figure, footnote, in that order
    let first = doc.blocks[2].as_paragraph().unwrap();
    let second = doc.blocks[3].as_paragraph().unwrap();
    let first_drawing = first.drawings().next().unwrap();
    let second_drawing = second.drawings().next().unwrap();

    // x.png was declared first and carries its embedded width; y.png
    // falls back to the configured default width
    assert_eq!(first_drawing.width, Some(4.0));
    assert_eq!(second_drawing.width, Some(6.0));
    // labeled scratch copies, not the originals
    assert!(!first_drawing.source.starts_with(fixture.figures()));
    assert!(!second_drawing.source.starts_with(fixture.figures()));

    // the footnote block follows the last artifact, bracketed by the
    // group bookmark
    let footnote = doc.blocks[4].as_paragraph().unwrap();
    assert!(matches!(
        footnote.children.first(),
        Some(ParagraphChild::BookmarkStart { name, .. }) if name == "fp_x.png"
    ));
    let text = footnote.text();
    assert!(text.contains("[Source: A: scripts/make_x.R 2025-03-02 10:15:00"));
    assert!(text.contains("Notes: A: Open circles denote observed concentrations. Dashed line is the fit."));
    // y.png contributed no notes; the placeholder was suppressed
    assert!(!text.contains("B: N/A"));

    // alt-text tagging covered the first following block
    assert_eq!(
        first_drawing_alt(&doc, 1),
        Some("{rpfy}:[x.png<width: 4>, y.png]".to_string())
    );
}

fn first_drawing_alt(doc: &ReportDocument, marker_index: usize) -> Option<String> {
    doc.blocks[marker_index + 1]
        .as_paragraph()
        .and_then(|p| p.drawings().next())
        .and_then(|d| d.alt_text.clone())
}

#[test]
fn test_missing_metadata_fails_fast_without_writing_output() {
    let fixture = Fixture::new();
    fs::write(fixture.tables().join("report.csv"), "id,value\n1,2\n").unwrap();
    // no sidecar for report.csv

    let config = ReportConfig {
        fail_on_missing_metadata: true,
        ..Default::default()
    };
    let engine = ReportEngine::new(config, dictionary(), ArtifactDirs::under(&fixture.outputs));

    let input = fixture.outputs.join("draft.json");
    let output = fixture.outputs.join("final.json");
    let doc = ReportDocument::new(vec![paragraph("{rpfy}:report.csv")]);
    doc.save(&input).unwrap();

    let result = engine.process_file(&input, &output);
    assert!(matches!(result, Err(ReportError::MissingMetadata(ref which)) if which.contains("report.csv")));
    assert!(!output.exists());
}

#[test]
fn test_missing_metadata_is_tolerated_by_default() {
    let fixture = Fixture::new();
    fixture.write_figure("fig.png");
    // no sidecar for fig.png

    let engine = ReportEngine::new(
        ReportConfig::default(),
        dictionary(),
        ArtifactDirs::under(&fixture.outputs),
    );

    let mut doc = ReportDocument::new(vec![paragraph("{rpfy}:fig.png")]);
    let report = engine.run(&mut doc).unwrap();

    // the figure is still placed; the footnote is silently omitted
    assert_eq!(report.placement.affected, 1);
    assert_eq!(report.footnotes.affected, 0);
    assert_eq!(report.missing_metadata(), ["fig.png".to_string()]);
    assert!(!doc
        .blocks
        .iter()
        .filter_map(Block::as_paragraph)
        .any(|p| p.text().contains("Source")));
}

#[test]
fn test_csv_artifact_placed_as_table_with_footnote_and_description() {
    let fixture = Fixture::new();
    fs::write(fixture.tables().join("summary.csv"), "id,value\n1,2\n3,4\n").unwrap();
    fixture.write_metadata(&fixture.tables(), "summary.csv", "pk-param", &[]);

    let engine = ReportEngine::new(
        ReportConfig::default(),
        dictionary(),
        ArtifactDirs::under(&fixture.outputs),
    );

    let mut doc = ReportDocument::new(vec![paragraph("{rpfy}:summary.csv")]);
    let report = engine.run(&mut doc).unwrap();
    assert_eq!(report.placement.affected, 1);
    assert_eq!(report.footnotes.affected, 1);

    match &doc.blocks[1] {
        Block::Table(table) => {
            assert_eq!(table.rows.len(), 3);
            assert_eq!(table.description.as_deref(), Some("{rpfy}:summary.csv"));
        }
        other => panic!("expected table, got {:?}", other),
    }
    let footnote = doc.blocks[2].as_paragraph().unwrap().text();
    assert!(footnote.contains("Values are geometric means."));
    assert!(footnote.contains("CI: confidence interval."));
}

#[test]
fn test_footnote_regions_remove_idempotently() {
    let fixture = Fixture::new();
    fixture.write_figure("fig.png");
    fixture.write_metadata(&fixture.figures(), "fig.png", "pk-conc", &[]);

    let engine = ReportEngine::new(
        ReportConfig::default(),
        dictionary(),
        ArtifactDirs::under(&fixture.outputs),
    );

    let mut doc = ReportDocument::new(vec![paragraph("{rpfy}:fig.png"), paragraph("after")]);
    engine.run(&mut doc).unwrap();
    let annotated_len = doc.len();
    assert_eq!(annotated_len, 4);

    assert_eq!(remove_footnote_regions(&mut doc), 1);
    let once = doc.clone();
    assert_eq!(remove_footnote_regions(&mut doc), 0);
    assert_eq!(doc, once);
    assert_eq!(doc.len(), 3);
}

#[test]
fn test_strip_passes_recover_a_clean_document() {
    let fixture = Fixture::new();
    fixture.write_figure("fig.png");
    fixture.write_metadata(&fixture.figures(), "fig.png", "pk-conc", &[]);
    fs::write(fixture.tables().join("summary.csv"), "id\n1\n").unwrap();
    fixture.write_metadata(&fixture.tables(), "summary.csv", "pk-param", &[]);

    let engine = ReportEngine::new(
        ReportConfig::default(),
        dictionary(),
        ArtifactDirs::under(&fixture.outputs),
    );

    let mut doc = ReportDocument::new(vec![
        paragraph("Intro prose."),
        paragraph("{rpfy}:fig.png"),
        paragraph("Middle prose."),
        paragraph("{rpfy}:summary.csv"),
        paragraph("Closing prose."),
    ]);
    engine.run(&mut doc).unwrap();

    remove_footnote_regions(&mut doc);
    strip_figures(&mut doc);
    strip_tables(&mut doc);
    strip_magic_strings(&mut doc);
    strip_bookmarks(&mut doc);

    assert_eq!(
        document_texts(&doc),
        ["Intro prose.", "Middle prose.", "Closing prose."]
    );
}

#[test]
fn test_duplicate_marker_text_in_one_paragraph() {
    let fixture = Fixture::new();
    fixture.write_figure("fig.png");
    fixture.write_metadata(&fixture.figures(), "fig.png", "NA", &[]);

    let engine = ReportEngine::new(
        ReportConfig::default(),
        dictionary(),
        ArtifactDirs::under(&fixture.outputs),
    );

    // two identical declarations separated by a hard break
    let mut doc = ReportDocument::new(vec![Block::Paragraph(Paragraph {
        children: vec![
            ParagraphChild::Run(Run::text("{rpfy}:fig.png")),
            ParagraphChild::Break,
            ParagraphChild::Run(Run::text("{rpfy}:fig.png")),
        ],
        ..Default::default()
    })]);

    let report = engine.run(&mut doc).unwrap();

    // one duplicate diagnostic per paragraph per scan, and no artifacts
    // dropped because of the duplication: both occurrences placed
    let duplicates = report
        .placement
        .diagnostics
        .iter()
        .filter(|d| d.message.contains("duplicate"))
        .count();
    assert_eq!(duplicates, 1);
    assert_eq!(report.placement.affected, 2);
}

#[test]
fn test_process_file_round_trips_through_json() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.write_figure("fig.png");
    fixture.write_metadata(&fixture.figures(), "fig.png", "pk-conc", &[]);

    let engine = ReportEngine::new(
        ReportConfig::default(),
        dictionary(),
        ArtifactDirs::under(&fixture.outputs),
    );

    let input = fixture.outputs.join("draft.json");
    let output = fixture.outputs.join("final.json");
    ReportDocument::new(vec![paragraph("{rpfy}:fig.png")]).save(&input)?;

    let report = engine.process_file(&input, &output)?;
    assert_eq!(report.placement.affected, 1);

    let processed = ReportDocument::load(&output)?;
    assert_eq!(processed.len(), 3);
    assert!(processed.blocks[1].bears_artifact());
    Ok(())
}
