//! The abstract document model.
//!
//! The host word-processing format is owned by external collaborators;
//! the pipeline sees a report as an ordered sequence of block-level
//! nodes. Paragraph children mirror the host's run-level ordering so
//! that bookmark markers can delimit spans of content, and the whole
//! tree round-trips through JSON.

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Paragraph alignment. Unrecognized values fall back to `Center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Center,
    Left,
    Right,
}

impl Alignment {
    pub fn from_str_lenient(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "left" => Alignment::Left,
            "right" => Alignment::Right,
            _ => Alignment::Center,
        }
    }
}

impl<'de> Deserialize<'de> for Alignment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Alignment::from_str_lenient(&raw))
    }
}

/// Vertical alignment of a styled run. A run is plain, subscript, or
/// superscript; the variants are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlign {
    Subscript,
    Superscript,
}

/// A styled run of text within a paragraph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// An inline image. `width`/`height` are in the host's length units
/// (inches for the formats this targets); `None` means native size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// Ordered paragraph content: runs, drawings, hard line breaks, and
/// bookmark markers, matching the host format's child ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParagraphChild {
    Run(Run),
    Drawing(Drawing),
    Break,
    BookmarkStart { id: u32, name: String },
    BookmarkEnd { id: u32 },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub children: Vec<ParagraphChild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub keep_next: bool,
}

impl Paragraph {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            children: vec![ParagraphChild::Run(Run::text(text))],
            ..Default::default()
        }
    }

    /// Plain text of the paragraph: run texts concatenated in order,
    /// with hard line breaks rendered as newlines.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                ParagraphChild::Run(run) => Some(run.text.as_str()),
                ParagraphChild::Break => Some("\n"),
                _ => None,
            })
            .collect()
    }

    pub fn has_drawing(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, ParagraphChild::Drawing(_)))
    }

    pub fn drawings_mut(&mut self) -> impl Iterator<Item = &mut Drawing> {
        self.children.iter_mut().filter_map(|child| match child {
            ParagraphChild::Drawing(drawing) => Some(drawing),
            _ => None,
        })
    }

    pub fn drawings(&self) -> impl Iterator<Item = &Drawing> {
        self.children.iter().filter_map(|child| match child {
            ParagraphChild::Drawing(drawing) => Some(drawing),
            _ => None,
        })
    }

    /// True when nothing visible remains: no runs and no drawings.
    pub fn is_empty_of_content(&self) -> bool {
        !self.children.iter().any(|child| {
            matches!(child, ParagraphChild::Run(_) | ParagraphChild::Drawing(_))
        })
    }
}

/// A placed table. Cells are plain text; the first row is the header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One block-level node of the report body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

impl Block {
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        }
    }

    /// Whether this block visually carries placed artifact content: a
    /// table, or a paragraph holding at least one drawing.
    pub fn bears_artifact(&self) -> bool {
        match self {
            Block::Paragraph(paragraph) => paragraph.has_drawing(),
            Block::Table(_) => true,
        }
    }
}

/// The in-memory report: an ordered block sequence with the insertion
/// and removal primitives the passes are written against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportDocument {
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Inserts `block` immediately after the block at `anchor`. This is
    /// the host format's only insertion primitive: repeated insertions
    /// at a fixed anchor stack up in reverse submission order.
    pub fn insert_after(&mut self, anchor: usize, block: Block) {
        let position = (anchor + 1).min(self.blocks.len());
        self.blocks.insert(position, block);
    }

    pub fn remove(&mut self, index: usize) -> Block {
        self.blocks.remove(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text_concatenates_runs_in_order() {
        let paragraph = Paragraph {
            children: vec![
                ParagraphChild::Run(Run::text("{rpfy}:")),
                ParagraphChild::BookmarkStart {
                    id: 1,
                    name: "x".into(),
                },
                ParagraphChild::Run(Run::text("fig.png")),
            ],
            ..Default::default()
        };
        assert_eq!(paragraph.text(), "{rpfy}:fig.png");
    }

    #[test]
    fn test_insert_after_places_block_directly_after_anchor() {
        let mut doc = ReportDocument::new(vec![
            Block::Paragraph(Paragraph::with_text("first")),
            Block::Paragraph(Paragraph::with_text("second")),
        ]);
        doc.insert_after(0, Block::Paragraph(Paragraph::with_text("inserted")));

        let texts: Vec<String> = doc
            .blocks
            .iter()
            .filter_map(|b| b.as_paragraph().map(Paragraph::text))
            .collect();
        assert_eq!(texts, ["first", "inserted", "second"]);
    }

    #[test]
    fn test_repeated_insert_after_fixed_anchor_reverses_order() {
        let mut doc = ReportDocument::new(vec![Block::Paragraph(Paragraph::with_text("anchor"))]);
        doc.insert_after(0, Block::Paragraph(Paragraph::with_text("a")));
        doc.insert_after(0, Block::Paragraph(Paragraph::with_text("b")));

        let texts: Vec<String> = doc
            .blocks
            .iter()
            .filter_map(|b| b.as_paragraph().map(Paragraph::text))
            .collect();
        assert_eq!(texts, ["anchor", "b", "a"]);
    }

    #[test]
    fn test_alignment_lenient_parse() {
        assert_eq!(Alignment::from_str_lenient("LEFT"), Alignment::Left);
        assert_eq!(Alignment::from_str_lenient("right"), Alignment::Right);
        assert_eq!(Alignment::from_str_lenient("sideways"), Alignment::Center);
    }

    #[test]
    fn test_empty_of_content_ignores_bookmarks_and_breaks() {
        let paragraph = Paragraph {
            children: vec![
                ParagraphChild::BookmarkStart {
                    id: 3,
                    name: "fp_x".into(),
                },
                ParagraphChild::Break,
                ParagraphChild::BookmarkEnd { id: 3 },
            ],
            ..Default::default()
        };
        assert!(paragraph.is_empty_of_content());
    }

    #[test]
    fn test_document_json_round_trip() {
        let doc = ReportDocument::new(vec![
            Block::Paragraph(Paragraph::with_text("{rpfy}:fig.png")),
            Block::Table(Table {
                rows: vec![vec!["h1".into(), "h2".into()], vec!["a".into(), "b".into()]],
                description: None,
            }),
        ]);

        let json = serde_json::to_string(&doc).unwrap();
        let back: ReportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }
}
