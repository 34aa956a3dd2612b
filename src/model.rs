// ABOUTME: In-memory document model produced by the parser
// ABOUTME: Offsets are UTF-16 code units, matching the remote API's indexing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// First writable offset in a document body. Offset 0 belongs to the
/// leading section break.
pub const MIN_BODY_INDEX: usize = 1;

/// Length of `text` in the remote API's native offset unit.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: Vec<StructuralElement>,
    /// End offset of the whole body, including trailing spans of elements
    /// the model does not represent.
    pub end_index: usize,
}

impl Document {
    /// Native length of the body: where the last element ends, whether or
    /// not that element is part of `body`.
    pub fn length(&self) -> usize {
        let last = self.body.last().map(|e| e.end_index).unwrap_or(0);
        last.max(self.end_index)
    }

    /// True when no paragraph carries anything beyond its terminating newline.
    pub fn is_empty(&self) -> bool {
        self.paragraphs()
            .flat_map(|p| p.runs.iter())
            .all(|run| run.content.trim_end_matches('\n').is_empty())
            && !self.body.iter().any(|e| matches!(e.content, ElementContent::Table(_)))
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|e| match &e.content {
            ElementContent::Paragraph(p) => Some(p),
            _ => None,
        })
    }
}

/// One node of the body, covering the half-open range `[start_index, end_index)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralElement {
    pub start_index: usize,
    pub end_index: usize,
    pub content: ElementContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Paragraph(Paragraph),
    Table(Table),
    SectionBreak,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.content.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
}

impl TextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        TextRun {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn styled(content: impl Into<String>, style: TextStyle) -> Self {
        TextRun {
            content: content.into(),
            style,
            ..Default::default()
        }
    }
}

/// The subset of run styling this crate understands. Anything else the
/// remote API reports is dropped at the parser boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub link_url: Option<String>,
}

impl TextStyle {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline && self.link_url.is_none()
    }
}

/// Tables are an opaque span. Cell text is extracted once for the lossy
/// renderers; `raw` is carried through untouched for the structured one.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub raw: serde_json::Value,
}

/// One entry of the document listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
}
