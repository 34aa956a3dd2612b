// ABOUTME: Converts raw document JSON into the typed document model
// ABOUTME: Tolerant of unknown fields, strict about body shape and offsets

use crate::model::{
    Document, ElementContent, Paragraph, StructuralElement, Table, TextRun, TextStyle,
    MIN_BODY_INDEX,
};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    document_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    body: Option<RawBody>,
}

#[derive(Debug, Deserialize)]
struct RawBody {
    #[serde(default)]
    content: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    start_index: Option<usize>,
    end_index: Option<usize>,
    paragraph: Option<RawParagraph>,
    table: Option<Value>,
    section_break: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawParagraph {
    #[serde(default)]
    elements: Vec<RawParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParagraphElement {
    start_index: Option<usize>,
    end_index: Option<usize>,
    text_run: Option<RawTextRun>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTextRun {
    #[serde(default)]
    content: String,
    #[serde(default)]
    text_style: RawTextStyle,
}

#[derive(Debug, Default, Deserialize)]
struct RawTextStyle {
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    underline: bool,
    #[serde(default)]
    link: Option<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTable {
    #[serde(default)]
    table_rows: Vec<RawTableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTableRow {
    #[serde(default)]
    table_cells: Vec<RawTableCell>,
}

#[derive(Debug, Deserialize)]
struct RawTableCell {
    #[serde(default)]
    content: Vec<RawElement>,
}

/// Parse a raw document response into a [`Document`].
///
/// Fails with [`Error::MalformedDocument`] when `body` is missing, when an
/// element carries neither `startIndex` nor `endIndex`, or when element
/// offsets run backwards. A missing `startIndex` continues from the previous
/// element (the API omits zero values); a missing `endIndex` makes the element
/// zero-width. Elements of kinds the model does not know are skipped.
pub fn parse(raw: Value) -> Result<Document> {
    let raw: RawDocument = serde_json::from_value(raw)
        .map_err(|e| Error::MalformedDocument(format!("unexpected response shape: {}", e)))?;

    let id = raw
        .document_id
        .ok_or_else(|| Error::MalformedDocument("missing documentId".into()))?;
    let body = raw
        .body
        .ok_or_else(|| Error::MalformedDocument(format!("document {} has no body", id)))?;

    let mut elements = Vec::with_capacity(body.content.len());
    let mut prev_end = 0;

    for (position, element) in body.content.into_iter().enumerate() {
        let (start_index, end_index) = resolve_span(&element, prev_end, position)?;

        let content = if let Some(paragraph) = element.paragraph {
            ElementContent::Paragraph(parse_paragraph(paragraph))
        } else if let Some(table) = element.table {
            ElementContent::Table(parse_table(table))
        } else if element.section_break.is_some() {
            ElementContent::SectionBreak
        } else {
            tracing::debug!(position, "skipping unrecognized structural element");
            prev_end = end_index;
            continue;
        };

        elements.push(StructuralElement {
            start_index,
            end_index,
            content,
        });
        prev_end = end_index;
    }

    if elements.is_empty() {
        elements.push(StructuralElement {
            start_index: MIN_BODY_INDEX,
            end_index: MIN_BODY_INDEX,
            content: ElementContent::Paragraph(Paragraph::default()),
        });
    }

    let last_end = elements.last().map(|e| e.end_index).unwrap_or(0);
    Ok(Document {
        id,
        title: raw.title.unwrap_or_default(),
        body: elements,
        end_index: prev_end.max(last_end),
    })
}

fn resolve_span(element: &RawElement, prev_end: usize, position: usize) -> Result<(usize, usize)> {
    let (start, end) = match (element.start_index, element.end_index) {
        (None, None) => {
            return Err(Error::MalformedDocument(format!(
                "element {} has neither startIndex nor endIndex",
                position
            )))
        }
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, start),
        (None, Some(end)) => (prev_end.min(end), end),
    };

    if end < start {
        return Err(Error::MalformedDocument(format!(
            "element {} ends at {} before it starts at {}",
            position, end, start
        )));
    }
    if start < prev_end {
        return Err(Error::MalformedDocument(format!(
            "element {} starts at {} inside the previous element ending at {}",
            position, start, prev_end
        )));
    }

    Ok((start, end))
}

fn parse_paragraph(raw: RawParagraph) -> Paragraph {
    let runs = raw
        .elements
        .into_iter()
        .filter_map(|element| {
            let run = element.text_run?;
            Some(TextRun {
                content: run.content,
                style: TextStyle {
                    bold: run.text_style.bold,
                    italic: run.text_style.italic,
                    underline: run.text_style.underline,
                    link_url: run.text_style.link.and_then(|l| l.url),
                },
                start_index: element.start_index,
                end_index: element.end_index,
            })
        })
        .collect();

    Paragraph { runs }
}

fn parse_table(raw: Value) -> Table {
    let table: RawTable = serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
        tracing::debug!("table cells unreadable, keeping raw span only: {}", e);
        RawTable::default()
    });

    let rows = table
        .table_rows
        .iter()
        .map(|row| row.table_cells.iter().map(cell_text).collect())
        .collect();

    Table { rows, raw }
}

fn cell_text(cell: &RawTableCell) -> String {
    let text: String = cell
        .content
        .iter()
        .filter_map(|e| e.paragraph.as_ref())
        .flat_map(|p| p.elements.iter())
        .filter_map(|e| e.text_run.as_ref())
        .map(|r| r.content.as_str())
        .collect();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
