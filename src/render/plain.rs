// ABOUTME: Plain text renderer
// ABOUTME: One line per paragraph, tables as pipe-delimited rows

use crate::model::{Document, ElementContent};

use super::strip_terminator;

/// Render the document as plain text. Paragraph boundaries become `\n`;
/// section breaks produce nothing.
pub fn to_plain(doc: &Document) -> String {
    let mut lines: Vec<String> = Vec::new();

    for element in &doc.body {
        match &element.content {
            ElementContent::Paragraph(p) => {
                if p.runs.is_empty() {
                    continue;
                }
                let text = p.text();
                lines.push(strip_terminator(&text).to_string());
            }
            ElementContent::Table(t) => {
                for row in &t.rows {
                    lines.push(row.join(" | "));
                }
            }
            ElementContent::SectionBreak => {}
        }
    }

    lines.join("\n")
}
