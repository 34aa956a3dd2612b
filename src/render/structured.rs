// ABOUTME: Structured renderer emitting the document in the API's JSON shape
// ABOUTME: Lossless: feeding the output back through the parser rebuilds the model

use crate::model::{Document, ElementContent, Paragraph, StructuralElement, TextRun};
use crate::Result;
use serde_json::{json, Map, Value};

/// Render the full document model, offsets included, in the same shape the
/// parser accepts.
pub fn to_structured(doc: &Document) -> Value {
    let mut content: Vec<Value> = doc.body.iter().map(element_value).collect();

    // Span of trailing elements the model skipped; the parser skips it again.
    let last_end = doc.body.last().map(|e| e.end_index).unwrap_or(0);
    if doc.end_index > last_end {
        content.push(json!({ "startIndex": last_end, "endIndex": doc.end_index }));
    }

    json!({
        "documentId": doc.id,
        "title": doc.title,
        "body": { "content": content },
    })
}

/// Pretty-printed JSON form of [`to_structured`].
pub fn to_json(doc: &Document) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_structured(doc))?)
}

fn element_value(element: &StructuralElement) -> Value {
    let mut obj = Map::new();
    obj.insert("startIndex".into(), json!(element.start_index));
    obj.insert("endIndex".into(), json!(element.end_index));

    match &element.content {
        ElementContent::Paragraph(p) => {
            obj.insert("paragraph".into(), paragraph_value(p));
        }
        ElementContent::Table(t) => {
            obj.insert("table".into(), t.raw.clone());
        }
        ElementContent::SectionBreak => {
            obj.insert("sectionBreak".into(), json!({}));
        }
    }

    Value::Object(obj)
}

fn paragraph_value(paragraph: &Paragraph) -> Value {
    let elements: Vec<Value> = paragraph.runs.iter().map(run_value).collect();
    json!({ "elements": elements })
}

fn run_value(run: &TextRun) -> Value {
    let mut style = Map::new();
    if run.style.bold {
        style.insert("bold".into(), json!(true));
    }
    if run.style.italic {
        style.insert("italic".into(), json!(true));
    }
    if run.style.underline {
        style.insert("underline".into(), json!(true));
    }
    if let Some(url) = &run.style.link_url {
        style.insert("link".into(), json!({ "url": url }));
    }

    let mut obj = Map::new();
    if let Some(start) = run.start_index {
        obj.insert("startIndex".into(), json!(start));
    }
    if let Some(end) = run.end_index {
        obj.insert("endIndex".into(), json!(end));
    }
    obj.insert(
        "textRun".into(),
        json!({ "content": run.content, "textStyle": Value::Object(style) }),
    );
    Value::Object(obj)
}
