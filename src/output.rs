// ABOUTME: Console formatting for list, get, create, and auth status output
// ABOUTME: Tables use comfy-table; other formats defer to the renderers

use crate::auth::{mask_token, AuthState, Credential};
use crate::config::OutputFormat;
use crate::model::{Document, DocumentSummary};
use crate::render::{to_json, to_markdown, to_plain};
use crate::Result;
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

pub fn document_url(id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", id)
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into())
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn format_list(docs: &[DocumentSummary], format: OutputFormat) -> Result<String> {
    if docs.is_empty() && format != OutputFormat::Json {
        return Ok("No documents found.".into());
    }

    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(docs)?,
        OutputFormat::Plain => docs
            .iter()
            .map(|d| format!("{}\t{}", d.id, d.name))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Markdown => docs
            .iter()
            .map(|d| {
                format!(
                    "- [{}]({}) (modified {})",
                    d.name,
                    document_url(&d.id),
                    format_time(d.modified_time)
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ID", "Name", "Modified"]);
            for d in docs {
                table.add_row(vec![d.id.clone(), d.name.clone(), format_time(d.modified_time)]);
            }
            table.to_string()
        }
    };

    Ok(out)
}

pub fn format_document(doc: &Document, format: OutputFormat) -> Result<String> {
    let out = match format {
        OutputFormat::Json => to_json(doc)?,
        OutputFormat::Plain => format!("Title: {}\n\n{}", doc.title, to_plain(doc)),
        OutputFormat::Markdown => format!("# {}\n\n{}", doc.title, to_markdown(doc)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["Field", "Value"]);
            table.add_row(vec!["ID".to_string(), doc.id.clone()]);
            table.add_row(vec!["Title".to_string(), doc.title.clone()]);
            table.add_row(vec!["Length".to_string(), doc.length().to_string()]);
            table.add_row(vec!["URL".to_string(), document_url(&doc.id)]);
            let text = if doc.is_empty() {
                "(empty document)".to_string()
            } else {
                to_plain(doc)
            };
            format!("{}\n\n{}", table, text)
        }
    };

    Ok(out)
}

pub fn format_created(doc: &Document) -> String {
    format!(
        "Created document: {}\nID: {}\nURL: {}",
        doc.title,
        doc.id,
        document_url(&doc.id)
    )
}

pub fn format_status(state: AuthState, credential: Option<&Credential>) -> String {
    let expired = credential.is_some_and(|c| c.is_expired(Utc::now()));
    let mut lines = vec![if state == AuthState::Valid && expired {
        format!("Status: {} (access token expired, refreshes on next use)", state)
    } else {
        format!("Status: {}", state)
    }];

    if let Some(c) = credential {
        lines.push(format!("Token: {}", mask_token(&c.access_token)));
        lines.push(format!("Expires: {}", c.expiry.to_rfc3339()));
        lines.push(format!(
            "Refresh token: {}",
            if c.can_refresh() { "present" } else { "missing" }
        ));
        if !c.scopes.is_empty() {
            lines.push("Scopes:".into());
            lines.extend(c.scopes.iter().map(|s| format!("  {}", s)));
        }
    }

    if matches!(state, AuthState::Unauthenticated | AuthState::Expired) {
        lines.push("Run: gdocs auth login".into());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementContent, Paragraph, StructuralElement, TextRun};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn summaries() -> Vec<DocumentSummary> {
        vec![
            DocumentSummary {
                id: "doc-1".into(),
                name: "Roadmap".into(),
                modified_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()),
                created_time: None,
            },
            DocumentSummary {
                id: "doc-2".into(),
                name: "Notes".into(),
                modified_time: None,
                created_time: None,
            },
        ]
    }

    fn doc() -> Document {
        Document {
            id: "abc".into(),
            title: "Greeting".into(),
            body: vec![StructuralElement {
                start_index: 1,
                end_index: 7,
                content: ElementContent::Paragraph(Paragraph {
                    runs: vec![TextRun::plain("Hello\n")],
                }),
            }],
            end_index: 7,
        }
    }

    #[test]
    fn test_format_list_plain() {
        let out = format_list(&summaries(), OutputFormat::Plain).unwrap();
        assert_eq!(out, "doc-1\tRoadmap\ndoc-2\tNotes");
    }

    #[test]
    fn test_format_list_table_contains_rows() {
        let out = format_list(&summaries(), OutputFormat::Table).unwrap();
        assert!(out.contains("Roadmap"));
        assert!(out.contains("2024-03-01 09:30"));
        assert!(out.contains("doc-2"));
    }

    #[test]
    fn test_format_list_json_uses_api_field_names() {
        let out = format_list(&summaries(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["name"], "Roadmap");
        assert_eq!(value[0]["modifiedTime"], "2024-03-01T09:30:00Z");
    }

    #[test]
    fn test_format_list_empty() {
        assert_eq!(
            format_list(&[], OutputFormat::Table).unwrap(),
            "No documents found."
        );
        assert_eq!(format_list(&[], OutputFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_format_document_plain() {
        let out = format_document(&doc(), OutputFormat::Plain).unwrap();
        assert_eq!(out, "Title: Greeting\n\nHello");
    }

    #[test]
    fn test_format_document_markdown_has_heading() {
        let out = format_document(&doc(), OutputFormat::Markdown).unwrap();
        assert!(out.starts_with("# Greeting\n\n"));
    }

    #[test]
    fn test_format_status_masks_token() {
        let credential = Credential {
            access_token: "ya29.a0AfH6SMBx-very-secret-token".into(),
            refresh_token: Some("1//refresh".into()),
            expiry: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            scopes: BTreeSet::from(["https://www.googleapis.com/auth/documents".to_string()]),
        };
        let out = format_status(AuthState::Valid, Some(&credential));
        assert!(out.contains("Status: authenticated"));
        assert!(out.contains("ya29.a0A..."));
        assert!(!out.contains("very-secret"));
        assert!(!out.contains("auth login"));
    }

    #[test]
    fn test_format_status_flags_expired_refreshable_token() {
        let credential = Credential {
            access_token: "ya29.a0AfH6SMBx-stale".into(),
            refresh_token: Some("1//refresh".into()),
            expiry: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            scopes: BTreeSet::new(),
        };
        let out = format_status(AuthState::Valid, Some(&credential));
        assert!(out.starts_with("Status: authenticated (access token expired, refreshes on next use)"));
        assert!(out.contains("Refresh token: present"));
    }

    #[test]
    fn test_format_status_unauthenticated_hints_login() {
        let out = format_status(AuthState::Unauthenticated, None);
        assert!(out.contains("not authenticated"));
        assert!(out.contains("gdocs auth login"));
    }
}
