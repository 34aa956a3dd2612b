// ABOUTME: Markdown renderer with a fixed style precedence
// ABOUTME: Links wrap bold, bold wraps italic; underline has no Markdown form

use crate::model::{Document, ElementContent, Table, TextRun, TextStyle};

use super::strip_terminator;

/// Render the document as Markdown, one line per paragraph.
///
/// Run styles nest in a fixed order, outermost first: link, bold, italic.
/// `[**text**](url)` is therefore the only rendering of a bold link. This
/// order is a choice made here for determinism; the remote API makes no
/// promise about how overlapping styles should read. Underline is recognized
/// but has no Markdown syntax, so underlined text renders unadorned.
pub fn to_markdown(doc: &Document) -> String {
    let mut lines: Vec<String> = Vec::new();

    for element in &doc.body {
        match &element.content {
            ElementContent::Paragraph(p) => {
                if p.runs.is_empty() {
                    continue;
                }
                let line: String = merge_runs(&p.runs)
                    .into_iter()
                    .map(|(text, style)| format_run(strip_terminator(&text), style))
                    .collect();
                lines.push(line);
            }
            ElementContent::Table(t) => render_table(&mut lines, t),
            ElementContent::SectionBreak => {}
        }
    }

    lines.join("\n")
}

/// Join neighbouring runs that share a style so a split run renders as one
/// span instead of abutting markers like `**Hel****lo**`.
fn merge_runs(runs: &[TextRun]) -> Vec<(String, &TextStyle)> {
    let mut merged: Vec<(String, &TextStyle)> = Vec::new();
    for run in runs {
        match merged.last_mut() {
            Some((text, style)) if **style == run.style => text.push_str(&run.content),
            _ => merged.push((run.content.clone(), &run.style)),
        }
    }
    merged
}

/// Apply Markdown syntax for `style` to `text`. Surrounding whitespace stays
/// outside the markers so emphasis is recognized by Markdown parsers.
pub fn format_run(text: &str, style: &TextStyle) -> String {
    let core = text.trim();
    if core.is_empty() || style.is_plain() {
        return text.to_string();
    }

    let leading = &text[..text.len() - text.trim_start().len()];
    let trailing = &text[text.trim_end().len()..];

    let mut out = core.to_string();
    if style.italic {
        out = format!("*{}*", out);
    }
    if style.bold {
        out = format!("**{}**", out);
    }
    if let Some(url) = &style.link_url {
        out = format!("[{}]({})", out, url);
    }

    format!("{}{}{}", leading, out, trailing)
}

fn render_table(lines: &mut Vec<String>, table: &Table) {
    let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = (0..columns)
            .map(|c| row.get(c).map(|s| s.replace('|', "\\|")).unwrap_or_default())
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, StructuralElement, TextRun};

    fn style(bold: bool, italic: bool, link: Option<&str>) -> TextStyle {
        TextStyle {
            bold,
            italic,
            underline: false,
            link_url: link.map(str::to_string),
        }
    }

    fn doc_of(runs: Vec<TextRun>) -> Document {
        Document {
            id: "d".into(),
            title: "t".into(),
            body: vec![StructuralElement {
                start_index: 1,
                end_index: 40,
                content: ElementContent::Paragraph(Paragraph { runs }),
            }],
            end_index: 40,
        }
    }

    #[test]
    fn test_format_run_single_styles() {
        assert_eq!(format_run("word", &style(true, false, None)), "**word**");
        assert_eq!(format_run("word", &style(false, true, None)), "*word*");
        assert_eq!(
            format_run("docs", &style(false, false, Some("https://x.test"))),
            "[docs](https://x.test)"
        );
    }

    #[test]
    fn test_format_run_link_wraps_bold() {
        let rendered = format_run("Docs", &style(true, false, Some("https://x.test")));
        insta::assert_snapshot!(rendered, @"[**Docs**](https://x.test)");
        for _ in 0..3 {
            assert_eq!(
                format_run("Docs", &style(true, false, Some("https://x.test"))),
                rendered
            );
        }
    }

    #[test]
    fn test_format_run_all_styles() {
        let rendered = format_run("all", &style(true, true, Some("https://x.test")));
        insta::assert_snapshot!(rendered, @"[***all***](https://x.test)");
    }

    #[test]
    fn test_format_run_keeps_whitespace_outside_markers() {
        assert_eq!(format_run(" bold ", &style(true, false, None)), " **bold** ");
        assert_eq!(format_run("   ", &style(true, false, None)), "   ");
    }

    #[test]
    fn test_underline_renders_plain() {
        let underline = TextStyle {
            underline: true,
            ..Default::default()
        };
        assert_eq!(format_run("under", &underline), "under");
    }

    #[test]
    fn test_to_markdown_mixed_runs() {
        let doc = doc_of(vec![
            TextRun::plain("Read the "),
            TextRun::styled("guide", style(false, true, Some("https://x.test/guide"))),
            TextRun::plain(" before "),
            TextRun::styled("Monday\n", style(true, false, None)),
        ]);
        insta::assert_snapshot!(
            to_markdown(&doc),
            @"Read the [*guide*](https://x.test/guide) before **Monday**"
        );
    }

    #[test]
    fn test_to_markdown_merges_split_runs() {
        let doc = doc_of(vec![
            TextRun::styled("Hel", style(true, false, None)),
            TextRun::styled("lo", style(true, false, None)),
            TextRun::plain(", "),
            TextRun::plain("see "),
            TextRun::styled("the ", style(false, false, Some("https://x.test"))),
            TextRun::styled("docs\n", style(false, false, Some("https://x.test"))),
        ]);
        insta::assert_snapshot!(
            to_markdown(&doc),
            @"**Hello**, see [the docs](https://x.test)"
        );
    }

    #[test]
    fn test_to_markdown_keeps_distinct_links_apart() {
        let doc = doc_of(vec![
            TextRun::styled("one", style(false, false, Some("https://a.test"))),
            TextRun::styled("two\n", style(false, false, Some("https://b.test"))),
        ]);
        assert_eq!(
            to_markdown(&doc),
            "[one](https://a.test)[two](https://b.test)"
        );
    }

    #[test]
    fn test_to_markdown_table() {
        let doc = Document {
            id: "d".into(),
            title: "t".into(),
            body: vec![StructuralElement {
                start_index: 1,
                end_index: 30,
                content: ElementContent::Table(Table {
                    rows: vec![
                        vec!["Name".into(), "Role".into()],
                        vec!["Ada".into(), "a|b".into()],
                    ],
                    raw: serde_json::Value::Null,
                }),
            }],
            end_index: 30,
        };
        assert_eq!(
            to_markdown(&doc),
            "| Name | Role |\n| --- | --- |\n| Ada | a\\|b |"
        );
    }
}
