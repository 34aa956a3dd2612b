// ABOUTME: Export dispatcher mapping file extensions to export MIME types
// ABOUTME: Streams remote exports to disk; Markdown is rendered locally

use crate::api::DocsApi;
use crate::parser::parse;
use crate::render::to_markdown;
use crate::retry::{Idempotency, RetryPolicy};
use crate::storage::write_atomic_with;
use crate::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;

const EXPORT_FORMATS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("rtf", "application/rtf"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("epub", "application/epub+zip"),
];

const MARKDOWN_EXTENSION: &str = "md";

pub fn supported_extensions() -> Vec<&'static str> {
    EXPORT_FORMATS
        .iter()
        .map(|(ext, _)| *ext)
        .chain(std::iter::once(MARKDOWN_EXTENSION))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    /// Converted by the remote export endpoint.
    Remote { mime_type: &'static str },
    /// Rendered here from the document model.
    Markdown,
}

/// Pick the export target from `destination`'s extension (case-insensitive).
pub fn target_for(destination: &Path) -> Result<ExportTarget> {
    let extension = destination
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if extension == MARKDOWN_EXTENSION {
        return Ok(ExportTarget::Markdown);
    }

    EXPORT_FORMATS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime_type)| ExportTarget::Remote { mime_type })
        .ok_or(Error::UnsupportedFormat { extension })
}

/// Export `document_id` to `destination`, returning the bytes written.
/// The destination is only replaced once the whole export has arrived.
pub fn export(
    client: &dyn DocsApi,
    policy: &RetryPolicy,
    document_id: &str,
    destination: &Path,
) -> Result<u64> {
    let target = target_for(destination)?;
    tracing::info!(document_id, destination = %destination.display(), ?target, "exporting");

    let written = match target {
        ExportTarget::Markdown => {
            let raw = policy.run("get document", Idempotency::Idempotent, || {
                client.get_document(document_id)
            })?;
            let markdown = to_markdown(&parse(raw)?);
            write_atomic_with(destination, |file| {
                file.write_all(markdown.as_bytes())?;
                Ok(markdown.len() as u64)
            })
        }
        ExportTarget::Remote { mime_type } => {
            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::with_template("{spinner} exporting {msg}: {bytes} written")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            progress.set_message(document_id.to_string());
            progress.enable_steady_tick(Duration::from_millis(120));

            let written = write_atomic_with(destination, |file| {
                policy.run("export document", Idempotency::Idempotent, || {
                    file.set_len(0)?;
                    file.seek(SeekFrom::Start(0))?;
                    let mut sink = progress.wrap_write(&mut *file);
                    client.export_document(document_id, mime_type, &mut sink)
                })
            });
            progress.finish_and_clear();
            written
        }
    };

    written.map_err(|e| match e {
        Error::Remote {
            status, message, ..
        } => Error::Export {
            document_id: document_id.to_string(),
            status,
            message,
        },
        other => other,
    })
}
