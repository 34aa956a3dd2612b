// ABOUTME: Blocking HTTP client for the Docs and Drive APIs
// ABOUTME: Maps non-success responses to classified remote errors

use crate::model::DocumentSummary;
use crate::{Error, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;

pub const DOCS_BASE: &str = "https://docs.googleapis.com";
pub const DRIVE_BASE: &str = "https://www.googleapis.com";
const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";

pub(crate) fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

/// Remote calls the rest of the crate needs. Every failure with an HTTP
/// status surfaces as [`Error::Remote`].
pub trait DocsApi {
    fn get_document(&self, id: &str) -> Result<Value>;
    fn batch_update(&self, id: &str, requests: &[Value]) -> Result<Value>;
    fn create_document(&self, title: &str) -> Result<String>;
    fn update_title(&self, id: &str, title: &str) -> Result<()>;
    /// Moves the document to the trash.
    fn delete_document(&self, id: &str) -> Result<()>;
    /// Streams the exported bytes into `sink`, returning how many were written.
    fn export_document(&self, id: &str, mime_type: &str, sink: &mut dyn Write) -> Result<u64>;
    fn list_documents(&self, limit: u32) -> Result<Vec<DocumentSummary>>;
}

pub struct ApiClient {
    client: Client,
    docs_base: String,
    drive_base: String,
    token: String,
}

impl ApiClient {
    /// `base_url` replaces both API hosts, which is what tests pointing at a
    /// single mock server want.
    pub fn new(token: String, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        let (docs_base, drive_base) = match base_url {
            Some(base) => {
                let base = base.trim_end_matches('/').to_string();
                (base.clone(), base)
            }
            None => (DOCS_BASE.into(), DRIVE_BASE.into()),
        };

        Ok(ApiClient {
            client,
            docs_base,
            drive_base,
            token,
        })
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("User-Agent", concat!("gdocs/", env!("CARGO_PKG_VERSION"), " (Rust)"))
            .send()?;

        let status = response.status();
        tracing::debug!(operation, status = status.as_u16(), "remote call finished");

        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(Error::remote(operation, status.as_u16(), truncate_str(&message, 200)));
        }

        Ok(response)
    }

    fn send_json(&self, operation: &str, request: RequestBuilder) -> Result<Value> {
        let body = self.send(operation, request)?.text()?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                operation,
                "unparseable response body (first 500 chars): {}",
                truncate_str(&body, 500)
            );
            Error::Parse(e)
        })
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/v1/documents/{}", self.docs_base, id)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.drive_base, id)
    }
}

impl DocsApi for ApiClient {
    fn get_document(&self, id: &str) -> Result<Value> {
        self.send_json("get document", self.client.get(self.document_url(id)))
    }

    fn batch_update(&self, id: &str, requests: &[Value]) -> Result<Value> {
        let url = format!("{}:batchUpdate", self.document_url(id));
        self.send_json(
            "batch update",
            self.client.post(url).json(&json!({ "requests": requests })),
        )
    }

    fn create_document(&self, title: &str) -> Result<String> {
        let url = format!("{}/v1/documents", self.docs_base);
        let created = self.send_json(
            "create document",
            self.client.post(url).json(&json!({ "title": title })),
        )?;

        created
            .get("documentId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedDocument("create response has no documentId".into()))
    }

    fn update_title(&self, id: &str, title: &str) -> Result<()> {
        self.send_json(
            "update title",
            self.client.patch(self.file_url(id)).json(&json!({ "name": title })),
        )?;
        Ok(())
    }

    fn delete_document(&self, id: &str) -> Result<()> {
        self.send_json(
            "delete document",
            self.client.patch(self.file_url(id)).json(&json!({ "trashed": true })),
        )?;
        Ok(())
    }

    fn export_document(&self, id: &str, mime_type: &str, sink: &mut dyn Write) -> Result<u64> {
        let url = format!("{}/export", self.file_url(id));
        let mut response = self.send(
            "export document",
            self.client.get(url).query(&[("mimeType", mime_type)]),
        )?;
        Ok(response.copy_to(sink)?)
    }

    fn list_documents(&self, limit: u32) -> Result<Vec<DocumentSummary>> {
        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            files: Vec<DocumentSummary>,
        }

        let url = format!("{}/drive/v3/files", self.drive_base);
        let query = format!("mimeType='{}' and trashed=false", DOCUMENT_MIME);
        let page_size = limit.to_string();
        let value = self.send_json(
            "list documents",
            self.client.get(url).query(&[
                ("q", query.as_str()),
                ("pageSize", page_size.as_str()),
                ("fields", "files(id,name,modifiedTime,createdTime)"),
                ("orderBy", "modifiedTime desc"),
            ]),
        )?;

        let resp: Response = serde_json::from_value(value)?;
        Ok(resp.files)
    }
}
