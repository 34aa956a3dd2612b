// ABOUTME: Document operations composing the API client, parser, and planner
// ABOUTME: Validates local input before any remote call is made

use crate::api::DocsApi;
use crate::export;
use crate::model::{Document, DocumentSummary};
use crate::mutation::{insert_requests, plan_append, plan_insert, MutationRequest, Operation};
use crate::parser::parse;
use crate::retry::{Idempotency, RetryPolicy};
use crate::{Error, Result};
use std::path::Path;

pub struct Docs<'a> {
    client: &'a dyn DocsApi,
    retry: RetryPolicy,
}

impl<'a> Docs<'a> {
    pub fn new(client: &'a dyn DocsApi, retry: RetryPolicy) -> Self {
        Docs { client, retry }
    }

    pub fn list(&self, limit: u32) -> Result<Vec<DocumentSummary>> {
        if limit == 0 {
            return Err(Error::InvalidArgument("--limit must be at least 1".into()));
        }
        self.retry.run("list documents", Idempotency::Idempotent, || {
            self.client.list_documents(limit)
        })
    }

    pub fn get(&self, id: &str) -> Result<Document> {
        let raw = self.retry.run("get document", Idempotency::Idempotent, || {
            self.client.get_document(id)
        })?;
        parse(raw)
    }

    /// Create a document, optionally seeded with `content`, and return it
    /// as the server now sees it.
    pub fn create(&self, title: &str, content: Option<&str>) -> Result<Document> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title must not be empty".into()));
        }

        let id = self.retry.run("create document", Idempotency::AtMostOnce, || {
            self.client.create_document(title)
        })?;
        tracing::info!(document_id = %id, "document created");

        match content.filter(|c| !c.is_empty()) {
            Some(content) => {
                self.append(&id, content)?;
                self.get(&id)
            }
            None => self.get(&id),
        }
    }

    /// Create a document from a local Markdown file. The text is inserted
    /// as-is; the title defaults to the file name without its extension.
    pub fn import(&self, path: &Path, title: Option<&str>) -> Result<Document> {
        let is_markdown = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"));
        if !is_markdown {
            return Err(Error::InvalidArgument(format!(
                "only Markdown (.md) files can be imported: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let title = match title {
            Some(title) => title.to_string(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        tracing::debug!(path = %path.display(), bytes = content.len(), "importing file");

        self.create(&title, Some(&content))
    }

    pub fn rename(&self, id: &str, title: &str) -> Result<()> {
        let request = MutationRequest::update_title(title)?;
        self.apply(id, &request)
    }

    /// Append `text` to the end of the body. Returns the request that was sent.
    pub fn append(&self, id: &str, text: &str) -> Result<MutationRequest> {
        if text.is_empty() {
            return Err(Error::EmptyInsertion);
        }
        let doc = self.get(id)?;
        let request = plan_append(&doc, text)?;
        self.apply(id, &request)?;
        Ok(request)
    }

    /// Insert `text` at a raw native offset. Returns the request that was sent.
    pub fn insert(&self, id: &str, text: &str, index: i64) -> Result<MutationRequest> {
        if text.is_empty() {
            return Err(Error::EmptyInsertion);
        }
        if index < 0 {
            return Err(Error::IndexOutOfRange {
                index,
                length: None,
            });
        }
        let doc = self.get(id)?;
        let request = plan_insert(&doc, text, index)?;
        self.apply(id, &request)?;
        Ok(request)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.apply(id, &MutationRequest::delete_document())
    }

    /// Execute `request` in order. Consecutive insertions travel in a single
    /// batch; title changes and deletion go through the file API.
    pub fn apply(&self, id: &str, request: &MutationRequest) -> Result<()> {
        let operations = request.operations();
        let mut i = 0;

        while i < operations.len() {
            match &operations[i] {
                Operation::InsertText { .. } => {
                    let run_len = operations[i..]
                        .iter()
                        .take_while(|op| matches!(op, Operation::InsertText { .. }))
                        .count();
                    let requests = insert_requests(&operations[i..i + run_len]);
                    self.retry.run("batch update", Idempotency::AtMostOnce, || {
                        self.client.batch_update(id, &requests)
                    })?;
                    tracing::info!(document_id = id, inserts = run_len, "text inserted");
                    i += run_len;
                }
                Operation::UpdateTitle { title } => {
                    self.retry.run("update title", Idempotency::AtMostOnce, || {
                        self.client.update_title(id, title)
                    })?;
                    i += 1;
                }
                Operation::DeleteDocument => {
                    self.retry.run("delete document", Idempotency::AtMostOnce, || {
                        self.client.delete_document(id)
                    })?;
                    i += 1;
                }
            }
        }

        Ok(())
    }

    pub fn export(&self, id: &str, destination: &Path) -> Result<u64> {
        export::export(self.client, &self.retry, id, destination)
    }
}
