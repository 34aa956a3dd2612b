// ABOUTME: Integration tests for end-to-end document workflows
// ABOUTME: Uses an in-memory DocsApi so flows run without a server

use assert_fs::prelude::*;
use gdocs::api::DocsApi;
use gdocs::config::{Config, OutputFormat, Paths};
use gdocs::docs::Docs;
use gdocs::model::DocumentSummary;
use gdocs::output::format_document;
use gdocs::render::to_plain;
use gdocs::retry::{Idempotency, RetryPolicy};
use gdocs::{Error, Result};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

/// Keeps each document as a single paragraph of ASCII text ending in a
/// newline, and applies insertText requests to it.
#[derive(Default)]
struct InMemoryDocs {
    docs: RefCell<BTreeMap<String, (String, String)>>,
    calls: Cell<usize>,
    export_failures: Cell<u32>,
}

impl InMemoryDocs {
    fn with_document(id: &str, title: &str, text: &str) -> Self {
        let store = InMemoryDocs::default();
        store
            .docs
            .borrow_mut()
            .insert(id.into(), (title.into(), format!("{}\n", text)));
        store
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn not_found(id: &str) -> Error {
        Error::remote("fake", 404, format!("no document {}", id))
    }
}

impl DocsApi for InMemoryDocs {
    fn get_document(&self, id: &str) -> Result<Value> {
        self.tick();
        let docs = self.docs.borrow();
        let (title, text) = docs.get(id).ok_or_else(|| Self::not_found(id))?;
        Ok(json!({
            "documentId": id,
            "title": title,
            "body": { "content": [
                { "startIndex": 0, "endIndex": 1, "sectionBreak": {} },
                { "startIndex": 1, "endIndex": 1 + text.len(), "paragraph": { "elements": [
                    { "textRun": { "content": text } }
                ] } }
            ] }
        }))
    }

    fn batch_update(&self, id: &str, requests: &[Value]) -> Result<Value> {
        self.tick();
        let mut docs = self.docs.borrow_mut();
        let (_, text) = docs.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        for request in requests {
            let insert = &request["insertText"];
            let index = insert["location"]["index"].as_u64().unwrap_or(1) as usize;
            let inserted = insert["text"].as_str().unwrap_or_default();
            text.insert_str(index - 1, inserted);
        }
        Ok(json!({ "documentId": id }))
    }

    fn create_document(&self, title: &str) -> Result<String> {
        self.tick();
        let id = format!("doc-{}", self.docs.borrow().len() + 1);
        self.docs
            .borrow_mut()
            .insert(id.clone(), (title.into(), "\n".into()));
        Ok(id)
    }

    fn update_title(&self, id: &str, title: &str) -> Result<()> {
        self.tick();
        let mut docs = self.docs.borrow_mut();
        let entry = docs.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        entry.0 = title.into();
        Ok(())
    }

    fn delete_document(&self, id: &str) -> Result<()> {
        self.tick();
        self.docs
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    fn export_document(&self, id: &str, mime_type: &str, sink: &mut dyn Write) -> Result<u64> {
        self.tick();
        if self.export_failures.get() > 0 {
            self.export_failures.set(self.export_failures.get() - 1);
            sink.write_all(b"partial")?;
            return Err(Error::remote("export document", 503, "unavailable"));
        }
        let docs = self.docs.borrow();
        let (_, text) = docs.get(id).ok_or_else(|| Self::not_found(id))?;
        let body = format!("{}:{}", mime_type, text);
        sink.write_all(body.as_bytes())?;
        Ok(body.len() as u64)
    }

    fn list_documents(&self, limit: u32) -> Result<Vec<DocumentSummary>> {
        self.tick();
        Ok(self
            .docs
            .borrow()
            .iter()
            .take(limit as usize)
            .map(|(id, (title, _))| DocumentSummary {
                id: id.clone(),
                name: title.clone(),
                modified_time: None,
                created_time: None,
            })
            .collect())
    }
}

fn fast_retries() -> RetryPolicy {
    RetryPolicy::default()
        .with_base_delay(Duration::from_millis(1))
        .without_jitter()
}

#[test]
fn test_append_hello_world() {
    let api = InMemoryDocs::with_document("doc", "Greeting", "Hello");
    let docs = Docs::new(&api, RetryPolicy::disabled());

    docs.append("doc", " world").unwrap();

    let doc = docs.get("doc").unwrap();
    assert_eq!(to_plain(&doc), "Hello world");
}

#[test]
fn test_appended_text_is_rendered_suffix() {
    let api = InMemoryDocs::with_document("doc", "Log", "");
    let docs = Docs::new(&api, RetryPolicy::disabled());

    for entry in ["first", " second", " third entry"] {
        docs.append("doc", entry).unwrap();
        let rendered = to_plain(&docs.get("doc").unwrap());
        assert!(rendered.ends_with(entry), "{:?} should end with {:?}", rendered, entry);
    }
}

#[test]
fn test_insert_at_start_of_body() {
    let api = InMemoryDocs::with_document("doc", "Greeting", "ello");
    let docs = Docs::new(&api, RetryPolicy::disabled());

    docs.insert("doc", "H", 1).unwrap();
    assert_eq!(to_plain(&docs.get("doc").unwrap()), "Hello");
}

#[test]
fn test_create_with_content_then_rename_and_list() {
    let api = InMemoryDocs::default();
    let docs = Docs::new(&api, RetryPolicy::disabled());

    let created = docs.create("Meeting notes", Some("Agenda")).unwrap();
    assert_eq!(to_plain(&created), "Agenda");

    docs.rename(&created.id, "Weekly sync").unwrap();
    let listed = docs.list(20).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Weekly sync");

    let shown = format_document(&docs.get(&created.id).unwrap(), OutputFormat::Plain).unwrap();
    assert_eq!(shown, "Title: Weekly sync\n\nAgenda");
}

#[test]
fn test_import_markdown_file_titles_from_file_name() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("meeting-notes.md");
    file.write_str("Agenda: ship it").unwrap();

    let api = InMemoryDocs::default();
    let docs = Docs::new(&api, RetryPolicy::disabled());
    let created = docs.import(file.path(), None).unwrap();

    assert_eq!(created.title, "meeting-notes");
    assert_eq!(to_plain(&created), "Agenda: ship it");

    let renamed = docs.import(file.path(), Some("Sync")).unwrap();
    assert_eq!(renamed.title, "Sync");
    assert_eq!(docs.list(10).unwrap().len(), 2);
}

#[test]
fn test_import_missing_file_makes_no_calls() {
    let temp = assert_fs::TempDir::new().unwrap();
    let api = InMemoryDocs::default();
    let docs = Docs::new(&api, RetryPolicy::disabled());

    let err = docs.import(temp.child("absent.md").path(), None).unwrap_err();
    assert_eq!(err.exit_code(), 6);
    assert_eq!(api.calls.get(), 0);
}

#[test]
fn test_delete_then_get_is_not_found() {
    let api = InMemoryDocs::with_document("doc", "Old", "bye");
    let docs = Docs::new(&api, RetryPolicy::disabled());

    docs.delete("doc").unwrap();
    let err = docs.get("doc").unwrap_err();
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_validation_errors_make_no_calls() {
    let api = InMemoryDocs::with_document("doc", "Greeting", "Hello");
    let docs = Docs::new(&api, RetryPolicy::disabled());
    let temp = assert_fs::TempDir::new().unwrap();

    assert!(matches!(docs.append("doc", ""), Err(Error::EmptyInsertion)));
    assert!(matches!(
        docs.insert("doc", "x", -1),
        Err(Error::IndexOutOfRange { length: None, .. })
    ));
    assert!(matches!(
        docs.export("doc", temp.child("picture.png").path()),
        Err(Error::UnsupportedFormat { .. })
    ));
    assert_eq!(api.calls.get(), 0);
    assert!(!temp.child("picture.png").path().exists());
}

#[test]
fn test_export_retries_then_replaces_file_once() {
    let api = InMemoryDocs::with_document("doc", "Report", "Body");
    api.export_failures.set(2);
    let docs = Docs::new(&api, fast_retries());
    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("report.txt");

    let written = docs.export("doc", out.path()).unwrap();

    assert_eq!(api.calls.get(), 3);
    let content = std::fs::read_to_string(out.path()).unwrap();
    assert_eq!(content, "text/plain:Body\n");
    assert_eq!(written, content.len() as u64);
}

#[test]
fn test_export_gives_up_after_max_attempts() {
    let api = InMemoryDocs::with_document("doc", "Report", "Body");
    api.export_failures.set(10);
    let docs = Docs::new(&api, fast_retries().with_max_attempts(3));
    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("report.pdf");

    let err = docs.export("doc", out.path()).unwrap_err();

    assert!(matches!(err, Error::Export { status: 503, .. }));
    assert_eq!(api.calls.get(), 3);
    assert!(!out.path().exists());
}

#[test]
fn test_export_markdown_writes_rendered_body() {
    let api = InMemoryDocs::with_document("doc", "Notes", "Plain body");
    let docs = Docs::new(&api, RetryPolicy::disabled());
    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("nested/notes.md");

    docs.export("doc", out.path()).unwrap();

    assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "Plain body");
}

#[test]
fn test_backoff_grows_between_attempts() {
    let policy = RetryPolicy::default().without_jitter();
    let mut slept = Vec::new();
    let mut attempts = 0;

    let result = policy.run_with_sleep(
        "export document",
        Idempotency::Idempotent,
        || {
            attempts += 1;
            if attempts < 3 {
                Err(Error::remote("export document", 500, "boom"))
            } else {
                Ok(attempts)
            }
        },
        |delay| slept.push(delay),
    );

    assert_eq!(result.unwrap(), 3);
    assert_eq!(slept.len(), 2);
    assert!(slept[1] > slept[0]);
}

#[test]
fn test_config_round_trip_in_custom_dir() {
    let temp = assert_fs::TempDir::new().unwrap();
    let paths = Paths::new(Some(temp.path().join("gdocs"))).unwrap();

    let config = Config {
        output_format: OutputFormat::Markdown,
        default_limit: 5,
    };
    config.save(&paths).unwrap();

    let saved = temp.child("gdocs/config.json");
    assert!(saved.path().exists());
    assert!(std::fs::read_to_string(saved.path())
        .unwrap()
        .contains("\"markdown\""));
    assert_eq!(Config::load(&paths).unwrap(), config);
}

#[test]
fn test_config_set_persists_single_key() {
    let temp = assert_fs::TempDir::new().unwrap();
    let paths = Paths::new(Some(temp.path().join("gdocs"))).unwrap();

    let mut config = Config::load(&paths).unwrap();
    config.set("default_limit", "7").unwrap();
    config.save(&paths).unwrap();

    let reloaded = Config::load(&paths).unwrap();
    assert_eq!(reloaded.default_limit, 7);
    assert_eq!(reloaded.output_format, OutputFormat::Table);
}
