// ABOUTME: Mutation planning: computes insertion offsets against a parsed document
// ABOUTME: Builds ordered edit batches and their batchUpdate wire encoding

use crate::model::{Document, MIN_BODY_INDEX};
use crate::{Error, Result};
use serde_json::{json, Value};
use std::cmp::Reverse;

/// One atomic edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    InsertText { index: usize, text: String },
    UpdateTitle { title: String },
    DeleteDocument,
}

/// An ordered batch of operations sent for one document.
///
/// Insertions are kept in an order where no earlier insertion shifts the
/// offset of a later one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationRequest {
    operations: Vec<Operation>,
}

impl MutationRequest {
    fn single(op: Operation) -> Self {
        MutationRequest {
            operations: vec![op],
        }
    }

    pub fn update_title(title: &str) -> Result<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title must not be empty".into()));
        }
        Ok(Self::single(Operation::UpdateTitle {
            title: title.to_string(),
        }))
    }

    pub fn delete_document() -> Self {
        Self::single(Operation::DeleteDocument)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Combine two requests and restore execution order: insertions by
    /// descending index, then title changes, then deletion.
    ///
    /// Two insertions at the same index run latest-first so the inserted
    /// texts read in the order they were planned.
    pub fn merge(mut self, other: MutationRequest) -> Self {
        self.operations.extend(other.operations);

        let mut keyed: Vec<(usize, Operation)> = self.operations.into_iter().enumerate().collect();
        keyed.sort_by_key(|(seq, op)| match op {
            Operation::InsertText { index, .. } => (0, Reverse(*index), Reverse(*seq)),
            Operation::UpdateTitle { .. } => (1, Reverse(0), Reverse(usize::MAX - *seq)),
            Operation::DeleteDocument => (2, Reverse(0), Reverse(usize::MAX - *seq)),
        });

        MutationRequest {
            operations: keyed.into_iter().map(|(_, op)| op).collect(),
        }
    }
}

/// Plan appending `text` at the end of the document body.
///
/// The target is one before the body's length, since the final newline
/// of the body cannot be written past. Empty documents take the first
/// writable offset instead.
pub fn plan_append(doc: &Document, text: &str) -> Result<MutationRequest> {
    if text.is_empty() {
        return Err(Error::EmptyInsertion);
    }

    let length = doc.length();
    let index = if length <= MIN_BODY_INDEX {
        MIN_BODY_INDEX
    } else {
        length - 1
    };

    Ok(MutationRequest::single(Operation::InsertText {
        index,
        text: text.to_string(),
    }))
}

/// Plan inserting `text` at a raw native offset. The offset is not snapped
/// to a paragraph or character boundary.
pub fn plan_insert(doc: &Document, text: &str, index: i64) -> Result<MutationRequest> {
    if text.is_empty() {
        return Err(Error::EmptyInsertion);
    }

    let length = doc.length();
    let index = usize::try_from(index)
        .ok()
        .filter(|i| *i <= length)
        .ok_or(Error::IndexOutOfRange {
            index,
            length: Some(length),
        })?;

    Ok(MutationRequest::single(Operation::InsertText {
        index,
        text: text.to_string(),
    }))
}

/// Encode a run of `InsertText` operations as `batchUpdate` request objects.
/// Other operation kinds are not part of the document batch and are skipped.
pub fn insert_requests(operations: &[Operation]) -> Vec<Value> {
    operations
        .iter()
        .filter_map(|op| match op {
            Operation::InsertText { index, text } => Some(json!({
                "insertText": {
                    "location": { "index": index },
                    "text": text,
                }
            })),
            _ => None,
        })
        .collect()
}
