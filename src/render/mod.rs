// ABOUTME: Format renderers for the parsed document model
// ABOUTME: Plain and Markdown are lossy views; structured output round-trips

mod markdown;
mod plain;
mod structured;

pub use markdown::{format_run, to_markdown};
pub use plain::to_plain;
pub use structured::{to_json, to_structured};

/// Text of a run without the newline that terminates its paragraph.
pub(crate) fn strip_terminator(content: &str) -> &str {
    content.strip_suffix('\n').unwrap_or(content)
}
