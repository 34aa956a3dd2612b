// ABOUTME: Public library API for the gdocs command-line tool
// ABOUTME: Re-exports core modules for external use

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod export;
pub mod model;
pub mod mutation;
pub mod oauth;
pub mod output;
pub mod parser;
pub mod render;
pub mod retry;
pub mod storage;

pub use error::{Error, Result};
pub use model::{Document, DocumentSummary};
