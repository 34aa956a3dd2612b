// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags

use crate::config::OutputFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gdocs")]
#[command(about = "Read, edit, and export Google Docs from the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override configuration directory
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// API base URL for both the Docs and Drive APIs
    #[arg(long, global = true, hide = true)]
    pub api_base: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List recent documents
    List {
        /// Maximum number of documents
        #[arg(short, long)]
        limit: Option<u32>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a document
    Get {
        /// Document ID
        id: String,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Create a new document
    Create {
        /// Document title
        title: String,

        /// Initial content
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Update document properties
    Update {
        /// Document ID
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Append text to the end of a document
    Append {
        /// Document ID
        id: String,

        /// Text to append
        text: String,
    },

    /// Insert text at a specific offset
    Insert {
        /// Document ID
        id: String,

        /// Text to insert
        text: String,

        /// Offset to insert at (1 is the start of the body)
        #[arg(short, long, allow_negative_numbers = true)]
        index: i64,
    },

    /// Export a document to a file; the format follows the extension
    Export {
        /// Document ID
        id: String,

        /// Destination path (.pdf, .docx, .txt, .html, .rtf, .odt, .epub, .md)
        path: PathBuf,
    },

    /// Create a document from a Markdown file
    Import {
        /// Markdown (.md) file to read
        path: PathBuf,

        /// Document title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Move a document to the trash
    Delete {
        /// Document ID
        id: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Manage authentication
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Show or change saved preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// Sign in through the browser
    Login,
    /// Show the stored credential
    Status,
    /// Remove the stored credential
    Logout,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the current preferences
    Show,
    /// Save one preference (output_format or default_limit)
    Set { key: String, value: String },
}
