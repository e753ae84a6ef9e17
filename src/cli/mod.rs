//! CLI module for medrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::ErrorMode;
use crate::orchestrator::IndexSource;
use clap::{Parser, Subcommand};

/// medrag - retrieval-augmented medical question answering
///
/// Answers free-text medical questions from a precomputed document index
/// and a hosted language model.
#[derive(Parser, Debug)]
#[command(name = "medrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// How request failures are reported (inline, status)
        #[arg(long)]
        error_mode: Option<ErrorMode>,
    },

    /// Ask a question and print the answer with its sources
    Ask {
        /// The question to ask
        query: String,

        /// Number of documents to retrieve
        #[arg(short)]
        k: Option<usize>,
    },

    /// Retrieve matching documents without calling the language model
    Search {
        /// Search query
        query: String,

        /// Number of documents to retrieve
        #[arg(short)]
        k: Option<usize>,
    },

    /// Embed the corpus and write the vector index
    Index {
        /// Table to embed (fulltext, summary)
        #[arg(long, default_value = "fulltext")]
        source: IndexSource,
    },

    /// Check the index id map against the lookup tables
    Check {
        /// Number of sample ids to print
        #[arg(long, default_value = "10")]
        sample: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file if none exists
    Init,

    /// Show configuration file path
    Path,
}
