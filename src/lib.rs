//! medrag - Retrieval-Augmented Medical Question Answering
//!
//! A small service that answers free-text medical questions by retrieving
//! related documents from a precomputed vector index and handing them to a
//! hosted language model as context.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `corpus` - Id to summary/full-text lookup tables
//! - `embedding` - Query and document embeddings
//! - `vector_store` - Nearest-neighbor index abstraction
//! - `generation` - Prompt completion through the hosted model
//! - `rag` - Retrieve-then-generate engine
//! - `orchestrator` - Startup wiring and index building
//! - `cli` - Command line and HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use medrag::config::Settings;
//! use medrag::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let response = orchestrator.engine().ask("fever and cough", Some(2)).await?;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

pub use error::{MedragError, Result};
