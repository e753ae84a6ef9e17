//! Pre-flight checks before loading the service.
//!
//! Validates that required configuration and data files are in place
//! before startup, so failures name the missing piece instead of
//! surfacing halfway through loading.

use crate::config::Settings;
use crate::error::{MedragError, Result};
use crate::openai::api_key;
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Serving and asking need the API key, the tables and the index.
    Answer,
    /// Building the index needs the API key and the tables.
    BuildIndex,
    /// Checking data integrity needs the tables and the index.
    Check,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    settings.validate()?;

    match operation {
        Operation::Answer => {
            api_key(&settings.provider)?;
            check_tables(settings)?;
            check_index(settings)?;
        }
        Operation::BuildIndex => {
            api_key(&settings.provider)?;
            check_tables(settings)?;
        }
        Operation::Check => {
            check_tables(settings)?;
            check_index(settings)?;
        }
    }
    Ok(())
}

fn check_tables(settings: &Settings) -> Result<()> {
    check_file("summary table", &settings.summary_path())?;
    check_file("full-text table", &settings.fulltext_path())
}

fn check_index(settings: &Settings) -> Result<()> {
    check_file("vector index", &settings.index_path()).map_err(|e| {
        MedragError::Config(format!("{}. Build it with: medrag index", e))
    })?;
    check_file("index id map", &settings.index_ids_path())
}

fn check_file(what: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(MedragError::Config(format!(
            "{} not found at {}",
            what,
            path.display()
        )))
    }
}
