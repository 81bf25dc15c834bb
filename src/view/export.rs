use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::tree::FlatEntry;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One row of the JSON export: a flattened comment with its tree depth.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: u64,
    depth: usize,
    author: Option<&'a str>,
    created_at: i64,
    text: &'a str,
}

/// Write the flattened comment list as pretty-printed JSON, preserving the
/// pre-order position and depth of every entry.
#[instrument(skip(entries), fields(rows = entries.len(), path = %path.display()))]
pub fn write_json(entries: &[FlatEntry<'_>], path: &Path) -> Result<(), ExportError> {
    let rows: Vec<ExportRow<'_>> = entries
        .iter()
        .map(|entry| ExportRow {
            id: entry.item.id,
            depth: entry.depth,
            author: entry.item.by.as_deref(),
            created_at: entry.item.created_at(),
            text: entry.item.text.as_deref().unwrap_or(""),
        })
        .collect();
    let json = serde_json::to_string_pretty(&rows)?;
    fs::write(path, json)?;
    debug!("export written");
    Ok(())
}
