//! CSV ingestion with text-encoding fallback.
//!
//! Files arrive in whatever encoding the export tool produced. The loader
//! reads the file once and probes a short ordered list of encodings: strict
//! UTF-8 first, then Windows-1252 (which also covers Latin-1 under the
//! WHATWG mapping and, as a single-byte encoding, cannot fail to decode).

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1252;
use log::{debug, warn};
use thiserror::Error;

use crate::table::{Table, Value};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse CSV")]
    Csv(#[from] csv::Error),
}

/// Counters describing what the loader did, printed by the CLI front-end.
#[derive(Debug, Clone, Copy)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub skipped_rows: usize,
}

/// Load a CSV file into a [`Table`] of untyped cells.
///
/// Empty fields become `Missing`; everything else loads as text and is typed
/// later by the coercion passes. Records that fail to parse are skipped and
/// counted, not fatal; an unreadable file or header row is.
pub fn load_table(path: &Path) -> Result<(Table, LoadReport), LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_with_fallback(&bytes);

    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for record in rdr.records() {
        total_rows += 1;
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                warn!("skipping unreadable record {}: {}", total_rows, err);
                skipped_rows += 1;
                continue;
            }
        };
        rows.push(record.iter().map(Value::from_field).collect());
    }

    let report = LoadReport {
        total_rows,
        kept_rows: rows.len(),
        skipped_rows,
    };
    Ok((Table::new(headers, rows), report))
}

fn decode_with_fallback(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }
    debug!("input is not valid UTF-8, falling back to Windows-1252");
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text
}
