//! CSV identifier source
//!
//! Reads a headered CSV file into `ItemRecord`s. The identifier column is required; the URL and
//! metadata columns are optional per retailer.

use crate::config::RetailerConfig;
use crate::source::{ItemRecord, Metadata};
use crate::{SourceError, SourceResult};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column names to read from an identifier CSV
#[derive(Debug, Clone)]
pub struct SourceColumns {
    pub id_column: String,
    pub url_column: Option<String>,
    pub metadata_columns: Vec<String>,
}

impl SourceColumns {
    pub fn from_retailer(retailer: &RetailerConfig) -> Self {
        Self {
            id_column: retailer.id_column.clone(),
            url_column: retailer.url_column.clone(),
            metadata_columns: retailer.metadata_columns.clone(),
        }
    }
}

/// Loads every item from an identifier CSV
///
/// # Errors
///
/// Fails if the file cannot be opened, is not valid CSV, or lacks the identifier or URL column.
/// Any such failure is fatal for the run.
pub fn load_items(path: &Path, columns: &SourceColumns) -> SourceResult<Vec<ItemRecord>> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let items = read_items(file, columns, &path.display().to_string())?;
    tracing::info!("Loaded {} identifiers from {}", items.len(), path.display());
    Ok(items)
}

/// Reads items from any CSV reader
///
/// Rows with an empty identifier are skipped, and only the first row of a repeated identifier is
/// kept. A URL cell that is empty or `NULL` means "no explicit target".
pub fn read_items<R: Read>(
    reader: R,
    columns: &SourceColumns,
    source_name: &str,
) -> SourceResult<Vec<ItemRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();

    let id_index = column_index(&headers, &columns.id_column).ok_or_else(|| {
        SourceError::MissingColumn {
            path: source_name.to_string(),
            column: columns.id_column.clone(),
        }
    })?;

    let url_index = match &columns.url_column {
        Some(column) => Some(column_index(&headers, column).ok_or_else(|| {
            SourceError::MissingColumn {
                path: source_name.to_string(),
                column: column.clone(),
            }
        })?),
        None => None,
    };

    let metadata_indices: Vec<(&str, Option<usize>)> = columns
        .metadata_columns
        .iter()
        .map(|column| {
            let index = column_index(&headers, column);
            if index.is_none() {
                tracing::warn!(
                    "Metadata column '{}' not found in {}, values will be empty",
                    column,
                    source_name
                );
            }
            (column.as_str(), index)
        })
        .collect();

    let mut items = Vec::new();
    let mut seen = HashSet::new();

    for (row_number, row) in reader.records().enumerate() {
        let row = row?;

        let identifier = row.get(id_index).unwrap_or("").to_string();
        if identifier.is_empty() {
            tracing::warn!(
                "Skipping row {} of {}: empty identifier",
                row_number + 2,
                source_name
            );
            continue;
        }

        if !seen.insert(identifier.clone()) {
            tracing::warn!(
                "Skipping row {} of {}: duplicate identifier {}",
                row_number + 2,
                source_name,
                identifier
            );
            continue;
        }

        let target = url_index
            .and_then(|index| row.get(index))
            .filter(|url| !url.is_empty() && !url.eq_ignore_ascii_case("null"))
            .map(str::to_string);

        let metadata: Metadata = metadata_indices
            .iter()
            .map(|(column, index)| {
                let value = index.and_then(|i| row.get(i)).unwrap_or("");
                (*column, value)
            })
            .collect();

        items.push(ItemRecord {
            identifier,
            target,
            metadata,
        });
    }

    Ok(items)
}

/// Finds a header by name, ignoring surrounding whitespace
fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    let name = name.trim();
    headers.iter().position(|header| header == name)
}
