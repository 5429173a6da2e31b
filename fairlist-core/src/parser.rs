//! Record Parser
//!
//! Turns an uploaded CSV or spreadsheet into [`CandidateRecord`]s. Column
//! headers are matched against an ordered alias table per field, so files
//! exported from different tools ("FirstName", "first_name", "First Name")
//! land in the same canonical shape.
//!
//! The whole input is read into memory before anything downstream runs; the
//! returned `Vec` can be walked as many times as the pipeline needs.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::{CandidateRecord, IngestError, IngestLimits, IngestResult};

/// Accepted header spellings for the name column, in priority order.
pub const NAME_ALIASES: &[&str] = &["FirstName", "First_Name", "First Name", "Name"];

/// Accepted header spellings for the phone column, in priority order.
pub const PHONE_ALIASES: &[&str] = &["Phone", "Phone_Number", "PhoneNumber", "Mobile"];

/// Accepted header spellings for the note column, in priority order.
pub const NOTE_ALIASES: &[&str] = &["Notes", "Note", "Comments"];

/// Declared format of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadFormat {
    Csv,
    Xlsx,
    Xls,
}

impl UploadFormat {
    /// Resolve a format from an extension such as `"csv"` or `".XLSX"`.
    pub fn from_extension(extension: &str) -> IngestResult<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Ok(UploadFormat::Csv),
            "xlsx" => Ok(UploadFormat::Xlsx),
            "xls" => Ok(UploadFormat::Xls),
            _ => Err(IngestError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Resolve a format from the client-supplied file name.
    pub fn from_file_name(file_name: &str) -> IngestResult<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, UploadFormat::Xlsx | UploadFormat::Xls)
    }
}

/// Parse `bytes` in the declared `format` into candidate records.
pub fn parse_records(
    bytes: &[u8],
    format: UploadFormat,
    limits: &IngestLimits,
) -> IngestResult<Vec<CandidateRecord>> {
    if bytes.len() > limits.max_input_bytes {
        return Err(IngestError::InputTooLarge {
            size: bytes.len(),
            limit: limits.max_input_bytes,
        });
    }

    let records = match format {
        UploadFormat::Csv => parse_csv(bytes)?,
        UploadFormat::Xlsx | UploadFormat::Xls => parse_spreadsheet(bytes)?,
    };

    tracing::debug!(?format, records = records.len(), "Parsed upload");
    Ok(records)
}

fn parse_csv(bytes: &[u8]) -> IngestResult<Vec<CandidateRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns = ColumnMap::from_headers(headers.iter());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let cells: Vec<&str> = row.iter().collect();
        records.push(columns.extract(&cells));
    }
    Ok(records)
}

fn parse_spreadsheet(bytes: &[u8]) -> IngestResult<Vec<CandidateRecord>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Parse {
            reason: format!("Error parsing Excel file: {}", e),
        })?;

    // Only the first sheet is read.
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| IngestError::Parse {
            reason: format!("Error reading first sheet: {}", e),
        })?,
        None => return Ok(Vec::new()),
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
    let columns = ColumnMap::from_headers(headers.iter().map(String::as_str));

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        records.push(columns.extract(&cells));
    }
    Ok(records)
}

fn csv_error(err: csv::Error) -> IngestError {
    IngestError::Parse {
        reason: format!("Malformed CSV: {}", err),
    }
}

/// Render a spreadsheet cell as text without locale formatting.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Phone numbers stored as numeric cells come back as floats; whole values
/// must print as plain digits ("5551234567", not "5551234567.0" or "5.55e9").
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Column indices for each canonical field, in alias priority order.
#[derive(Debug, Default)]
struct ColumnMap {
    name: Vec<usize>,
    phone: Vec<usize>,
    note: Vec<usize>,
}

impl ColumnMap {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Self {
        let headers: Vec<&str> = headers
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        Self {
            name: resolve_aliases(&headers, NAME_ALIASES),
            phone: resolve_aliases(&headers, PHONE_ALIASES),
            note: resolve_aliases(&headers, NOTE_ALIASES),
        }
    }

    fn extract(&self, cells: &[&str]) -> CandidateRecord {
        CandidateRecord {
            name: first_non_empty(cells, &self.name),
            phone: first_non_empty(cells, &self.phone),
            note: first_non_empty(cells, &self.note),
        }
    }
}

fn resolve_aliases(headers: &[&str], aliases: &[&str]) -> Vec<usize> {
    let mut indices = Vec::new();
    for alias in aliases {
        for (idx, header) in headers.iter().enumerate() {
            if header.eq_ignore_ascii_case(alias) && !indices.contains(&idx) {
                indices.push(idx);
            }
        }
    }
    indices
}

fn first_non_empty(cells: &[&str], indices: &[usize]) -> String {
    indices
        .iter()
        .filter_map(|&idx| cells.get(idx))
        .find(|value| !value.is_empty())
        .map(|value| value.to_string())
        .unwrap_or_default()
}
