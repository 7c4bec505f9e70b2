//! Spreadsheet reader.
//!
//! Reads the first worksheet of an Excel/ODS workbook (via `calamine`) or a
//! comma-separated file (via `csv`) into header → value rows. Cells are
//! rendered as strings; the extractor and normalizer take it from there.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Spreadsheet errors.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),

    #[error("Spreadsheet has no data rows")]
    Empty,
}

pub type SpreadsheetResult<T> = Result<T, SpreadsheetError>;

/// One spreadsheet line as an ordered header → value mapping.
///
/// Headers missing from the mapping are "absent"; a header present with an
/// empty value is still present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(header, value)` pairs.
    pub fn from_pairs<H, V, I>(pairs: I) -> Self
    where
        H: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (H, V)>,
    {
        let mut row = Self::new();
        for (h, v) in pairs {
            row.insert(h, v);
        }
        row
    }

    /// Set a cell, replacing any previous value under the same header.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    /// Value under an exact header.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Identity of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    /// SHA-256 of the file contents, lowercase hex
    pub sha256: String,
    pub size_bytes: u64,
}

impl SourceFile {
    /// Fingerprint raw file bytes.
    pub fn fingerprint(name: impl Into<String>, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            name: name.into(),
            sha256: hex::encode(hasher.finalize()),
            size_bytes: bytes.len() as u64,
        }
    }
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    Workbook,
}

impl SpreadsheetFormat {
    /// Detect the format from a file name's extension.
    pub fn from_name(name: &str) -> SpreadsheetResult<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(SpreadsheetFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SpreadsheetFormat::Workbook),
            _ => Err(SpreadsheetError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// A parsed spreadsheet: header row plus data rows.
#[derive(Debug, Clone)]
pub struct Spreadsheet {
    pub source: SourceFile,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Reads uploaded rosters.
pub struct SpreadsheetReader;

impl SpreadsheetReader {
    /// Read a spreadsheet from disk.
    pub fn read_path(path: impl AsRef<Path>) -> SpreadsheetResult<Spreadsheet> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        // Reject before touching the file
        SpreadsheetFormat::from_name(&name)?;
        let bytes = fs::read(path)?;
        Self::read_bytes(&name, &bytes)
    }

    /// Read a spreadsheet from uploaded bytes; `name` selects the format.
    pub fn read_bytes(name: &str, bytes: &[u8]) -> SpreadsheetResult<Spreadsheet> {
        let format = SpreadsheetFormat::from_name(name)?;
        let source = SourceFile::fingerprint(name, bytes);

        let (headers, rows) = match format {
            SpreadsheetFormat::Csv => Self::read_csv(bytes)?,
            SpreadsheetFormat::Workbook => Self::read_workbook(bytes)?,
        };

        if rows.is_empty() {
            return Err(SpreadsheetError::Empty);
        }

        Ok(Spreadsheet {
            source,
            headers,
            rows,
        })
    }

    fn read_csv(bytes: &[u8]) -> SpreadsheetResult<(Vec<String>, Vec<RawRow>)> {
        // Latin-1 exports turn accented headers into U+FFFD; the extractor
        // carries aliases for those.
        let text = String::from_utf8_lossy(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = RawRow::from_pairs(
                headers
                    .iter()
                    .zip(record.iter())
                    .filter(|(h, v)| !h.is_empty() && !v.is_empty())
                    .map(|(h, v)| (h.clone(), v.to_string())),
            );
            if !row.is_empty() {
                rows.push(row);
            }
        }

        Ok((headers, rows))
    }

    fn read_workbook(bytes: &[u8]) -> SpreadsheetResult<(Vec<String>, Vec<RawRow>)> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(SpreadsheetError::Empty)?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut lines = range.rows();
        let headers: Vec<String> = match lines.next() {
            Some(header_row) => header_row
                .iter()
                .map(|c| cell_to_string(c).trim().to_string())
                .collect(),
            None => return Err(SpreadsheetError::Empty),
        };

        let rows = lines
            .map(|line| {
                RawRow::from_pairs(
                    headers
                        .iter()
                        .zip(line.iter())
                        .map(|(h, c)| (h, cell_to_string(c).trim().to_string()))
                        .filter(|(h, v)| !h.is_empty() && !v.is_empty())
                        .map(|(h, v)| (h.clone(), v)),
                )
            })
            .filter(|row| !row.is_empty())
            .collect();

        Ok((headers, rows))
    }
}

/// Render a workbook cell as text.
///
/// Integral numbers lose their `.0`; date cells become `YYYY-MM-DD`.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_iso(dt.as_f64()).unwrap_or_default(),
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or_default().to_string(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Convert an Excel serial date (1900 system) to `YYYY-MM-DD`.
pub fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Day 0 is 1899-12-30 once the 1900 leap-year bug is accounted for
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.floor() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_present_vs_absent() {
        let row = RawRow::from_pairs([("Peso", "0"), ("Altura", "")]);
        assert_eq!(row.get("Peso"), Some("0"));
        assert_eq!(row.get("Altura"), Some(""));
        assert_eq!(row.get("Nome"), None);
    }

    #[test]
    fn test_raw_row_insert_replaces() {
        let mut row = RawRow::new();
        row.insert("CPF", "1");
        row.insert("CPF", "2");
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("CPF"), Some("2"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(SpreadsheetFormat::from_name("a.CSV").unwrap(), SpreadsheetFormat::Csv);
        assert_eq!(
            SpreadsheetFormat::from_name("roster.xlsx").unwrap(),
            SpreadsheetFormat::Workbook
        );
        assert!(matches!(
            SpreadsheetFormat::from_name("notes.txt"),
            Err(SpreadsheetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_read_csv_bytes() {
        let data = "Nome,CPF,Peso\nAna Souza,529.982.247-25,62\n,,\nBruno Lima,123,\n";
        let sheet = SpreadsheetReader::read_bytes("roster.csv", data.as_bytes()).unwrap();

        assert_eq!(sheet.headers, vec!["Nome", "CPF", "Peso"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("CPF"), Some("529.982.247-25"));
        // Empty cells are omitted, not stored as ""
        assert_eq!(sheet.rows[1].get("Peso"), None);
        assert_eq!(sheet.source.size_bytes, data.len() as u64);
        assert_eq!(sheet.source.sha256.len(), 64);
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let result = SpreadsheetReader::read_bytes("roster.csv", b"Nome,CPF\n");
        assert!(matches!(result, Err(SpreadsheetError::Empty)));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = SourceFile::fingerprint("a.csv", b"abc");
        let b = SourceFile::fingerprint("b.csv", b"abc");
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(
            a.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell_to_string(&Data::Float(70.0)), "70");
        assert_eq!(cell_to_string(&Data::Float(1.75)), "1.75");
        assert_eq!(cell_to_string(&Data::Int(52998224725)), "52998224725");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_excel_serial_to_iso() {
        assert_eq!(excel_serial_to_iso(45292.0).as_deref(), Some("2024-01-01"));
        assert_eq!(excel_serial_to_iso(1.0).as_deref(), Some("1899-12-31"));
        assert_eq!(excel_serial_to_iso(0.0), None);
    }
}
