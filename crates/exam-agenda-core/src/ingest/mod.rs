//! Roster ingestion.
//!
//! Pipeline: Spreadsheet → RawRow → Field extraction → Normalization → Record

mod extractor;
mod normalizer;
mod reader;
mod validation;

pub use extractor::*;
pub use normalizer::*;
pub use reader::*;
pub use validation::*;

use crate::models::PatientImportRecord;

/// Gender used when the roster has no gender column.
pub const DEFAULT_GENDER: &str = "M";

/// Turns raw rows into import records.
pub struct RowIngestor {
    extractor: FieldExtractor,
}

impl Default for RowIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl RowIngestor {
    /// Create a new ingestor with the default extractor.
    pub fn new() -> Self {
        Self::with_extractor(FieldExtractor::new())
    }

    pub fn with_extractor(extractor: FieldExtractor) -> Self {
        Self { extractor }
    }

    /// Build one record. Never fails on field content.
    pub fn ingest_row(&self, index: usize, row: &RawRow) -> PatientImportRecord {
        let field = |f: Field| self.extractor.extract(row, f);

        let gender = field(Field::Gender);

        PatientImportRecord {
            line_number: PatientImportRecord::line_for_index(index),
            name: field(Field::Name),
            cpf: clean_cpf(&field(Field::Cpf)),
            gender: if gender.is_empty() {
                DEFAULT_GENDER.to_string()
            } else {
                gender
            },
            birth_date: normalize_date(&field(Field::BirthDate)),
            treatment_type: field(Field::Treatment),
            diabetes: parse_diabetes(&field(Field::Diabetes)),
            weight_kg: normalize_weight(&field(Field::Weight)),
            height_m: normalize_height(&field(Field::Height)),
        }
    }

    /// Build one record per row, in order.
    pub fn ingest(&self, rows: &[RawRow]) -> Vec<PatientImportRecord> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.ingest_row(i, row))
            .collect()
    }

    pub fn ingest_spreadsheet(&self, sheet: &Spreadsheet) -> Vec<PatientImportRecord> {
        self.ingest(&sheet.rows)
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut FieldExtractor {
        &mut self.extractor
    }
}
