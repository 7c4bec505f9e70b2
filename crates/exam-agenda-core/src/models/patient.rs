//! Patient import models.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Diabetes indicator as exchanged with the backend.
///
/// The backend expects the literal strings `"Sim"` / `"Não"` (or an empty
/// string when unknown), never a JSON boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiabetesFlag {
    Yes,
    No,
    #[default]
    Unknown,
}

impl DiabetesFlag {
    /// Wire representation.
    pub fn as_wire(&self) -> &'static str {
        match self {
            DiabetesFlag::Yes => "Sim",
            DiabetesFlag::No => "Não",
            DiabetesFlag::Unknown => "",
        }
    }

    /// Parse free text ("sim", "S", "true", "1", "yes", "não", "0", ...).
    pub fn parse(value: &str) -> Self {
        let lower = value.trim().to_lowercase();
        match lower.as_str() {
            "sim" | "s" | "true" | "1" | "yes" | "y" => DiabetesFlag::Yes,
            "não" | "nao" | "n" | "false" | "0" | "no" => DiabetesFlag::No,
            _ => DiabetesFlag::Unknown,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, DiabetesFlag::Yes)
    }
}

impl From<bool> for DiabetesFlag {
    fn from(value: bool) -> Self {
        if value {
            DiabetesFlag::Yes
        } else {
            DiabetesFlag::No
        }
    }
}

impl Serialize for DiabetesFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for DiabetesFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Loose {
            Bool(bool),
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Loose::deserialize(deserializer)? {
            Loose::Bool(b) => b.into(),
            Loose::Int(n) => (n == 1).into(),
            Loose::Float(f) => (f == 1.0).into(),
            Loose::Text(s) => DiabetesFlag::parse(&s),
        })
    }
}

/// A patient row extracted from an uploaded roster, ready for import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientImportRecord {
    /// Spreadsheet line (1-based, header on line 1)
    pub line_number: usize,
    /// Patient full name
    pub name: String,
    /// CPF, digits only
    pub cpf: String,
    /// Gender code ("M" when the roster omits it)
    pub gender: String,
    /// Birth date as `YYYY-MM-DD`, empty when unparseable
    pub birth_date: String,
    /// Treatment type (free text from the roster)
    pub treatment_type: String,
    /// Diabetes indicator
    pub diabetes: DiabetesFlag,
    /// Weight in kg, within 1..=300
    pub weight_kg: f64,
    /// Height in meters, within 0.01..=3
    pub height_m: f64,
}

impl PatientImportRecord {
    /// Spreadsheet line for a zero-based data row index.
    pub fn line_for_index(index: usize) -> usize {
        index + 2
    }
}
