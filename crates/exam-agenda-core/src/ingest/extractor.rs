//! Semantic field extraction from loosely-labelled spreadsheet rows.
//!
//! Each field has an ordered alias list; the first alias present in the row
//! wins. When no alias is present at all, headers are folded and compared
//! with Jaro-Winkler so "Data Nasc." style variants still resolve.

use std::collections::HashMap;

use strsim::jaro_winkler;

use super::reader::RawRow;

/// Minimum folded-header similarity for a fuzzy column match.
pub const FUZZY_HEADER_THRESHOLD: f64 = 0.92;

/// Semantic fields of a roster row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Cpf,
    Gender,
    BirthDate,
    Weight,
    Height,
    Diabetes,
    Treatment,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Cpf,
        Field::Gender,
        Field::BirthDate,
        Field::Weight,
        Field::Height,
        Field::Diabetes,
        Field::Treatment,
    ];

    /// Built-in column labels, in priority order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Name => &["Nome Sobrenome", "Nome", "NOME", "nome", "PACIENTE", "Paciente"],
            Field::Cpf => &["CPF", "cpf", "CPF_PACIENTE"],
            Field::Gender => &["Gênero", "G\u{fffd}nero", "GENERO", "genero", "Sexo", "SEXO"],
            Field::BirthDate => &[
                "Data de Nascimento",
                "Data Nascimento",
                "DATA_NASCIMENTO",
                "data_nascimento",
                "Data_Nascimento",
            ],
            Field::Weight => &["Peso", "PESO", "peso"],
            Field::Height => &["Altura", "ALTURA", "altura"],
            Field::Diabetes => &["Diabetes", "DIABETES", "diabetes"],
            Field::Treatment => &[
                "Tipo de tratamento",
                "Tipo de Tratamento",
                "Tratamento",
                "TRATAMENTO",
                "tratamento",
                "TIPO_TRATAMENTO",
                "Tipo Tratamento",
            ],
        }
    }
}

/// Resolves semantic fields from raw rows.
pub struct FieldExtractor {
    aliases: HashMap<Field, Vec<String>>,
    fuzzy: bool,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    /// Create a new extractor with the built-in aliases and fuzzy matching on.
    pub fn new() -> Self {
        let aliases = Field::ALL
            .iter()
            .map(|f| (*f, f.aliases().iter().map(|a| a.to_string()).collect()))
            .collect();
        Self {
            aliases,
            fuzzy: true,
        }
    }

    /// Exact alias lookup only.
    pub fn without_fuzzy(mut self) -> Self {
        self.fuzzy = false;
        self
    }

    /// Add a custom column label for a field (lowest priority).
    pub fn add_alias(&mut self, field: Field, alias: &str) {
        let list = self.aliases.entry(field).or_default();
        if !list.iter().any(|a| a == alias) {
            list.push(alias.to_string());
        }
    }

    pub fn aliases(&self, field: Field) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Trimmed value of `field`, or an empty string when nothing matches.
    pub fn extract(&self, row: &RawRow, field: Field) -> String {
        self.lookup(row, field)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    /// Raw value of `field`, `None` when no column resolves.
    pub fn lookup<'r>(&self, row: &'r RawRow, field: Field) -> Option<&'r str> {
        let header = self.resolve_header(row, field)?;
        row.get(&header)
    }

    /// The header in `row` that holds `field`.
    pub fn resolve_header(&self, row: &RawRow, field: Field) -> Option<String> {
        let aliases = self.aliases(field);

        // "0" and "" under a known alias still count as present
        if let Some(alias) = aliases.iter().find(|a| row.get(a).is_some()) {
            return Some(alias.clone());
        }

        if self.fuzzy {
            self.fuzzy_header(row, field)
        } else {
            None
        }
    }

    fn fuzzy_header(&self, row: &RawRow, field: Field) -> Option<String> {
        let folded_aliases: Vec<String> = self.aliases(field).iter().map(|a| fold_header(a)).collect();

        let mut best: Option<(String, f64)> = None;
        for header in row.headers() {
            if self.is_exact_alias_of_other(header, field) {
                continue;
            }
            let folded = fold_header(header);
            let score = folded_aliases
                .iter()
                .map(|a| jaro_winkler(&folded, a))
                .fold(0.0_f64, f64::max);

            if score >= FUZZY_HEADER_THRESHOLD
                && best.as_ref().map_or(true, |(_, s)| score > *s)
            {
                best = Some((header.to_string(), score));
            }
        }

        best.map(|(header, _)| header)
    }

    fn is_exact_alias_of_other(&self, header: &str, field: Field) -> bool {
        self.aliases
            .iter()
            .filter(|(f, _)| **f != field)
            .any(|(_, list)| list.iter().any(|a| a == header))
    }
}

/// Fold a column label for fuzzy comparison.
///
/// Lowercases, strips Portuguese diacritics, drops punctuation and collapses
/// `_`, `-` and whitespace runs into single spaces.
pub fn fold_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut pending_space = false;

    for c in header.chars().flat_map(char::to_lowercase) {
        let c = strip_accent(c);
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_space = true;
        }
    }

    out
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}
