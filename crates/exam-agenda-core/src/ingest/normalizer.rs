//! Field normalizers for roster values.
//!
//! Handles:
//! - CPF cleaning (lenient) and the strict check-digit predicate
//! - Ambiguous date disambiguation (pt-BR day-first vs US month-first)
//! - Weight/height defaults, unit fix-ups and clamping
//! - Free-text diabetes flags
//!
//! None of these fail: bad input degrades to an empty string or a default.

use crate::models::DiabetesFlag;

pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const MIN_WEIGHT_KG: f64 = 1.0;
pub const MAX_WEIGHT_KG: f64 = 300.0;

pub const DEFAULT_HEIGHT_M: f64 = 1.7;
pub const MIN_HEIGHT_M: f64 = 0.01;
pub const MAX_HEIGHT_M: f64 = 3.0;

/// Strip every non-digit. Never rejects: length and checksum problems are
/// left for the backend to judge.
pub fn clean_cpf(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Result of the strict CPF check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpfStatus {
    Valid,
    WrongLength,
    RepeatedDigits,
    ChecksumMismatch,
}

/// Expected check digits for an 11-digit CPF.
///
/// The first digit weighs positions 0..9 by 10..2, the second positions
/// 0..10 by 11..2; a remainder below 2 yields 0.
pub fn cpf_check_digits(digits: &str) -> Option<(u8, u8)> {
    let d: Vec<u32> = digits.chars().map(|c| c.to_digit(10)).collect::<Option<_>>()?;
    if d.len() != 11 {
        return None;
    }

    let check = |len: usize| -> u8 {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, v)| v * (len as u32 + 1 - i as u32))
            .sum();
        let rem = sum % 11;
        if rem < 2 {
            0
        } else {
            (11 - rem) as u8
        }
    };

    Some((check(9), check(10)))
}

/// Strict CPF classification of an already-cleaned digit string.
pub fn cpf_status(digits: &str) -> CpfStatus {
    if digits.len() != 11 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return CpfStatus::WrongLength;
    }
    let bytes = digits.as_bytes();
    if bytes.iter().all(|b| *b == bytes[0]) {
        return CpfStatus::RepeatedDigits;
    }

    match cpf_check_digits(digits) {
        Some((d1, d2)) if bytes[9] - b'0' == d1 && bytes[10] - b'0' == d2 => CpfStatus::Valid,
        _ => CpfStatus::ChecksumMismatch,
    }
}

/// Strict predicate. Never used to block an import.
pub fn is_valid_cpf(input: &str) -> bool {
    cpf_status(&clean_cpf(input)) == CpfStatus::Valid
}

/// Normalize a free-text date to `YYYY-MM-DD`, or `""` when it cannot be read.
///
/// When both day and month are 12 or less the date is read day-first.
pub fn normalize_date(input: &str) -> String {
    let data = input.trim();
    if data.is_empty() {
        return String::new();
    }

    if let Some(iso) = iso_prefix(data) {
        return iso.to_string();
    }

    let normalized = parse_ambiguous_date(data);
    if normalized.is_empty() {
        tracing::warn!(value = %data, "unrecognized date format");
    }
    normalized
}

fn iso_prefix(data: &str) -> Option<&str> {
    let bytes = data.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    let shape = bytes[..10].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    let tail_ok = bytes.len() == 10 || bytes[10] == b'T' || bytes[10] == b' ';
    (shape && tail_ok).then(|| &data[..10])
}

fn parse_ambiguous_date(data: &str) -> String {
    let separator = ['/', '-', '.'].into_iter().find(|s| data.contains(*s));
    let parts: Vec<&str> = match separator {
        Some(sep) => data.split(sep).collect(),
        None => return String::new(),
    };
    if parts.len() != 3 {
        return String::new();
    }

    let (Some(p0), Some(p1), Some(p2)) = (
        leading_int(parts[0]),
        leading_int(parts[1]),
        leading_int(parts[2]),
    ) else {
        return String::new();
    };

    let year = match parts[2].len() {
        4 => p2,
        2 if p2 > 30 => 1900 + p2,
        2 => 2000 + p2,
        _ => return String::new(),
    };

    let (day, month) = if p0 > 12 {
        (p0, p1)
    } else if p1 > 12 {
        (p1, p0)
    } else {
        (p0, p1)
    };

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || !(1900..=2100).contains(&year) {
        return String::new();
    }

    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// Leading unsigned integer of a token ("12abc" → 12).
fn leading_int(token: &str) -> Option<u32> {
    let digits: String = token
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Leading float of a cell ("70,5 kg" → 70.5). A decimal comma is accepted.
pub fn leading_float(input: &str) -> Option<f64> {
    let text = input.trim().replace(',', ".");
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '-' | '+' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    text[..end].parse().ok()
}

/// Weight in kg: unreadable or non-positive becomes 70, then clamp to 1..=300.
pub fn normalize_weight(input: &str) -> f64 {
    match leading_float(input) {
        Some(w) if w > 0.0 => w.clamp(MIN_WEIGHT_KG, MAX_WEIGHT_KG),
        _ => DEFAULT_WEIGHT_KG,
    }
}

/// Height in meters: unreadable or non-positive becomes 1.7, values above 3
/// are read as centimeters, then clamp to 0.01..=3.
pub fn normalize_height(input: &str) -> f64 {
    match leading_float(input) {
        Some(h) if h > 0.0 => {
            let meters = if h > MAX_HEIGHT_M { h / 100.0 } else { h };
            meters.clamp(MIN_HEIGHT_M, MAX_HEIGHT_M)
        }
        _ => DEFAULT_HEIGHT_M,
    }
}

/// Free-text diabetes flag.
pub fn parse_diabetes(input: &str) -> DiabetesFlag {
    DiabetesFlag::parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_cpf() {
        assert_eq!(clean_cpf("529.982.247-25"), "52998224725");
        assert_eq!(clean_cpf("abc"), "");
        assert_eq!(clean_cpf("123"), "123");
    }

    #[test]
    fn test_cpf_check_digits() {
        assert_eq!(cpf_check_digits("52998224725"), Some((2, 5)));
        assert_eq!(cpf_check_digits("5299822472"), None);
    }

    #[test]
    fn test_cpf_status() {
        assert_eq!(cpf_status("52998224725"), CpfStatus::Valid);
        assert_eq!(cpf_status("52998224724"), CpfStatus::ChecksumMismatch);
        assert_eq!(cpf_status("11111111111"), CpfStatus::RepeatedDigits);
        assert_eq!(cpf_status("123"), CpfStatus::WrongLength);
        assert!(is_valid_cpf("529.982.247-25"));
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(normalize_date("2024-03-01"), "2024-03-01");
        assert_eq!(normalize_date("2024-03-01T00:00:00"), "2024-03-01");
        assert_eq!(normalize_date("  "), "");
    }

    #[test]
    fn test_month_first() {
        assert_eq!(normalize_date("12/25/2024"), "2024-12-25");
    }

    #[test]
    fn test_other_separators() {
        assert_eq!(normalize_date("25-12-2024"), "2024-12-25");
        assert_eq!(normalize_date("25.12.2024"), "2024-12-25");
        assert_eq!(normalize_date("5/3/85"), "1985-03-05");
    }

    #[test]
    fn test_bad_dates() {
        assert_eq!(normalize_date("2024/12"), "");
        assert_eq!(normalize_date("01/02/123"), "");
        assert_eq!(normalize_date("01/02/5"), "");
        assert_eq!(normalize_date("ontem"), "");
        assert_eq!(normalize_date("13/13/2024"), "");
        assert_eq!(normalize_date("01/01/1850"), "");
    }

    #[test]
    fn test_leading_float() {
        assert_eq!(leading_float("70,5"), Some(70.5));
        assert_eq!(leading_float("82 kg"), Some(82.0));
        assert_eq!(leading_float("-5"), Some(-5.0));
        assert_eq!(leading_float("kg"), None);
        assert_eq!(leading_float(""), None);
    }

    #[test]
    fn test_weight_bounds() {
        assert_eq!(normalize_weight("0.5"), 1.0);
        assert_eq!(normalize_weight("abc"), 70.0);
        assert_eq!(normalize_weight("82"), 82.0);
    }

    #[test]
    fn test_height_bounds() {
        assert_eq!(normalize_height("500"), 3.0);
        assert_eq!(normalize_height("0.005"), 0.01);
        assert_eq!(normalize_height("-1"), 1.7);
    }
}
