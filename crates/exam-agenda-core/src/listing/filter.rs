//! Listing filters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ingest::clean_cpf;
use crate::models::AppointmentPatientRow;

/// Status filter. `Pending` means "not sent yet", whatever the row's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Sent,
    Pending,
}

/// Which row date the range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Registration,
    #[default]
    Collection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Matched against the name (case-insensitive) and the CPF
    pub text: String,
    pub status: StatusFilter,
    pub date_field: DateField,
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
}

impl ListingFilter {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
            && self.status == StatusFilter::All
            && self.from.is_none()
            && self.to.is_none()
    }

    pub fn matches(&self, row: &AppointmentPatientRow) -> bool {
        self.matches_text(row) && self.matches_status(row) && self.matches_dates(row)
    }

    fn matches_text(&self, row: &AppointmentPatientRow) -> bool {
        let term = self.text.trim();
        if term.is_empty() {
            return true;
        }
        if row.name.to_lowercase().contains(&term.to_lowercase()) || row.cpf().contains(term) {
            return true;
        }
        // "529.982" should still find 52998224725
        let digits = clean_cpf(term);
        !digits.is_empty() && row.cpf().contains(&digits)
    }

    fn matches_status(&self, row: &AppointmentPatientRow) -> bool {
        match self.status {
            StatusFilter::All => true,
            StatusFilter::Sent => row.is_sent(),
            StatusFilter::Pending => !row.is_sent(),
        }
    }

    fn matches_dates(&self, row: &AppointmentPatientRow) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let raw = match self.date_field {
            DateField::Registration => &row.registration_date,
            DateField::Collection => &row.appointment_date,
        };
        let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            return false;
        };

        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
