//! Row selection keyed by (appointment, CPF).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{AppointmentPatientRow, RowKey};

/// Selected rows. Sent rows never enter the set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    keys: BTreeSet<RowKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a row's membership. Returns whether the row is now selected.
    pub fn toggle(&mut self, row: &AppointmentPatientRow) -> bool {
        if !row.is_selectable() {
            return false;
        }
        if self.keys.remove(&row.key) {
            false
        } else {
            self.keys.insert(row.key.clone());
            true
        }
    }

    /// Add a row if it is selectable.
    pub fn select(&mut self, row: &AppointmentPatientRow) -> bool {
        if !row.is_selectable() {
            return false;
        }
        self.keys.insert(row.key.clone());
        true
    }

    pub fn deselect(&mut self, key: &RowKey) -> bool {
        self.keys.remove(key)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
