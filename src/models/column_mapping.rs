use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Field;
use crate::error::Error;

/// Where a spreadsheet column goes on import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnTarget {
    Ignore,
    Field(Field),
}

impl TryFrom<String> for ColumnTarget {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(ColumnTarget::Ignore);
        }
        value.parse().map(ColumnTarget::Field)
    }
}

impl From<ColumnTarget> for String {
    fn from(target: ColumnTarget) -> Self {
        match target {
            ColumnTarget::Ignore => String::new(),
            ColumnTarget::Field(field) => field.as_str().to_string(),
        }
    }
}

/// User-confirmed header to field associations, stored under `excelColumnMapping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    entries: BTreeMap<String, ColumnTarget>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, header: &str) -> Option<ColumnTarget> {
        self.entries.get(header).copied()
    }

    pub fn set(&mut self, header: impl Into<String>, target: ColumnTarget) {
        self.entries.insert(header.into(), target);
    }

    pub fn remove(&mut self, header: &str) -> Option<ColumnTarget> {
        self.entries.remove(header)
    }

    /// Entries of `other` overwrite entries with the same header.
    pub fn merge(&mut self, other: &ColumnMapping) {
        for (header, target) in &other.entries {
            self.entries.insert(header.clone(), *target);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnTarget)> {
        self.entries.iter().map(|(h, t)| (h.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ColumnTarget)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (String, ColumnTarget)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
