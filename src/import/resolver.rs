use std::collections::BTreeSet;

use crate::catalog::{alias, Field};
use crate::error::{Error, Result};
use crate::models::{ColumnMapping, ColumnTarget};

use super::RawRow;

/// What to do with a parsed batch of rows
#[derive(Debug)]
pub enum ImportPlan {
    /// Every header is known; rows are already rewritten to canonical keys.
    Ready(Vec<RawRow>),
    /// Some headers need a user decision before anything is imported.
    NeedsMapping(PendingImport),
}

/// Headers of the batch, taken from the first row.
pub fn headers_of(rows: &[RawRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().map(String::from).collect())
        .unwrap_or_default()
}

/// A header is known when it is exactly a catalog field name, normalizes to
/// an alias, or already has a saved mapping entry (`Ignore` included).
///
/// Near misses such as `Phone` or `Tax Id` are not known here; only the
/// normalizer matches canonical names loosely.
pub fn is_known(header: &str, saved: &ColumnMapping) -> bool {
    Field::ALL.iter().any(|f| f.as_str() == header)
        || alias(header).is_some()
        || saved.get(header).is_some()
}

pub fn unknown_headers(headers: &[String], saved: &ColumnMapping) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !is_known(h, saved))
        .cloned()
        .collect()
}

pub fn plan_import(rows: Vec<RawRow>, saved: &ColumnMapping) -> ImportPlan {
    let headers = headers_of(&rows);
    let unknown = unknown_headers(&headers, saved);

    if unknown.is_empty() {
        let rows = rows.into_iter().map(|row| rewrite_known(row, saved)).collect();
        ImportPlan::Ready(rows)
    } else {
        ImportPlan::NeedsMapping(PendingImport {
            headers,
            unknown,
            rows,
            selections: saved.clone(),
            cleared: BTreeSet::new(),
        })
    }
}

/// Saved mapping, then alias table, then the header itself.
fn rewrite_known(row: RawRow, saved: &ColumnMapping) -> RawRow {
    let mut out = RawRow::new();
    for (key, value) in row {
        match saved.get(&key) {
            Some(ColumnTarget::Ignore) => {}
            Some(ColumnTarget::Field(field)) => out.insert(field.as_str(), value),
            None => match alias(&key) {
                Some(field) => out.insert(field.as_str(), value),
                None => out.insert(key, value),
            },
        }
    }
    out
}

/// Explicit selection, then the header itself. The alias table is not consulted here.
fn rewrite_selected(row: RawRow, selections: &ColumnMapping) -> RawRow {
    let mut out = RawRow::new();
    for (key, value) in row {
        match selections.get(&key) {
            Some(ColumnTarget::Ignore) => {}
            Some(ColumnTarget::Field(field)) => out.insert(field.as_str(), value),
            None => out.insert(key, value),
        }
    }
    out
}

/// A batch held back until the user confirms a column mapping.
///
/// The raw rows are kept exactly as parsed.
#[derive(Debug, Clone)]
pub struct PendingImport {
    headers: Vec<String>,
    unknown: Vec<String>,
    rows: Vec<RawRow>,
    selections: ColumnMapping,
    // headers whose saved entry is dropped on save
    cleared: BTreeSet<String>,
}

impl PendingImport {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Headers that triggered the pause
    pub fn unknown_headers(&self) -> &[String] {
        &self.unknown
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn selections(&self) -> &ColumnMapping {
        &self.selections
    }

    /// Current choice for a header; `None` keeps the column under its own name.
    pub fn selection(&self, header: &str) -> Option<ColumnTarget> {
        self.selections.get(header)
    }

    pub fn select(&mut self, header: &str, target: ColumnTarget) -> Result<()> {
        if !self.headers.iter().any(|h| h == header) {
            return Err(Error::UnknownHeader(header.to_string()));
        }
        self.selections.set(header, target);
        self.cleared.remove(header);
        Ok(())
    }

    /// Drops the choice for a header so it is imported under its own name.
    ///
    /// A saved mapping entry for the header is forgotten when the import is saved.
    pub fn unselect(&mut self, header: &str) -> Result<()> {
        if !self.headers.iter().any(|h| h == header) {
            return Err(Error::UnknownHeader(header.to_string()));
        }
        self.selections.remove(header);
        self.cleared.insert(header.to_string());
        Ok(())
    }

    /// The mapping to persist: `saved` overwritten by the selections, minus
    /// the headers that were unselected.
    pub fn merged_mapping(&self, saved: &ColumnMapping) -> ColumnMapping {
        let mut mapping = saved.clone();
        mapping.merge(&self.selections);
        for header in &self.cleared {
            mapping.remove(header);
        }
        mapping
    }

    /// Rewrites the held rows through the selections.
    pub(crate) fn resolve(self) -> Vec<RawRow> {
        let selections = self.selections;
        self.rows
            .into_iter()
            .map(|row| rewrite_selected(row, &selections))
            .collect()
    }
}
