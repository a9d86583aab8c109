use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::catalog::{resolve_field, Field};
use crate::identity::{Clock, IdGenerator};
use crate::models::{Client, Note};
use crate::spreadsheet::EXPORT_DATE_FORMAT;

/// One spreadsheet row: headers in column order with their cell values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, Option<String>)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing the value in place if the key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when no cell carries a non-blank value
    pub fn is_blank(&self) -> bool {
        self.cells
            .iter()
            .all(|(_, v)| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, Some(v.into()));
        }
        row
    }
}

impl IntoIterator for RawRow {
    type Item = (String, Option<String>);
    type IntoIter = std::vec::IntoIter<(String, Option<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportRowError {
    #[error("row has no values")]
    Blank,
}

/// Builds a client from one imported row.
///
/// Headers resolve against the catalog, then the alias table; anything
/// else is kept verbatim in `Client::extra`. Every call draws a fresh
/// client id and stamps notes with the current time.
pub fn normalize_row(
    row: &RawRow,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<Client, ImportRowError> {
    if row.is_blank() {
        return Err(ImportRowError::Blank);
    }

    let mut client = Client {
        id: ids.next_id(),
        ..Client::default()
    };

    for (key, value) in row.iter() {
        match resolve_field(key) {
            Some(Field::Tags) => client.tags = split_tags(value),
            Some(Field::Notes) => {
                let now = clock.now();
                client.notes = split_notes(value)
                    .into_iter()
                    .map(|content| Note {
                        id: ids.next_id(),
                        content,
                        date: now,
                    })
                    .collect();
            }
            Some(field) => {
                if let Some(slot) = client.field_mut(field) {
                    *slot = value.unwrap_or_default().to_string();
                }
            }
            None => {
                if key == "id" {
                    warn!("dropping imported column 'id', it would shadow the client id");
                    continue;
                }
                if let Some(value) = value {
                    client.extra.insert(key.to_string(), value.to_string());
                }
            }
        }
    }

    Ok(client)
}

fn split_tags(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn split_notes(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(';')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| strip_export_date(n).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Removes the `" (dd/mm/yyyy)"` suffix the exporter appends to each note.
fn strip_export_date(note: &str) -> &str {
    let Some(body) = note.strip_suffix(')') else {
        return note;
    };
    let Some(open) = body.rfind(" (") else {
        return note;
    };
    let date = &body[open + 2..];
    if NaiveDate::parse_from_str(date, EXPORT_DATE_FORMAT).is_ok() {
        body[..open].trim_end()
    } else {
        note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{FixedClock, SequentialIds};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn fixtures() -> (SequentialIds, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        (SequentialIds::new(), clock)
    }

    #[test]
    fn canonical_headers_copy_values_unchanged() {
        let (ids, clock) = fixtures();
        let row: RawRow = [
            ("FirstName", " Maria "),
            ("EMAIL", "maria@example.com"),
            ("tax_id", "20-123"),
        ]
        .into_iter()
        .collect();

        let client = normalize_row(&row, &ids, &clock).unwrap();
        assert_eq!(client.first_name, " Maria ");
        assert_eq!(client.email, "maria@example.com");
        assert_eq!(client.tax_id, "20-123");
        assert_eq!(client.id, Uuid::from_u128(1));
    }

    #[test]
    fn aliases_route_to_canonical_fields() {
        let (ids, clock) = fixtures();
        let row: RawRow = [("Nombre", "Juan"), ("Apellido", "Pérez"), ("Celular", "555")]
            .into_iter()
            .collect();

        let client = normalize_row(&row, &ids, &clock).unwrap();
        assert_eq!(client.first_name, "Juan");
        assert_eq!(client.last_name, "Pérez");
        assert_eq!(client.phone, "555");
        assert!(client.extra.is_empty());
    }

    #[test]
    fn unknown_headers_are_kept_as_extra_attributes() {
        let (ids, clock) = fixtures();
        let mut row = RawRow::new();
        row.insert("Teléfono", Some("123".into()));
        row.insert("Vendedor", None);

        let client = normalize_row(&row, &ids, &clock).unwrap();
        assert_eq!(client.extra.get("Teléfono").map(String::as_str), Some("123"));
        assert!(!client.extra.contains_key("Vendedor"));
        assert!(client.phone.is_empty());
    }

    #[test]
    fn absent_recognized_values_become_empty_strings() {
        let (ids, clock) = fixtures();
        let mut row = RawRow::new();
        row.insert("email", Some("a@b.c".into()));
        row.insert("company", None);

        let client = normalize_row(&row, &ids, &clock).unwrap();
        assert_eq!(client.company, "");
    }

    #[test]
    fn tags_split_on_commas() {
        let (ids, clock) = fixtures();
        let row: RawRow = [("email", "x@y.z"), ("Etiquetas", "Nuevo, Activo ,,")]
            .into_iter()
            .collect();

        let client = normalize_row(&row, &ids, &clock).unwrap();
        assert_eq!(client.tags, vec!["Nuevo", "Activo"]);
    }

    #[test]
    fn notes_split_on_semicolons_and_take_import_time() {
        let (ids, clock) = fixtures();
        let row: RawRow = [("email", "x@y.z"), ("notas", "Llamar; Enviar presupuesto (04/02/2024)")]
            .into_iter()
            .collect();

        let client = normalize_row(&row, &ids, &clock).unwrap();
        let contents: Vec<_> = client.notes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["Llamar", "Enviar presupuesto"]);
        assert!(client.notes.iter().all(|n| n.date == clock.now()));
        assert_ne!(client.notes[0].id, client.notes[1].id);
    }

    #[test]
    fn parenthesized_text_that_is_not_a_date_is_kept() {
        assert_eq!(strip_export_date("Reunión (urgente)"), "Reunión (urgente)");
        assert_eq!(strip_export_date("Visita (01/02/2024)"), "Visita");
        assert_eq!(strip_export_date("(01/02/2024)"), "(01/02/2024)");
    }

    #[test]
    fn blank_rows_are_rejected() {
        let (ids, clock) = fixtures();
        let mut row = RawRow::new();
        row.insert("email", Some("  ".into()));
        row.insert("phone", None);
        assert_eq!(normalize_row(&row, &ids, &clock), Err(ImportRowError::Blank));
    }

    #[test]
    fn id_column_does_not_become_an_attribute() {
        let (ids, clock) = fixtures();
        let row: RawRow = [("id", "42"), ("email", "x@y.z")].into_iter().collect();
        let client = normalize_row(&row, &ids, &clock).unwrap();
        assert!(client.extra.is_empty());
        assert_eq!(client.id, Uuid::from_u128(1));
    }

    #[test]
    fn insert_replaces_existing_key_in_place() {
        let mut row = RawRow::new();
        row.insert("a", Some("1".into()));
        row.insert("b", Some("2".into()));
        row.insert("a", Some("3".into()));
        let keys: Vec<_> = row.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(row.get("a"), Some("3"));
    }
}
