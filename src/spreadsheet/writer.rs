use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::Workbook;
use tracing::info;

use super::{Format, SpreadsheetError, EXPORT_DATE_FORMAT};
use crate::catalog::Field;
use crate::models::{Client, Note};

/// Worksheet name of exported workbooks
pub const SHEET_NAME: &str = "Clientes";

/// Column headers, in catalog order
pub fn export_header() -> Vec<&'static str> {
    Field::ALL.iter().map(|f| f.as_str()).collect()
}

/// One row per client, one cell per catalog field.
pub fn export_rows(clients: &[Client]) -> Vec<Vec<String>> {
    clients.iter().map(export_row).collect()
}

fn export_row(client: &Client) -> Vec<String> {
    Field::ALL
        .iter()
        .map(|&field| match field {
            Field::Tags => client.tags.join(", "),
            Field::Notes => client
                .notes
                .iter()
                .map(format_note)
                .collect::<Vec<_>>()
                .join("; "),
            _ => client.field(field).unwrap_or_default().to_string(),
        })
        .collect()
}

fn format_note(note: &Note) -> String {
    let date = note.date.with_timezone(&Local).format(EXPORT_DATE_FORMAT);
    format!("{} ({})", note.content, date)
}

/// Writes clients in the format named by the file extension
pub fn write_export(path: &Path, clients: &[Client]) -> Result<(), SpreadsheetError> {
    match Format::from_path(path)? {
        Format::Csv => write_csv(path, clients),
        Format::Workbook => write_xlsx(path, clients),
    }
}

pub fn write_xlsx(path: &Path, clients: &[Client]) -> Result<(), SpreadsheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in export_header().into_iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }
    for (row, cells) in export_rows(clients).iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            worksheet.write_string(row as u32 + 1, col as u16, value)?;
        }
    }

    workbook.save(path)?;
    info!(path = %path.display(), clients = clients.len(), "workbook exported");
    Ok(())
}

pub fn write_csv(path: &Path, clients: &[Client]) -> Result<(), SpreadsheetError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(export_header())?;
    for cells in export_rows(clients) {
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    info!(path = %path.display(), clients = clients.len(), "csv exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn header_follows_catalog_order() {
        assert_eq!(
            export_header(),
            vec![
                "firstName", "lastName", "email", "phone", "company", "address", "province",
                "taxId", "dni", "location", "tags", "notes"
            ]
        );
    }

    #[test]
    fn tags_and_notes_are_flattened() {
        let date = Utc.with_ymd_and_hms(2024, 2, 4, 12, 0, 0).unwrap();
        let local = date.with_timezone(&Local).format(EXPORT_DATE_FORMAT).to_string();
        let client = Client {
            first_name: "Ana".into(),
            tags: vec!["Nuevo".into(), "Activo".into()],
            notes: vec![
                Note { id: Uuid::from_u128(1), content: "Llamar".into(), date },
                Note { id: Uuid::from_u128(2), content: "Visitar".into(), date },
            ],
            ..Client::default()
        };

        let row = &export_rows(&[client])[0];
        assert_eq!(row[0], "Ana");
        assert_eq!(row[1], "");
        assert_eq!(row[10], "Nuevo, Activo");
        assert_eq!(row[11], format!("Llamar ({local}); Visitar ({local})"));
    }

    #[test]
    fn extra_attributes_are_not_exported() {
        let mut client = Client::default();
        client.extra.insert("Vendedor".into(), "Juan".into());
        let row = &export_rows(&[client])[0];
        assert_eq!(row.len(), 12);
        assert!(row.iter().all(|cell| cell.is_empty()));
    }
}
