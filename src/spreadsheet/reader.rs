use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use super::{Format, SpreadsheetError};
use crate::import::RawRow;

/// Parses the first worksheet (or the CSV file) into rows keyed by the header row.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, SpreadsheetError> {
    let rows = match Format::from_path(path)? {
        Format::Csv => read_csv(path)?,
        Format::Workbook => read_workbook(path)?,
    };
    debug!(path = %path.display(), rows = rows.len(), "spreadsheet parsed");
    Ok(rows)
}

pub fn read_workbook(path: &Path) -> Result<Vec<RawRow>, SpreadsheetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;

    let grid = range
        .rows()
        .map(|cells| cells.iter().map(cell_text).collect::<Vec<_>>());
    Ok(rows_from_grid(grid))
}

pub fn read_csv(path: &Path) -> Result<Vec<RawRow>, SpreadsheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|v| (!v.is_empty()).then(|| v.to_string()))
                .collect::<Vec<_>>(),
        );
    }
    Ok(rows_from_grid(grid))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Turns a grid of cells into rows, using the first line as headers.
///
/// Columns with an empty header are dropped, repeated headers get `_1`,
/// `_2`... suffixes, and lines with no values are skipped.
pub fn rows_from_grid<I>(grid: I) -> Vec<RawRow>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let mut lines = grid.into_iter();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers = unique_headers(header_line);

    lines
        .filter_map(|cells| {
            let mut row = RawRow::new();
            for (index, header) in headers.iter().enumerate() {
                if let Some(header) = header {
                    row.insert(header.clone(), cells.get(index).cloned().flatten());
                }
            }
            (!row.is_blank()).then_some(row)
        })
        .collect()
}

fn unique_headers(line: Vec<Option<String>>) -> Vec<Option<String>> {
    let mut seen: Vec<String> = Vec::new();
    line.into_iter()
        .map(|cell| {
            let name = cell.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())?;
            let mut candidate = name.clone();
            let mut suffix = 0;
            while seen.contains(&candidate) {
                suffix += 1;
                candidate = format!("{name}_{suffix}");
            }
            seen.push(candidate.clone());
            Some(candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cells: &[&str]) -> Vec<Option<String>> {
        cells
            .iter()
            .map(|c| (!c.is_empty()).then(|| c.to_string()))
            .collect()
    }

    #[test]
    fn first_line_becomes_headers() {
        let rows = rows_from_grid(vec![
            line(&["Nombre", "Email"]),
            line(&["Ana", "ana@x.com"]),
            line(&["Luis", ""]),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Nombre"), Some("Ana"));
        assert_eq!(rows[1].get("Email"), None);
        let keys: Vec<_> = rows[1].keys().collect();
        assert_eq!(keys, vec!["Nombre", "Email"]);
    }

    #[test]
    fn empty_headers_are_dropped_and_duplicates_suffixed() {
        let rows = rows_from_grid(vec![
            line(&["Nota", "", "Nota", "Nota"]),
            line(&["a", "b", "c", "d"]),
        ]);
        let keys: Vec<_> = rows[0].keys().collect();
        assert_eq!(keys, vec!["Nota", "Nota_1", "Nota_2"]);
        assert_eq!(rows[0].get("Nota_1"), Some("c"));
    }

    #[test]
    fn blank_and_short_lines() {
        let rows = rows_from_grid(vec![
            line(&["A", "B"]),
            line(&["", ""]),
            line(&["1"]),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("A"), Some("1"));
        assert_eq!(rows[0].get("B"), None);
    }

    #[test]
    fn numeric_cells_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(5551234.0)).as_deref(), Some("5551234"));
        assert_eq!(cell_text(&Data::Int(42)).as_deref(), Some("42"));
        assert_eq!(cell_text(&Data::Empty), None);
    }
}
