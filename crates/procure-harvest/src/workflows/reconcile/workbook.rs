use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use super::normalizer::clean_cell;
use super::parser::SheetRows;
use super::{io_error, ReconcileError, ReportTable};

/// Rows of the first worksheet. The container is recognised from the content,
/// so an `.xls` name holding an Office Open XML workbook reads fine.
pub(crate) fn read_first_sheet(path: &Path) -> Result<SheetRows, ReconcileError> {
    let bytes = fs::read(path).map_err(|source| io_error(path, source))?;
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ReconcileError::EmptyReport)??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Writes the table as a single-sheet Office Open XML workbook. Cells that
/// were read as numbers are written back as numbers.
pub(crate) fn write_workbook(path: &Path, table: &ReportTable) -> Result<(), ReconcileError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    write_row(sheet, 0, &table.headers)?;
    for (index, row) in table.rows.iter().enumerate() {
        write_row(sheet, index + 1, &row.cells)?;
    }
    workbook.save(path)?;
    Ok(())
}

fn write_row(sheet: &mut Worksheet, row: usize, cells: &[String]) -> Result<(), XlsxError> {
    // Out-of-range positions are rejected by the writer itself.
    let row = u32::try_from(row).unwrap_or(u32::MAX);
    for (column, value) in cells.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        let column = u16::try_from(column).unwrap_or(u16::MAX);
        match numeric_cell(value) {
            Some(number) => sheet.write_number(row, column, number)?,
            None => sheet.write_string(row, column, value)?,
        };
    }
    Ok(())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => clean_cell(value),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        other => clean_cell(&other.to_string()),
    }
}

/// A number only when its text is exactly how the reader renders that number,
/// so `"1."` or `"007"` stay text.
fn numeric_cell(value: &str) -> Option<f64> {
    let number = value.parse::<f64>().ok()?;
    (number.is_finite() && number.to_string() == value).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::reconcile::ReportRow;

    #[test]
    fn numbers_round_trip_only_in_canonical_form() {
        assert_eq!(numeric_cell("300"), Some(300.0));
        assert_eq!(numeric_cell("12.5"), Some(12.5));
        assert_eq!(numeric_cell("1."), None);
        assert_eq!(numeric_cell("007"), None);
        assert_eq!(numeric_cell("P10"), None);
        assert_eq!(numeric_cell("inf"), None);
    }

    #[test]
    fn float_cells_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(300.0)), "300");
        assert_eq!(cell_text(&Data::Float(0.25)), "0.25");
        assert_eq!(cell_text(&Data::String(" Active ".to_string())), "Active");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn written_workbook_reads_back_cell_for_cell() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.xls");
        let table = ReportTable {
            headers: vec!["Номер строки плана закупок".to_string(), "Сумма".to_string()],
            rows: vec![
                ReportRow::new(["1.", "100"]),
                ReportRow::new(["2.", ""]),
            ],
        };

        write_workbook(&path, &table).expect("write workbook");
        let rows = read_first_sheet(&path).expect("read workbook");

        assert_eq!(
            rows,
            vec![
                vec!["Номер строки плана закупок", "Сумма"],
                vec!["1.", "100"],
                vec!["2.", ""],
            ]
        );
    }

    #[test]
    fn unreadable_workbook_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.xls");
        fs::write(&path, "not a workbook").expect("write");

        let error = read_first_sheet(&path).expect_err("not a workbook");
        assert!(matches!(error, ReconcileError::Workbook(_)));
    }
}
