use super::mapping::{MappingEntry, MappingTable, SUMMARY_LABEL_COLUMN};
use super::normalizer::clean_cell;
use super::{
    ReconcileError, ReportRow, ReportTable, CONTRACT_STATUS_COLUMN, PLAN_LINE_COLUMN,
    PURCHASE_STATUS_COLUMN,
};
use std::io::{Read, Write};

/// Sheet content as trimmed text cells, one `Vec` per row.
pub(crate) type SheetRows = Vec<Vec<String>>;

pub(crate) fn csv_rows<R: Read>(reader: R) -> Result<SheetRows, ReconcileError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(clean_cell).collect());
    }
    Ok(rows)
}

/// Builds a report from sheet rows. The portal puts a decorative title row
/// above the header; it is skipped when present, i.e. when the first row does
/// not carry the plan line column but the second one does.
pub(crate) fn report_from_rows(rows: SheetRows) -> Result<ReportTable, ReconcileError> {
    let mut rows = rows.into_iter();
    let first = rows.next().ok_or(ReconcileError::EmptyReport)?;

    let headers = if is_header(&first) {
        first
    } else {
        rows.next().ok_or(ReconcileError::EmptyReport)?
    };

    let mut body = Vec::new();
    for mut cells in rows {
        if cells.iter().all(String::is_empty) {
            continue;
        }
        if cells.len() < headers.len() {
            cells.resize(headers.len(), String::new());
        }
        body.push(ReportRow { cells });
    }

    Ok(ReportTable {
        headers,
        rows: body,
    })
}

pub(crate) fn write_csv<W: Write>(writer: W, table: &ReportTable) -> Result<(), ReconcileError> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer.write_record(&table.headers)?;
    for row in &table.rows {
        csv_writer.write_record(&row.cells)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Mapping columns are located by header name; their order in the file is free.
pub(crate) fn mapping_from_rows(rows: SheetRows) -> Result<MappingTable, ReconcileError> {
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or(ReconcileError::EmptyMapping)?;
    let column = |name: &'static str| {
        header
            .iter()
            .position(|cell| cell == name)
            .ok_or(ReconcileError::MissingColumn(name))
    };
    let purchase_status = column(PURCHASE_STATUS_COLUMN)?;
    let contract_status = column(CONTRACT_STATUS_COLUMN)?;
    let summary_label = column(SUMMARY_LABEL_COLUMN)?;

    let entries = rows
        .filter(|row| row.iter().any(|value| !value.is_empty()))
        .map(|row| {
            MappingEntry::new(
                cell(&row, purchase_status),
                cell(&row, contract_status),
                cell(&row, summary_label),
            )
        })
        .collect();

    Ok(MappingTable::new(entries))
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn is_header(cells: &[String]) -> bool {
    cells.iter().any(|cell| cell == PLAN_LINE_COLUMN)
}
