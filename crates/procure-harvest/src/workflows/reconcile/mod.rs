//! Status reconciliation of plan execution reports.
//!
//! Each report row is joined against the mapping table on
//! `(purchase status, contract status)` and receives a summary status column
//! placed right after the contract status.
//!
//! Reports and the mapping are spreadsheets as exported by the portal (`xls`,
//! `xlsx`, ...); files named `*.csv` are handled as CSV.

mod mapping;
mod normalizer;
mod parser;
mod workbook;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::workflows::plan::PurchaseId;

pub use mapping::{
    MappingEntry, MappingTable, LABEL_SEPARATOR, SUMMARY_LABEL_COLUMN, UNMAPPED_SUMMARY,
};

pub const PLAN_LINE_COLUMN: &str = "Номер строки плана закупок";
pub const PURCHASE_NUMBER_COLUMN: &str = "Номер закупки";
pub const PURCHASE_STATUS_COLUMN: &str = "Статус закупки";
pub const CONTRACT_STATUS_COLUMN: &str = "Статус договора";
pub const SUMMARY_COLUMN: &str = "Статус для свода";

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("report has no header row")]
    EmptyReport,
    #[error("mapping table has no header row")]
    EmptyMapping,
    #[error("report is missing the '{0}' column")]
    MissingColumn(&'static str),
    #[error("plan line '{value}' in data row {row} has no line number")]
    PlanLineWithoutNumber { row: usize, value: String },
}

/// One data row; cells line up with [`ReportTable::headers`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRow {
    pub cells: Vec<String>,
}

impl ReportRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// Positions of the columns the reconciliation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportColumns {
    pub plan_line: usize,
    pub purchase_number: usize,
    pub purchase_status: usize,
    pub contract_status: usize,
    pub summary: Option<usize>,
}

/// Storage format of a sheet file, chosen by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SheetFormat::Csv,
            _ => SheetFormat::Workbook,
        }
    }
}

impl ReportTable {
    pub fn from_path(path: &Path) -> Result<Self, ReconcileError> {
        parser::report_from_rows(read_rows(path)?)
    }

    /// Reads a CSV report.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReconcileError> {
        parser::report_from_rows(parser::csv_rows(reader)?)
    }

    /// Replaces the file content with header and rows; the decorative title row
    /// of the raw export is not written back.
    pub fn write_to_path(&self, path: &Path) -> Result<(), ReconcileError> {
        match SheetFormat::of(path) {
            SheetFormat::Csv => {
                let file = File::create(path).map_err(|source| io_error(path, source))?;
                self.write_to(BufWriter::new(file))
            }
            SheetFormat::Workbook => workbook::write_workbook(path, self),
        }
    }

    /// Writes the table as CSV.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), ReconcileError> {
        parser::write_csv(writer, self)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn columns(&self) -> Result<ReportColumns, ReconcileError> {
        let require = |name: &'static str| {
            self.column_index(name)
                .ok_or(ReconcileError::MissingColumn(name))
        };

        Ok(ReportColumns {
            plan_line: require(PLAN_LINE_COLUMN)?,
            purchase_number: require(PURCHASE_NUMBER_COLUMN)?,
            purchase_status: require(PURCHASE_STATUS_COLUMN)?,
            contract_status: require(CONTRACT_STATUS_COLUMN)?,
            summary: self.column_index(SUMMARY_COLUMN),
        })
    }

    /// Stable sort on the number embedded in the plan line cell. A row without
    /// a digit run leaves the table untouched and is reported.
    pub fn sort_by_plan_line(&mut self) -> Result<(), ReconcileError> {
        let column = self
            .column_index(PLAN_LINE_COLUMN)
            .ok_or(ReconcileError::MissingColumn(PLAN_LINE_COLUMN))?;

        let mut keyed = Vec::with_capacity(self.rows.len());
        for (position, row) in self.rows.iter().enumerate() {
            let value = row.cell(column);
            let number = normalizer::plan_line_number(value).ok_or_else(|| {
                ReconcileError::PlanLineWithoutNumber {
                    row: position + 1,
                    value: value.to_string(),
                }
            })?;
            keyed.push(number);
        }

        let mut rows: Vec<(u64, ReportRow)> =
            keyed.into_iter().zip(self.rows.drain(..)).collect();
        rows.sort_by_key(|(number, _)| *number);
        self.rows = rows.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }
}

/// Annotated table plus the purchases that need their documents fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedReport {
    pub table: ReportTable,
    /// Row order, duplicates kept.
    pub purchases: Vec<PurchaseId>,
}

/// Adds (or recomputes) the summary column of every row.
///
/// Row order is preserved and every row receives a non-empty summary. The only
/// failure is a report lacking one of the required columns.
pub fn annotate(
    table: ReportTable,
    mapping: &MappingTable,
) -> Result<AnnotatedReport, ReconcileError> {
    let columns = table.columns()?;
    let ReportTable {
        mut headers,
        mut rows,
    } = table;

    let summary = match columns.summary {
        Some(index) => index,
        None => {
            let index = columns.contract_status + 1;
            headers.insert(index, SUMMARY_COLUMN.to_string());
            for row in &mut rows {
                if row.cells.len() < index {
                    row.cells.resize(index, String::new());
                }
                row.cells.insert(index, String::new());
            }
            index
        }
    };
    // Indices right of an inserted summary column shift by one.
    let shifted = |index: usize| {
        if columns.summary.is_none() && index >= summary {
            index + 1
        } else {
            index
        }
    };
    let purchase_number = shifted(columns.purchase_number);
    let purchase_status = shifted(columns.purchase_status);
    let contract_status = shifted(columns.contract_status);

    let mut purchases = Vec::new();
    for row in &mut rows {
        if row.cells.len() <= summary {
            row.cells.resize(summary + 1, String::new());
        }
        let status = mapping.summary_for(row.cell(purchase_status), row.cell(contract_status));
        row.cells[summary] = status;

        if let Some(purchase) = PurchaseId::from_cell(row.cell(purchase_number)) {
            purchases.push(purchase);
        }
    }

    Ok(AnnotatedReport {
        table: ReportTable { headers, rows },
        purchases,
    })
}

pub fn load_mapping(path: &Path) -> Result<MappingTable, ReconcileError> {
    parser::mapping_from_rows(read_rows(path)?)
}

/// Reads a CSV mapping.
pub fn mapping_from_reader<R: Read>(reader: R) -> Result<MappingTable, ReconcileError> {
    parser::mapping_from_rows(parser::csv_rows(reader)?)
}

/// Sorts, annotates and rewrites the report stored at `report_path`.
pub fn reconcile_in_place(
    report_path: &Path,
    mapping: &MappingTable,
) -> Result<AnnotatedReport, ReconcileError> {
    let mut table = ReportTable::from_path(report_path)?;
    table.sort_by_plan_line()?;
    let annotated = annotate(table, mapping)?;
    annotated.table.write_to_path(report_path)?;
    Ok(annotated)
}

fn read_rows(path: &Path) -> Result<parser::SheetRows, ReconcileError> {
    match SheetFormat::of(path) {
        SheetFormat::Csv => {
            let file = File::open(path).map_err(|source| io_error(path, source))?;
            parser::csv_rows(BufReader::new(file))
        }
        SheetFormat::Workbook => workbook::read_first_sheet(path),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReconcileError {
    ReconcileError::Io {
        path: path.to_path_buf(),
        source,
    }
}
