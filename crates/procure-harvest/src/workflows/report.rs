use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::workflows::filing::{dotted_extension, relocate, unique_destination};
use crate::workflows::plan::PurchaseId;
use crate::workflows::reconcile::{self, ReconcileError};

pub const DEFAULT_REPORT_LABEL: &str = "Отчет по исполнению плана";
// No colons: the name has to be valid on Windows too.
const NAME_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H-%M-%S";

/// Builds report file names of the form `{label} от {dd-mm-YYYY HH-MM-SS}{ext}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportNaming {
    label: String,
}

impl ReportNaming {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn file_name(&self, at: NaiveDateTime, extension: &str) -> String {
        format!(
            "{} от {}{}",
            self.label,
            at.format(NAME_TIMESTAMP_FORMAT),
            extension
        )
    }
}

impl Default for ReportNaming {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedReport {
    pub path: PathBuf,
    pub purchases: Vec<PurchaseId>,
    pub rows: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Files a downloaded report and annotates it with summary statuses.
#[derive(Debug, Clone)]
pub struct ReportFinalizer {
    mapping_path: PathBuf,
}

impl ReportFinalizer {
    pub fn new(mapping_path: impl Into<PathBuf>) -> Self {
        Self {
            mapping_path: mapping_path.into(),
        }
    }

    pub fn finalize_report(
        &self,
        downloaded: &Path,
        destination_dir: &Path,
        naming: &ReportNaming,
    ) -> Result<FinalizedReport, FinalizeError> {
        self.finalize_report_at(downloaded, destination_dir, naming, Local::now().naive_local())
    }

    /// Same as [`Self::finalize_report`] with an explicit clock reading for the name.
    pub fn finalize_report_at(
        &self,
        downloaded: &Path,
        destination_dir: &Path,
        naming: &ReportNaming,
        at: NaiveDateTime,
    ) -> Result<FinalizedReport, FinalizeError> {
        let file_name = naming.file_name(at, &dotted_extension(downloaded));
        let target = unique_destination(destination_dir, &file_name);
        relocate(downloaded, &target).map_err(|source| FinalizeError::Relocate {
            from: downloaded.to_path_buf(),
            to: target.clone(),
            source,
        })?;

        // Loaded per report so edits to the mapping file apply without a restart.
        let mapping = reconcile::load_mapping(&self.mapping_path)?;
        let annotated = reconcile::reconcile_in_place(&target, &mapping)?;

        info!(
            report = %target.display(),
            rows = annotated.table.rows.len(),
            purchases = annotated.purchases.len(),
            "plan execution report reconciled"
        );

        Ok(FinalizedReport {
            rows: annotated.table.rows.len(),
            purchases: annotated.purchases,
            path: target,
        })
    }
}
