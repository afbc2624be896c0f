//! One harvest run: reports for every duration type, then documents for every
//! purchase found in them, strictly one download at a time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::HarvestConfig;
use crate::portal::{DriverError, PlanPortal, PortalDriver};
use crate::workflows::documents::DocumentBatchFetcher;
use crate::workflows::downloads::{DownloadWatcher, ExtensionFilter, WatchError};
use crate::workflows::plan::{DurationType, PurchaseId};
use crate::workflows::report::{FinalizeError, FinalizedReport, ReportFinalizer, ReportNaming};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub plan_year: i32,
    pub reports: usize,
    pub purchases: usize,
    pub documents_saved: usize,
    pub documents_failed: usize,
    /// False when a session-level failure ended the run early.
    pub completed: bool,
}

#[derive(Debug, thiserror::Error)]
enum ReportHarvestError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}

/// The temporary directory the browser downloads into. It is shared by every
/// download of a run and only removed by [`DownloadArea::finish`].
#[derive(Debug)]
pub struct DownloadArea {
    path: PathBuf,
}

impl DownloadArea {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(self) {
        match fs::read_dir(&self.path) {
            Ok(entries) => {
                let leftovers = entries.filter_map(Result::ok).count();
                if leftovers > 0 {
                    warn!(
                        directory = %self.path.display(),
                        leftovers,
                        "discarding files left in the download directory"
                    );
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => return,
            Err(err) => warn!(
                directory = %self.path.display(),
                %err,
                "unable to inspect download directory"
            ),
        }

        if let Err(err) = fs::remove_dir_all(&self.path) {
            warn!(directory = %self.path.display(), %err, "unable to remove download directory");
        }
    }
}

/// Creates the download directory and every filing folder.
pub fn prepare_storage(config: &HarvestConfig) -> io::Result<DownloadArea> {
    let storage = &config.storage;
    for duration in DurationType::ALL {
        fs::create_dir_all(storage.report_dir(duration))?;
    }
    fs::create_dir_all(storage.documents_dir())?;

    let path = storage.temp_dir();
    fs::create_dir_all(&path)?;
    Ok(DownloadArea { path })
}

/// Runs the session, then closes the browser, then clears the download area.
///
/// Failures of a single report or document are logged and skipped; anything
/// else ends the session and is logged once here.
pub fn run_harvest<D: PortalDriver + ?Sized>(
    driver: &D,
    config: &HarvestConfig,
    area: DownloadArea,
    plan_year: i32,
) -> RunSummary {
    let mut summary = RunSummary {
        plan_year,
        ..RunSummary::default()
    };

    match harvest_session(driver, config, area.path(), &mut summary) {
        Ok(()) => summary.completed = true,
        Err(err) => error!(%err, "unexpected failure, run aborted"),
    }

    if let Err(err) = driver.close() {
        warn!(%err, "unable to close browser session");
    }
    area.finish();

    info!(
        plan_year,
        reports = summary.reports,
        purchases = summary.purchases,
        documents_saved = summary.documents_saved,
        documents_failed = summary.documents_failed,
        completed = summary.completed,
        "harvest run finished"
    );
    summary
}

fn harvest_session<D: PortalDriver + ?Sized>(
    driver: &D,
    config: &HarvestConfig,
    download_dir: &Path,
    summary: &mut RunSummary,
) -> Result<(), DriverError> {
    let portal = PlanPortal::new(driver, config.timing.element_timeout);
    portal.sign_in(&config.portal)?;
    portal.open_plan_execution_report(summary.plan_year)?;

    let report_watcher = DownloadWatcher::new(
        config.timing.poll_interval,
        ExtensionFilter::only(&config.storage.report_extension),
    );
    let finalizer = ReportFinalizer::new(&config.storage.mapping_path);
    let naming = ReportNaming::default();

    let mut purchases: Vec<PurchaseId> = Vec::new();
    for duration in DurationType::ALL {
        let attempt = harvest_report(
            &portal,
            &report_watcher,
            &finalizer,
            &naming,
            config,
            download_dir,
            duration,
        );
        match attempt {
            Ok(report) => {
                summary.reports += 1;
                purchases.extend(report.purchases);
            }
            Err(err) => warn!(
                year = summary.plan_year,
                duration_type = %duration,
                %err,
                "unable to download plan execution report"
            ),
        }
    }
    summary.purchases = purchases.len();

    let fetcher = DocumentBatchFetcher::new(
        DownloadWatcher::new(config.timing.poll_interval, ExtensionFilter::Any),
        download_dir,
        config.timing.document_timeout,
    );
    let documents_dir = config.storage.documents_dir();
    for purchase in &purchases {
        portal.open_purchase(purchase)?;
        let links = portal.document_links()?;
        let result = fetcher.fetch_documents(driver, purchase, &links, &documents_dir);
        summary.documents_saved += result.saved.len();
        summary.documents_failed += result.failures.len();
    }

    Ok(())
}

fn harvest_report<D: PortalDriver + ?Sized>(
    portal: &PlanPortal<'_, D>,
    watcher: &DownloadWatcher,
    finalizer: &ReportFinalizer,
    naming: &ReportNaming,
    config: &HarvestConfig,
    download_dir: &Path,
    duration: DurationType,
) -> Result<FinalizedReport, ReportHarvestError> {
    let baseline = watcher.snapshot(download_dir)?;
    portal.request_report(duration)?;
    portal.await_report_ready(config.timing.report_timeout)?;

    let event = watcher.await_new_file(download_dir, &baseline, config.timing.report_timeout)?;
    let report = finalizer.finalize_report(
        &event.path,
        &config.storage.report_dir(duration),
        naming,
    )?;
    Ok(report)
}
