use chrono::Local;
use clap::Args;
use procure_harvest::config::HarvestConfig;
use procure_harvest::error::AppError;
use procure_harvest::portal::webdriver::SessionOptions;
use procure_harvest::portal::WebDriverSession;
use procure_harvest::run::{prepare_storage, run_harvest as execute_run};
use procure_harvest::telemetry;
use procure_harvest::workflows::downloads::{DownloadWatcher, ExtensionFilter};
use procure_harvest::workflows::plan::default_plan_year;
use procure_harvest::workflows::reconcile::{load_mapping, reconcile_in_place};
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Plan year to report on (defaults to the previous calendar year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
}

#[derive(Args, Debug)]
pub(crate) struct ReconcileArgs {
    /// Report workbook or CSV to annotate; it is rewritten in place
    #[arg(long)]
    pub(crate) report: PathBuf,
    /// Status mapping workbook or CSV (defaults to ./mapping.xlsx)
    #[arg(long)]
    pub(crate) mapping: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct WatchArgs {
    /// Directory to watch
    #[arg(long)]
    pub(crate) dir: PathBuf,
    /// Seconds to wait before giving up
    #[arg(long, default_value_t = 60)]
    pub(crate) timeout: u64,
    /// Only consider files with this extension
    #[arg(long)]
    pub(crate) extension: Option<String>,
    /// Milliseconds between directory listings
    #[arg(long, default_value_t = 1000)]
    pub(crate) interval: u64,
}

pub(crate) fn run_harvest(args: RunArgs) -> Result<(), AppError> {
    let config = HarvestConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let plan_year = args
        .year
        .unwrap_or_else(|| default_plan_year(Local::now().date_naive()));
    let area = prepare_storage(&config)?;

    let download_dir = match std::fs::canonicalize(area.path()) {
        Ok(path) => path,
        Err(err) => {
            area.finish();
            return Err(err.into());
        }
    };
    let options = SessionOptions {
        webdriver_url: config.browser.webdriver_url.clone(),
        download_dir,
        headless: config.browser.headless,
    };
    let session = match WebDriverSession::start(&options) {
        Ok(session) => session,
        Err(err) => {
            error!(%err, "unable to start browser session");
            area.finish();
            return Err(err.into());
        }
    };

    execute_run(&session, &config, area, plan_year);
    Ok(())
}

pub(crate) fn run_reconcile(args: ReconcileArgs) -> Result<(), AppError> {
    let ReconcileArgs { report, mapping } = args;
    let mapping_path = mapping.unwrap_or_else(|| PathBuf::from("./mapping.xlsx"));

    let mapping = load_mapping(&mapping_path)?;
    let annotated = reconcile_in_place(&report, &mapping)?;

    println!(
        "Reconciled {} rows in {}",
        annotated.table.rows.len(),
        report.display()
    );
    if annotated.purchases.is_empty() {
        println!("Purchases: none");
    } else {
        println!("Purchases");
        for purchase in &annotated.purchases {
            println!("- {purchase}");
        }
    }
    Ok(())
}

pub(crate) fn run_watch(args: WatchArgs) -> Result<(), AppError> {
    let WatchArgs {
        dir,
        timeout,
        extension,
        interval,
    } = args;

    let filter = extension
        .as_deref()
        .map(ExtensionFilter::only)
        .unwrap_or_default();
    let watcher = DownloadWatcher::new(Duration::from_millis(interval), filter);
    let baseline = watcher.snapshot(&dir)?;
    let event = watcher.await_new_file(&dir, &baseline, Duration::from_secs(timeout))?;

    println!("{}", event.path.display());
    Ok(())
}
