#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use procure_harvest::config::{
    BrowserConfig, HarvestConfig, PortalConfig, StorageConfig, TelemetryConfig, TimingConfig,
};
use procure_harvest::portal::{DriverError, ElementHandle, Locator, PortalDriver, WaitCondition};
use rust_xlsxwriter::Workbook;

pub const MAPPING_CSV: &str = "Статус закупки,Статус договора,Для отчета КЦ КМГ\n\
Active,Signed,Done\n\
Active,Draft,In progress\n\
Active,Signed,Archived\n";

pub const RAW_REPORT_CSV: &str = "Отчет по исполнению плана закупок,,,,\n\
Номер строки плана закупок,Номер закупки,Статус закупки,Статус договора,Сумма\n\
10.,P10,Active,Draft,300\n\
2.,P2,Active,Signed,200\n\
1.,-,Cancelled,,100\n";

pub const MAPPING_ROWS: &[&[&str]] = &[
    &["Статус закупки", "Статус договора", "Для отчета КЦ КМГ"],
    &["Active", "Signed", "Done"],
    &["Active", "Draft", "In progress"],
    &["Active", "Signed", "Archived"],
];

/// Same content as [`RAW_REPORT_CSV`], with the amounts stored as numbers.
pub const RAW_REPORT_ROWS: &[&[&str]] = &[
    &["Отчет по исполнению плана закупок"],
    &[
        "Номер строки плана закупок",
        "Номер закупки",
        "Статус закупки",
        "Статус договора",
        "Сумма",
    ],
    &["10.", "P10", "Active", "Draft", "300"],
    &["2.", "P2", "Active", "Signed", "200"],
    &["1.", "-", "Cancelled", "", "100"],
];

pub fn write_file(path: &Path, content: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, content).expect("write fixture");
}

/// Office Open XML workbook with one sheet; all-digit cells become numbers.
pub fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (row, cells) in rows.iter().enumerate() {
        for (column, value) in cells.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let (row, column) = (row as u32, column as u16);
            if value.chars().all(|ch| ch.is_ascii_digit()) {
                let number: f64 = value.parse().expect("digits");
                sheet.write_number(row, column, number).expect("write number");
            } else {
                sheet.write_string(row, column, *value).expect("write string");
            }
        }
    }
    workbook.save_to_buffer().expect("serialize workbook")
}

pub fn test_config(root: &Path) -> HarvestConfig {
    HarvestConfig {
        portal: PortalConfig {
            host: "https://portal.example".to_string(),
            login: "buyer".to_string(),
            password: "secret".to_string(),
        },
        browser: BrowserConfig {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
        },
        storage: StorageConfig {
            root: root.to_path_buf(),
            mapping_path: root.join("mapping.csv"),
            report_extension: "csv".to_string(),
        },
        timing: TimingConfig {
            poll_interval: Duration::from_millis(10),
            report_timeout: Duration::from_millis(150),
            document_timeout: Duration::from_millis(150),
            element_timeout: Duration::from_millis(50),
        },
        telemetry: TelemetryConfig {
            log_level: "debug".to_string(),
            log_file: root.join("log.info"),
        },
    }
}

#[derive(Debug, Clone)]
pub struct FakeDocument {
    pub label: String,
    /// Name the browser saves the file under; `None` simulates a download that never lands.
    pub download_name: Option<String>,
}

impl FakeDocument {
    pub fn saved_as(label: &str, download_name: &str) -> Self {
        Self {
            label: label.to_string(),
            download_name: Some(download_name.to_string()),
        }
    }

    pub fn never_arrives(label: &str) -> Self {
        Self {
            label: label.to_string(),
            download_name: None,
        }
    }
}

/// Browser stand-in: clicks on download controls write files into the download directory.
#[derive(Debug)]
pub struct FakePortal {
    download_dir: PathBuf,
    report: Vec<u8>,
    report_extension: String,
    documents: Vec<FakeDocument>,
    /// Duration labels whose report never downloads.
    silent_reports: Vec<String>,
    /// Any locator containing this fragment times out.
    broken_locator: Option<String>,
    selected_duration: Mutex<Option<String>>,
    reports_served: Mutex<usize>,
    pub clicks: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub navigations: Mutex<Vec<String>>,
    pub closed: Mutex<bool>,
}

impl FakePortal {
    pub fn new(download_dir: &Path, report_csv: &str, documents: Vec<FakeDocument>) -> Self {
        Self {
            download_dir: download_dir.to_path_buf(),
            report: report_csv.as_bytes().to_vec(),
            report_extension: "csv".to_string(),
            documents,
            silent_reports: Vec::new(),
            broken_locator: None,
            selected_duration: Mutex::new(None),
            reports_served: Mutex::new(0),
            clicks: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    /// Serves `report` as `plan_report_N.{extension}` instead of the CSV.
    pub fn with_report_file(mut self, report: Vec<u8>, extension: &str) -> Self {
        self.report = report;
        self.report_extension = extension.to_string();
        self
    }

    pub fn with_silent_report(mut self, duration_label: &str) -> Self {
        self.silent_reports.push(duration_label.to_string());
        self
    }

    pub fn with_broken_locator(mut self, fragment: &str) -> Self {
        self.broken_locator = Some(fragment.to_string());
        self
    }

    pub fn was_closed(&self) -> bool {
        *self.closed.lock().expect("closed mutex")
    }

    fn document_index(element: &ElementHandle) -> Option<usize> {
        element.0.strip_prefix("doc:").and_then(|raw| raw.parse().ok())
    }

    fn serve_report(&self) {
        let duration = self
            .selected_duration
            .lock()
            .expect("duration mutex")
            .clone()
            .unwrap_or_default();
        if self.silent_reports.iter().any(|label| *label == duration) {
            return;
        }

        let mut served = self.reports_served.lock().expect("served mutex");
        *served += 1;
        let path = self
            .download_dir
            .join(format!("plan_report_{}.{}", *served, self.report_extension));
        fs::write(path, &self.report).expect("write fake report");
    }
}

impl PortalDriver for FakePortal {
    fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.navigations
            .lock()
            .expect("navigation mutex")
            .push(url.to_string());
        Ok(())
    }

    fn wait_for(
        &self,
        locator: &Locator,
        _condition: WaitCondition,
        timeout: Duration,
    ) -> Result<ElementHandle, DriverError> {
        if let Some(fragment) = &self.broken_locator {
            if locator.expression().contains(fragment.as_str()) {
                return Err(DriverError::Timeout {
                    locator: locator.to_string(),
                    waited: timeout,
                });
            }
        }
        Ok(ElementHandle(locator.expression().to_string()))
    }

    fn find_all(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        if locator.expression().contains("sk-file-link") {
            Ok((0..self.documents.len())
                .map(|index| ElementHandle(format!("doc:{index}")))
                .collect())
        } else {
            Ok(Vec::new())
        }
    }

    fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.clicks
            .lock()
            .expect("click mutex")
            .push(element.0.clone());

        if element.0.contains("durationType") {
            let label = ["Годовой", "Долгосрочный"]
                .into_iter()
                .find(|label| element.0.contains(&format!(" {label} ")));
            *self.selected_duration.lock().expect("duration mutex") = label.map(str::to_string);
        } else if element.0.contains("planExecutionReport.download") {
            self.serve_report();
        } else if let Some(index) = Self::document_index(element) {
            let document = self
                .documents
                .get(index)
                .ok_or_else(|| DriverError::Protocol(format!("unknown document {index}")))?;
            if let Some(name) = &document.download_name {
                fs::write(self.download_dir.join(name), &document.label)
                    .expect("write fake document");
            }
        }
        Ok(())
    }

    fn force_click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.clicks
            .lock()
            .expect("click mutex")
            .push(format!("script:{}", element.0));
        Ok(())
    }

    fn clear(&self, _element: &ElementHandle) -> Result<(), DriverError> {
        Ok(())
    }

    fn type_text(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.typed
            .lock()
            .expect("typed mutex")
            .push((element.0.clone(), text.to_string()));
        Ok(())
    }

    fn read_text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        Self::document_index(element)
            .and_then(|index| self.documents.get(index))
            .map(|document| format!(" {} ", document.label))
            .ok_or_else(|| DriverError::Protocol(format!("no text for {}", element.0)))
    }

    fn dismiss_alert(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    fn close(&self) -> Result<(), DriverError> {
        *self.closed.lock().expect("closed mutex") = true;
        Ok(())
    }
}
