use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::plan::DurationType;

const TEMP_DIR_NAME: &str = "testnewtender_temp";
const DOCUMENTS_DIR_NAME: &str = "ИСЭЗ";

/// Top-level configuration for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub portal: PortalConfig,
    pub browser: BrowserConfig,
    pub storage: StorageConfig,
    pub timing: TimingConfig,
    pub telemetry: TelemetryConfig,
}

impl HarvestConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let portal = PortalConfig {
            host: required("HOST")?,
            login: required("LOGIN")?,
            password: required("PASSWORD")?,
        };

        let browser = BrowserConfig {
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            headless: env::var("HARVEST_HEADLESS")
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        };

        let root = match env::var("HARVEST_ROOT") {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
            _ => default_root()?,
        };
        let storage = StorageConfig {
            root,
            mapping_path: env::var("HARVEST_MAPPING")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./mapping.xlsx")),
            report_extension: env::var("HARVEST_EXTENSION")
                .unwrap_or_else(|_| "xls".to_string()),
        };

        let timing = TimingConfig {
            poll_interval: Duration::from_millis(parse_number("HARVEST_POLL_INTERVAL_MS", 1000)?),
            report_timeout: Duration::from_secs(parse_number("HARVEST_REPORT_TIMEOUT_SECS", 60)?),
            document_timeout: Duration::from_secs(parse_number(
                "HARVEST_DOCUMENT_TIMEOUT_SECS",
                60,
            )?),
            element_timeout: Duration::from_secs(parse_number(
                "HARVEST_ELEMENT_TIMEOUT_SECS",
                10,
            )?),
        };

        let telemetry = TelemetryConfig {
            log_level: env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: env::var("HARVEST_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("log.info")),
        };

        Ok(Self {
            portal,
            browser,
            storage,
            timing,
            telemetry,
        })
    }
}

/// Portal address and credentials.
#[derive(Clone)]
pub struct PortalConfig {
    pub host: String,
    pub login: String,
    pub password: String,
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("host", &self.host)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
}

/// Where downloads land and where results are filed.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub mapping_path: PathBuf,
    pub report_extension: String,
}

impl StorageConfig {
    /// Directory the browser downloads into; removed at the end of a run.
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR_NAME)
    }

    pub fn report_dir(&self, duration: DurationType) -> PathBuf {
        self.root.join(duration.folder_name())
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join(DOCUMENTS_DIR_NAME)
    }
}

#[derive(Debug, Clone)]
pub struct TimingConfig {
    pub poll_interval: Duration,
    pub report_timeout: Duration,
    pub document_timeout: Duration,
    pub element_timeout: Duration,
}

/// Log filter and destination.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("HARVEST_ROOT is not set and no desktop or home directory could be determined")]
    NoStorageRoot,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_number(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_root() -> Result<PathBuf, ConfigError> {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .ok_or(ConfigError::NoStorageRoot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    const VARS: &[&str] = &[
        "HOST",
        "LOGIN",
        "PASSWORD",
        "WEBDRIVER_URL",
        "HARVEST_HEADLESS",
        "HARVEST_ROOT",
        "HARVEST_MAPPING",
        "HARVEST_EXTENSION",
        "HARVEST_POLL_INTERVAL_MS",
        "HARVEST_REPORT_TIMEOUT_SECS",
        "HARVEST_DOCUMENT_TIMEOUT_SECS",
        "HARVEST_ELEMENT_TIMEOUT_SECS",
        "APP_LOG_LEVEL",
        "HARVEST_LOG_FILE",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in VARS {
            env::remove_var(name);
        }
    }

    fn set_credentials() {
        env::set_var("HOST", "https://portal.example");
        env::set_var("LOGIN", "buyer");
        env::set_var("PASSWORD", "secret");
    }

    #[test]
    fn load_uses_defaults_when_optional_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_credentials();
        env::set_var("HARVEST_ROOT", "/srv/harvest");

        let config = HarvestConfig::load().expect("config loads with defaults");
        assert_eq!(config.portal.host, "https://portal.example");
        assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
        assert!(!config.browser.headless);
        assert_eq!(config.storage.mapping_path, PathBuf::from("./mapping.xlsx"));
        assert_eq!(config.storage.report_extension, "xls");
        assert_eq!(config.timing.poll_interval, Duration::from_secs(1));
        assert_eq!(config.timing.report_timeout, Duration::from_secs(60));
        assert_eq!(config.timing.element_timeout, Duration::from_secs(10));
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_file, PathBuf::from("log.info"));
        assert_eq!(
            config.storage.report_dir(DurationType::Annual),
            PathBuf::from("/srv/harvest/ГПЗ")
        );
        assert_eq!(
            config.storage.temp_dir(),
            PathBuf::from("/srv/harvest/testnewtender_temp")
        );
    }

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("HOST", "https://portal.example");

        let error = HarvestConfig::load().expect_err("login missing");
        assert!(matches!(error, ConfigError::Missing("LOGIN")));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_credentials();
        env::set_var("HARVEST_ROOT", "/srv/harvest");
        env::set_var("HARVEST_POLL_INTERVAL_MS", "soon");

        let error = HarvestConfig::load().expect_err("invalid interval");
        assert_eq!(
            error.to_string(),
            "HARVEST_POLL_INTERVAL_MS must be a non-negative integer, got 'soon'"
        );
    }

    #[test]
    fn debug_output_redacts_password() {
        let portal = PortalConfig {
            host: "https://portal.example".to_string(),
            login: "buyer".to_string(),
            password: "secret".to_string(),
        };
        let rendered = format!("{portal:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
