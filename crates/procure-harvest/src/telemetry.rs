use crate::config::TelemetryConfig;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

const LOG_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("unable to open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("telemetry error: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Routes `tracing` events to the append-only run log, one
/// `{timestamp} - {message}` line per event.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            })?
        }
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|source| TelemetryError::LogFile {
            path: config.log_file.clone(),
            source,
        })?;

    run_log_subscriber(env_filter, Mutex::new(log_file)).try_init()?;
    Ok(())
}

/// Subscriber writing [`RunLogFormat`] lines to `writer`.
pub fn run_log_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_ansi(false)
        .event_format(RunLogFormat)
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

/// Event layout of the run log.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLogFormat;

impl<S, N> FormatEvent<S, N> for RunLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}", line_prefix(Local::now().naive_local()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn line_prefix(at: NaiveDateTime) -> String {
    format!("{} - ", at.format(LOG_TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn prefix_uses_day_first_timestamp() {
        let at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .expect("valid date")
            .and_hms_opt(13, 30, 5)
            .expect("valid time");
        assert_eq!(line_prefix(at), "19-10-2026 13:30:05 - ");
    }
}
