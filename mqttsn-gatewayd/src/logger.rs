use colored::*;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use time::{format_description::FormatItem, OffsetDateTime};

/// Console logger for the gateway daemon, in the same spirit as the donor
/// broker's `BrokerLogger`: one colorized line per record with a UTC
/// timestamp. Unlike the donor it never writes to `logs/*.log` — this
/// binary is meant to run under a supervisor that captures stdout, and the
/// Non-goals exclude the donor's file-log rotation story.
pub struct GatewayLogger;

const TIMESTAMP_FORMAT_UTC: &[FormatItem] = time::macros::format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

impl log::Log for GatewayLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = OffsetDateTime::now_utc()
            .format(TIMESTAMP_FORMAT_UTC)
            .expect("the system clock does not support UTC formatting");

        let level = match record.level() {
            Level::Error => format!("{:<5}", record.level()).red().to_string(),
            Level::Warn => format!("{:<5}", record.level()).yellow().to_string(),
            Level::Info => format!("{:<5}", record.level()).cyan().to_string(),
            Level::Debug => format!("{:<5}", record.level()).purple().to_string(),
            Level::Trace => format!("{:<5}", record.level()).normal().to_string(),
        };

        println!("{level} - {} - {timestamp}", record.args());
    }

    fn flush(&self) {}
}

impl GatewayLogger {
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_max_level(level);
        log::set_boxed_logger(Box::new(GatewayLogger))
    }
}
