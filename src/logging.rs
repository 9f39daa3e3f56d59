//! Logging setup
//!
//! Two sinks share one `tracing` registry:
//! - the console, filtered by the `-v`/`-q` flags
//! - an append-only log file with one `[timestamp] [LEVEL] message` line per
//!   event
//!
//! The file knows three levels. Events logged with `success = true` render as
//! `SUCCESS`, warnings and errors as `ERROR`, everything else as `INFO`.

use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Console filter for the given verbosity
pub fn console_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    match verbose {
        0 => EnvFilter::new("offre_scraper=info,warn"),
        1 => EnvFilter::new("offre_scraper=debug,info"),
        2 => EnvFilter::new("offre_scraper=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Installs the console layer and, when `log_path` is given, the file layer
pub fn setup_logging(verbose: u8, quiet: bool, log_path: Option<&Path>) -> io::Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(console_filter(verbose, quiet));

    let file = log_path.map(file_layer).transpose()?;

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    Ok(())
}

/// Builds the log file layer, creating parent directories as needed
pub fn file_layer<S>(path: &Path) -> io::Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(LogLineFormat)
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::new("offre_scraper=info")))
}

/// Label written to the log file for an event
pub fn level_label(level: &Level, success: bool) -> &'static str {
    if success {
        "SUCCESS"
    } else if *level <= Level::WARN {
        "ERROR"
    } else {
        "INFO"
    }
}

/// `[timestamp] [LEVEL] message` event format
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        writeln!(
            writer,
            "[{}] [{}] {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level_label(event.metadata().level(), visitor.success),
            visitor.message
        )
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    success: bool,
}

impl Visit for LineVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "success" {
            self.success = value;
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}
