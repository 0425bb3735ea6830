//! The set of leveled loggers shared by the whole process.
//!
//! A [`TelemetryContext`] is built once at startup and handed to whoever
//! needs to log, usually behind an `Arc`. For code that cannot be threaded a
//! handle, [`install_global`] publishes one context process-wide.

use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::counting_writer::SharedSink;
use crate::error::{Error, ReportedError};
use crate::level_logger::{Level, LevelLogger};
use crate::sink::{open_append, MultiSink};
use crate::stat_sink::{BufferedStatSink, FlushFailure};

/// Marker preceding the caller's message.
const MSG: &str = "MSG:";
/// Marker preceding the upstream cause.
const GOT: &str = "- GOT:";
/// Marker preceding the extra values.
const VAL: &str = "- VAL:";

lazy_static! {
    static ref GLOBAL: RwLock<Option<Arc<TelemetryContext>>> = RwLock::new(None);
}

/// Publishes `ctx` as the process-wide context. Only the first call succeeds.
pub fn install_global(ctx: Arc<TelemetryContext>) -> Result<(), Error> {
    let mut global = GLOBAL.write();
    if global.is_some() {
        return Err(Error::AlreadyInstalled);
    }
    *global = Some(ctx);
    Ok(())
}

/// The process-wide context, if one was installed.
pub fn global() -> Option<Arc<TelemetryContext>> {
    GLOBAL.read().clone()
}

/// Bytes each logger wrote since the previous report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCounts {
    pub stat: usize,
    pub info: usize,
    pub warn: usize,
    pub err: usize,
    pub crit: usize,
    pub fatal: usize,
}

impl ByteCounts {
    /// Sum over all six loggers.
    pub fn total(&self) -> usize {
        self.stat + self.info + self.warn + self.err + self.crit + self.fatal
    }
}

/// The leveled loggers and the stats batch behind them.
///
/// Info, warn, err, crit and fatal share one multi-destination sink (the
/// general log file, plus the console when mirroring is on). Stats go to
/// their own file through a [`BufferedStatSink`] and reach disk only when
/// [`flush_stats`](TelemetryContext::flush_stats) is called.
///
/// # Thread Safety
///
/// All methods take `&self`. Each line is encoded off-lock and written under
/// one lock of its sink, so a context behind an `Arc` can be used from any
/// number of threads without lines interleaving.
pub struct TelemetryContext {
    stat_sink: SharedSink<BufferedStatSink>,
    stat: LevelLogger<BufferedStatSink>,
    info: LevelLogger<MultiSink>,
    warn: LevelLogger<MultiSink>,
    err: LevelLogger<MultiSink>,
    crit: LevelLogger<MultiSink>,
    fatal: LevelLogger<MultiSink>,
}

impl TelemetryContext {
    /// Builds the loggers over already opened sinks.
    pub fn new(log_sink: MultiSink, stat_sink: BufferedStatSink) -> Self {
        let log_sink = Arc::new(Mutex::new(log_sink));
        let stat_sink = Arc::new(Mutex::new(stat_sink));

        Self {
            stat: LevelLogger::new(Level::Stat, stat_sink.clone()),
            stat_sink,
            info: LevelLogger::new(Level::Info, log_sink.clone()),
            warn: LevelLogger::new(Level::Warn, log_sink.clone()),
            err: LevelLogger::new(Level::Err, log_sink.clone()),
            crit: LevelLogger::new(Level::Crit, log_sink.clone()),
            fatal: LevelLogger::new(Level::Fatal, log_sink),
        }
    }

    /// Creates the data directory and opens both log files for appending.
    pub fn open(config: &Config) -> Result<Self, Error> {
        let log_file = open_append(&config.log_path())?;
        let stats_file = open_append(&config.stats_path())?;

        let mut log_sink = MultiSink::new().with(log_file);
        if config.console_mirror {
            log_sink.push(io::stdout());
        }
        Ok(Self::new(log_sink, BufferedStatSink::new(stats_file)))
    }

    /// The logger for `level`, typed by the sink it writes to.
    pub fn logger(&self, level: Level) -> LoggerRef<'_> {
        match level {
            Level::Stat => LoggerRef::Stat(&self.stat),
            Level::Info => LoggerRef::Log(&self.info),
            Level::Warn => LoggerRef::Log(&self.warn),
            Level::Err => LoggerRef::Log(&self.err),
            Level::Crit => LoggerRef::Log(&self.crit),
            Level::Fatal => LoggerRef::Log(&self.fatal),
        }
    }

    /// Writes a line at `level`, attributed to the caller.
    #[track_caller]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) -> io::Result<()> {
        let location = Location::caller();
        match self.logger(level) {
            LoggerRef::Stat(l) => l.log_at(location, args),
            LoggerRef::Log(l) => l.log_at(location, args),
        }
    }

    /// Appends a stats line to the pending batch. Stats lines carry no
    /// source location and reach the file on the next flush.
    pub fn stat(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.stat.log(args)
    }

    /// Writes an INFO line attributed to the caller.
    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.info.log(args)
    }

    /// Writes a WARN line attributed to the caller.
    #[track_caller]
    pub fn warn(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.warn.log(args)
    }

    /// Writes an ERR line attributed to the caller.
    ///
    /// Prefer [`err`](TelemetryContext::err) or
    /// [`err_got`](TelemetryContext::err_got) when the caller also needs an
    /// error value to return.
    #[track_caller]
    pub fn error(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.err.log(args)
    }

    /// Writes a CRIT line attributed to the caller.
    #[track_caller]
    pub fn crit(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.crit.log(args)
    }

    /// Writes a FATAL line attributed to the caller. The process keeps
    /// running; exiting is up to the caller.
    #[track_caller]
    pub fn fatal(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.fatal.log(args)
    }

    /// Logs `message` with its upstream `cause` and `extra` values at ERR.
    ///
    /// The line reads `MSG: <message> - GOT: <cause> - VAL: [<extra...>]`.
    /// The returned error carries only `message`, so the cause and values
    /// stay in the log and never reach whoever displays the error.
    ///
    /// # Arguments
    ///
    /// * `cause` - the upstream error being handled
    /// * `message` - the caller-facing description
    /// * `extra` - values worth logging, written space separated
    ///
    /// A failure to write the line is reported as a `tracing` warning; the
    /// error value is returned either way.
    ///
    /// # Examples
    ///
    /// ```
    /// use stat_logger::{BufferedStatSink, MultiSink, TelemetryContext};
    ///
    /// let ctx = TelemetryContext::new(
    ///     MultiSink::new().with(std::io::sink()),
    ///     BufferedStatSink::new(std::io::sink()),
    /// );
    ///
    /// let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file: /secret/key");
    /// let err = ctx.err_got(&cause, "failed to load key", &[&"attempt", &3]);
    ///
    /// assert_eq!(err.to_string(), "failed to load key");
    /// assert!(ctx.byte_counts().err > 0);
    /// ```
    #[track_caller]
    pub fn err_got(
        &self,
        cause: &dyn fmt::Display,
        message: &str,
        extra: &[&dyn fmt::Display],
    ) -> ReportedError {
        self.report(
            Location::caller(),
            format_args!("{} {} {} {} {} [{}]", MSG, message, GOT, cause, VAL, Extras(extra)),
        );
        ReportedError::new(message)
    }

    /// Logs `message` and `extra` values at ERR, without an upstream cause.
    #[track_caller]
    pub fn err(&self, message: &str, extra: &[&dyn fmt::Display]) -> ReportedError {
        self.report(
            Location::caller(),
            format_args!("{} {} {} [{}]", MSG, message, VAL, Extras(extra)),
        );
        ReportedError::new(message)
    }

    fn report(&self, location: &Location<'_>, args: fmt::Arguments<'_>) {
        if let Err(e) = self.err.log_at(location, args) {
            tracing::warn!(error = %e, "failed to write error log line");
        }
    }

    /// Writes the pending stats batch to the stats file.
    pub fn flush_stats(&self) -> Result<usize, FlushFailure> {
        self.stat_sink.lock().flush()
    }

    /// Flushes the general log sink (file and console).
    pub fn flush_logs(&self) -> io::Result<()> {
        self.info.writer().sink().lock().flush()
    }

    /// Bytes of stats waiting for the next flush.
    pub fn pending_stats(&self) -> usize {
        self.stat_sink.lock().pending_len()
    }

    /// Reads and resets the byte tally of every logger.
    pub fn byte_counts(&self) -> ByteCounts {
        ByteCounts {
            stat: self.stat.bytes_written(),
            info: self.info.bytes_written(),
            warn: self.warn.bytes_written(),
            err: self.err.bytes_written(),
            crit: self.crit.bytes_written(),
            fatal: self.fatal.bytes_written(),
        }
    }
}

/// Borrowed logger of either sink type.
pub enum LoggerRef<'a> {
    Stat(&'a LevelLogger<BufferedStatSink>),
    Log(&'a LevelLogger<MultiSink>),
}

/// Space separated extra values.
struct Extras<'a>(&'a [&'a dyn fmt::Display]);

impl fmt::Display for Extras<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}
