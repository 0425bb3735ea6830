use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::path::Path;

use log4rs::encode::pattern::PatternEncoder;
use log4rs::encode::writer::simple::SimpleWriter;
use log4rs::encode::Encode;

use crate::counting_writer::{CountingWriter, SharedSink};

/// Date and time as written at the start of every line: `2024/01/23 01:23:23`.
const TIMESTAMP: &str = "{d(%Y/%m/%d %H:%M:%S)}";

/// Severity of a log line, written as the line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Stat,
    Info,
    Warn,
    Err,
    Crit,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Stat,
        Level::Info,
        Level::Warn,
        Level::Err,
        Level::Crit,
        Level::Fatal,
    ];

    /// Line prefix, `STAT` through `FATAL`.
    pub fn prefix(self) -> &'static str {
        match self {
            Level::Stat => "STAT",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Err => "ERR",
            Level::Crit => "CRIT",
            Level::Fatal => "FATAL",
        }
    }

    /// Closest `log` crate level, carried on the encoded record.
    fn log_level(self) -> log::Level {
        match self {
            Level::Stat | Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Err | Level::Crit | Level::Fatal => log::Level::Error,
        }
    }

    /// Stats lines carry no source location; every other level does, as
    /// `file.rs:line` with the directory stripped.
    fn pattern(self) -> String {
        match self {
            Level::Stat => format!("{}: {} {{m}}{{n}}", self.prefix(), TIMESTAMP),
            _ => format!("{}: {} {{f}}:{{L}} {{m}}{{n}}", self.prefix(), TIMESTAMP),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Writes timestamped, level-prefixed lines through a [`CountingWriter`].
///
/// Each line is encoded in memory first and then written to the sink in a
/// single locked write, so loggers sharing a sink never split each other's
/// lines.
pub struct LevelLogger<W> {
    level: Level,
    encoder: PatternEncoder,
    writer: CountingWriter<W>,
}

impl<W: Write> LevelLogger<W> {
    /// Logger for `level` writing into `sink`, which may be shared with
    /// loggers of other levels.
    pub fn new(level: Level, sink: SharedSink<W>) -> Self {
        Self {
            level,
            encoder: PatternEncoder::new(&level.pattern()),
            writer: CountingWriter::new(sink),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Writes one line, attributing it to the caller's source location.
    #[track_caller]
    pub fn log(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.log_at(Location::caller(), args)
    }

    /// Writes one line attributed to `location`.
    pub fn log_at(&self, location: &Location<'_>, args: fmt::Arguments<'_>) -> io::Result<()> {
        let record = log::Record::builder()
            .args(args)
            .level(self.level.log_level())
            .target(self.level.prefix())
            .file(Some(base_name(location.file())))
            .line(Some(location.line()))
            .build();

        let mut line = SimpleWriter(Vec::with_capacity(128));
        self.encoder
            .encode(&mut line, &record)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        self.writer.write_all(&line.0)
    }

    /// Bytes written since the last call, resetting the tally.
    pub fn bytes_written(&self) -> usize {
        self.writer.count()
    }

    pub fn writer(&self) -> &CountingWriter<W> {
        &self.writer
    }
}

/// Last path component of a source file, `src/registry.rs` -> `registry.rs`.
fn base_name(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}
