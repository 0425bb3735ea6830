use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised while configuring or starting the telemetry system.
#[derive(Debug)]
pub enum Error {
    /// A sample buffer was asked for zero slots.
    InvalidCapacity(usize),
    /// `window / interval` asks for more sample slots than allowed.
    CapacityTooLarge { requested: u128, max: usize },
    /// The sampling interval was zero.
    InvalidInterval,
    /// A log or stats file could not be created or opened.
    Io { path: PathBuf, source: io::Error },
    /// The sampler thread could not be spawned.
    Spawn(io::Error),
    /// A process-wide context was already installed.
    AlreadyInstalled,
    /// The sampler thread died before the loggers were handed over.
    SamplerExited,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(n) => write!(f, "sample buffer capacity must be at least 1, got {}", n),
            Error::CapacityTooLarge { requested, max } => write!(
                f,
                "window / interval gives {} samples, more than the maximum of {}",
                requested, max
            ),
            Error::InvalidInterval => write!(f, "sampling interval must be greater than zero"),
            Error::Io { path, source } => write!(f, "failed to open {}: {}", path.display(), source),
            Error::Spawn(e) => write!(f, "failed to spawn sampler thread: {}", e),
            Error::AlreadyInstalled => write!(f, "telemetry context already installed"),
            Error::SamplerExited => write!(f, "sampler thread exited during startup"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } | Error::Spawn(source) => Some(source),
            _ => None,
        }
    }
}

/// Error handed back to callers of `err` / `err_got`.
///
/// Only the caller's message is exposed. The upstream cause and any extra
/// values are written to the error log and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    message: String,
}

impl ReportedError {
    pub(crate) fn new(message: &str) -> Self {
        Self { message: message.to_owned() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReportedError {}
