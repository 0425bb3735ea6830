use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Default time between two samples.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
/// Default in-memory window before the stats batch is written out.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(20 * 60);
/// Largest sample buffer a config may ask for. One window of one-second
/// samples covers about twelve days.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Runtime settings for the sampler and the log files.
///
/// The sample buffer capacity is not configured directly. It is derived from
/// `window / interval` so that one flushed batch always covers one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding both log files. Created at startup if absent.
    pub data_dir: PathBuf,
    /// General log file name, relative to `data_dir`.
    pub log_file: PathBuf,
    /// Stats-only log file name, relative to `data_dir`.
    pub stats_file: PathBuf,
    /// Time between two samples. Must be non-zero.
    pub interval: Duration,
    /// Time covered by one stats batch.
    pub window: Duration,
    /// Suppresses the startup banner.
    pub dev_mode: bool,
    /// Mirrors leveled log lines to stdout.
    pub console_mirror: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("log.txt"),
            stats_file: PathBuf::from("stats.txt"),
            interval: DEFAULT_INTERVAL,
            window: DEFAULT_WINDOW,
            dev_mode: false,
            console_mirror: true,
        }
    }
}

impl Config {
    /// Number of samples held before a flush, `floor(window / interval)`, at least 1.
    ///
    /// A quotient beyond `usize` saturates instead of wrapping; such configs
    /// are rejected by [`validate`](Config::validate).
    pub fn capacity(&self) -> usize {
        usize::try_from(self.requested_capacity())
            .unwrap_or(usize::MAX)
            .max(1)
    }

    /// Exact `floor(window / interval)`, before clamping.
    fn requested_capacity(&self) -> u128 {
        let interval = self.interval.as_nanos();
        if interval == 0 {
            return 1;
        }
        self.window.as_nanos() / interval
    }

    /// Checks the settings before anything is opened or spawned.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidInterval`] - the interval is zero
    /// * [`Error::CapacityTooLarge`] - `window / interval` exceeds [`MAX_CAPACITY`]
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval.is_zero() {
            return Err(Error::InvalidInterval);
        }
        let requested = self.requested_capacity();
        if requested > MAX_CAPACITY as u128 {
            return Err(Error::CapacityTooLarge { requested, max: MAX_CAPACITY });
        }
        Ok(())
    }

    /// Full path of the general log, `data_dir/log_file`.
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(&self.log_file)
    }

    /// Full path of the stats log, `data_dir/stats_file`.
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join(&self.stats_file)
    }
}
