use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, warn};

use crate::config::Config;
use crate::error::Error;
use crate::metrics_provider::{MetricsProvider, SysinfoProvider};
use crate::registry::{ByteCounts, TelemetryContext};
use crate::sampler::Sampler;

/// A running telemetry system: the shared loggers plus the sampler thread.
pub struct Telemetry {
    pub context: Arc<TelemetryContext>,
    pub sampler: SamplerHandle,
}

impl Telemetry {
    /// Stops the sampler, writes a closing INFO line with the bytes logged
    /// since the last report, and flushes the log sink.
    ///
    /// Failures at this point have nowhere else to go, so they are reported
    /// as `tracing` diagnostics. Returns the counts the closing line was
    /// built from.
    pub fn shutdown(self) -> ByteCounts {
        if self.sampler.stop().is_err() {
            error!("Sampler thread panicked");
        }
        let counts = self.context.byte_counts();
        if let Err(e) = self.context.info(format_args!(
            "Shutting down, {} bytes logged since last report",
            counts.total()
        )) {
            warn!("Failed to write shutdown line: {}", e);
        }
        if let Err(e) = self.context.flush_logs() {
            warn!("Failed to flush log file: {}", e);
        }
        counts
    }
}

/// Owns the background sampler thread.
///
/// Dropping the handle disconnects the stop channel, which also ends the
/// loop, but does not wait for it. Use [`stop`](SamplerHandle::stop) to wait
/// for the final flush.
pub struct SamplerHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl SamplerHandle {
    /// Signals the sampler and waits for it to flush and exit.
    pub fn stop(self) -> thread::Result<()> {
        let _ = self.stop.send(());
        self.thread.join()
    }

    /// True once the sampler thread has returned, whether it was stopped
    /// or its stop channel was dropped.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Starts telemetry with the files and host metrics described by `config`.
///
/// Failing to open either log file is returned as an error; the caller
/// cannot log anything in that case and should terminate.
pub fn start(config: &Config) -> Result<Telemetry, Error> {
    let open_config = config.clone();
    start_with(config, SysinfoProvider::new(), move || TelemetryContext::open(&open_config))
}

/// Starts the sampler thread with a custom provider and context builder.
///
/// `init` runs on the sampler thread. This function returns only after it
/// has finished, so every logger in the returned context is usable as soon
/// as control comes back to the caller.
pub fn start_with<P, F>(config: &Config, provider: P, init: F) -> Result<Telemetry, Error>
where
    P: MetricsProvider + 'static,
    F: FnOnce() -> Result<TelemetryContext, Error> + Send + 'static,
{
    config.validate()?;
    let capacity = config.capacity();
    let interval = config.interval;
    let window = config.window;
    let banner = !config.dev_mode;

    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let (stop_tx, stop_rx) = mpsc::channel();

    let thread = thread::Builder::new()
        .name("stat-sampler".into())
        .spawn(move || {
            let built = init().and_then(|ctx| {
                let ctx = Arc::new(ctx);
                Sampler::new(ctx.clone(), provider, capacity).map(|s| (ctx, s))
            });
            let (ctx, sampler) = match built {
                Ok(parts) => parts,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if ready_tx.send(Ok(ctx.clone())).is_err() {
                return;
            }

            if banner {
                if let Err(e) = ctx.info(format_args!(
                    "Now logging stats with {} records before flushing to disk, every {} | Logging every {}",
                    capacity,
                    format_duration(window),
                    format_duration(interval)
                )) {
                    warn!("Failed to write startup banner: {}", e);
                }
            }
            sampler.run(interval, stop_rx);
        })
        .map_err(Error::Spawn)?;

    match ready_rx.recv() {
        Ok(Ok(context)) => Ok(Telemetry {
            context,
            sampler: SamplerHandle { stop: stop_tx, thread },
        }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(Error::SamplerExited)
        }
    }
}

/// Human duration in hours, minutes and seconds: `20m0s`, `1h30m0s`, `1.5s`.
/// Anything under a second is shown in milliseconds, or microseconds below that.
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return match d.subsec_millis() {
            0 => format!("{}µs", d.subsec_micros()),
            ms => format!("{}ms", ms),
        };
    }

    let millis = d.subsec_millis();
    let seconds = if millis == 0 {
        format!("{}s", secs % 60)
    } else {
        let frac = format!("{:03}", millis);
        format!("{}.{}s", secs % 60, frac.trim_end_matches('0'))
    };
    match (secs / 3600, secs / 60 % 60) {
        (0, 0) => seconds,
        (0, m) => format!("{}m{}", m, seconds),
        (h, m) => format!("{}h{}m{}", h, m, seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(20 * 60)), "20m0s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m0s");
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format_duration(Duration::from_secs(86_461)), "24h1m1s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(10)), "10ms");
        assert_eq!(format_duration(Duration::from_micros(250)), "250µs");
        assert_eq!(format_duration(Duration::ZERO), "0µs");
    }
}
