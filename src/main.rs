//! stat_logger - samples host resource usage into a batched stats log.

use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use stat_logger::{lifecycle, registry, Config};

/// Host resource sampler with leveled logging.
#[derive(Parser)]
#[command(name = "stat_logger", about = "Host resource sampler with leveled logging", version)]
struct Args {
    /// Directory holding log.txt and stats.txt.
    #[arg(long, env = "STAT_LOGGER_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Seconds between two samples.
    #[arg(short, long, env = "STAT_LOGGER_INTERVAL_SECS", default_value = "60")]
    interval_secs: u64,

    /// Seconds of samples kept in memory before the stats file is written.
    #[arg(short, long, env = "STAT_LOGGER_WINDOW_SECS", default_value = "1200")]
    window_secs: u64,

    /// Development mode: skip the startup banner.
    #[arg(long, env = "STAT_LOGGER_DEV")]
    dev: bool,

    /// Do not mirror log lines to stdout.
    #[arg(long)]
    no_console: bool,

    /// Increase diagnostic verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show diagnostic errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            data_dir: self.data_dir.clone(),
            interval: Duration::from_secs(self.interval_secs),
            window: Duration::from_secs(self.window_secs),
            dev_mode: self.dev,
            console_mirror: !self.no_console,
            ..Config::default()
        }
    }
}

/// Diagnostics of the crate itself go to stderr, apart from the log files.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("stat_logger={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let config = args.config();
    info!(
        "Config: interval={:?}, window={:?}, capacity={}, data={}",
        config.interval,
        config.window,
        config.capacity(),
        config.data_dir.display()
    );

    let telemetry = match lifecycle::start(&config) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to start telemetry: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = registry::install_global(telemetry.context.clone()) {
        warn!("{}", e);
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    // Keeps the channel open when no handler could be installed.
    let _keep_open = shutdown_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let _ = shutdown_rx.recv();
    info!("Received shutdown signal");

    let counts = telemetry.shutdown();
    info!("Shutdown complete, {} bytes logged since last report", counts.total());
}
