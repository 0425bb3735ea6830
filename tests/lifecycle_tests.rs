mod common;

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use stat_logger::{lifecycle, Config, Error, TelemetryContext};
use tempfile::tempdir;

use common::{reading, FailingSink, RecordingSink, ScriptedProvider};

fn fast_config(capacity: u32) -> Config {
    Config {
        interval: Duration::from_millis(10),
        window: Duration::from_millis(10) * capacity,
        console_mirror: false,
        ..Config::default()
    }
}

#[test]
fn test_loggers_usable_when_start_returns() {
    let log = RecordingSink::new();
    let stats = RecordingSink::new();
    let (log_sink, stat_sink) = (log.clone(), stats.clone());

    let telemetry = lifecycle::start_with(
        &Config { dev_mode: true, ..fast_config(3) },
        ScriptedProvider::new(vec![reading(80, 100, Some(10))]),
        move || {
            // A slow init must still finish before start_with returns.
            thread::sleep(Duration::from_millis(50));
            Ok(TelemetryContext::new(
                stat_logger::MultiSink::new().with(log_sink),
                stat_logger::BufferedStatSink::new(stat_sink),
            ))
        },
    )
    .unwrap();

    telemetry.context.info(format_args!("ready")).unwrap();
    assert!(log.text().contains(" ready\n"));
    assert!(!log.text().contains("Now logging stats"), "dev mode skips the banner");

    telemetry.sampler.stop().unwrap();
}

#[test]
fn test_banner_logged_outside_dev_mode() {
    let log = RecordingSink::new();
    let log_sink = log.clone();

    let telemetry = lifecycle::start_with(
        &fast_config(20),
        ScriptedProvider::new(vec![reading(80, 100, Some(10))]),
        move || {
            Ok(TelemetryContext::new(
                stat_logger::MultiSink::new().with(log_sink),
                stat_logger::BufferedStatSink::new(RecordingSink::new()),
            ))
        },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !log.text().contains("Now logging stats") && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    telemetry.sampler.stop().unwrap();

    let banner = log.lines().into_iter().find(|l| l.contains("Now logging stats")).unwrap();
    assert!(banner.starts_with("INFO: "));
    assert!(banner.contains("with 20 records before flushing to disk"), "{}", banner);
    assert!(banner.ends_with(", every 200ms | Logging every 10ms"), "{}", banner);
    assert!(!banner.contains("Duration"), "{}", banner);
}

#[test]
fn test_sampler_flushes_full_batches() {
    let stats = RecordingSink::new();
    let stat_sink = stats.clone();

    let telemetry = lifecycle::start_with(
        &Config { dev_mode: true, ..fast_config(2) },
        ScriptedProvider::new(vec![reading(80, 100, Some(10))]),
        move || {
            Ok(TelemetryContext::new(
                stat_logger::MultiSink::new(),
                stat_logger::BufferedStatSink::new(stat_sink),
            ))
        },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while stats.write_calls() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    let flushed = stats.write_calls();
    telemetry.sampler.stop().unwrap();

    assert!(flushed >= 1, "a full batch of 2 samples must reach the stats sink");
    assert!(stats.lines().len() >= 2);
    assert!(stats.lines().iter().all(|l| l.starts_with("STAT: ")));
}

#[test]
fn test_init_failure_returned_to_caller() {
    let result = lifecycle::start_with(
        &fast_config(2),
        ScriptedProvider::new(Vec::new()),
        || Err(Error::InvalidCapacity(0)),
    );
    assert!(matches!(result, Err(Error::InvalidCapacity(0))));
}

#[test]
fn test_zero_interval_rejected_before_spawn() {
    let config = Config { interval: Duration::ZERO, ..Config::default() };
    let result = lifecycle::start_with(&config, ScriptedProvider::new(Vec::new()), || {
        panic!("init must not run for an invalid config")
    });
    assert!(matches!(result, Err(Error::InvalidInterval)));
}

#[test]
fn test_oversized_window_rejected_before_spawn() {
    let config = Config {
        interval: Duration::from_nanos(1),
        window: Duration::from_secs(u64::MAX),
        ..Config::default()
    };
    let result = lifecycle::start_with(&config, ScriptedProvider::new(Vec::new()), || {
        panic!("init must not run for an invalid config")
    });
    assert!(matches!(
        result,
        Err(Error::CapacityTooLarge { max: stat_logger::config::MAX_CAPACITY, .. })
    ));
}

#[test]
fn test_init_panic_reported_as_exit() {
    let result = lifecycle::start_with(&fast_config(2), ScriptedProvider::new(Vec::new()), || {
        panic!("boom")
    });
    assert!(matches!(result, Err(Error::SamplerExited)));
}

#[test]
fn test_unwritable_data_dir_is_fatal() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, b"").unwrap();

    let config = Config { data_dir: blocker.join("data"), ..fast_config(2) };
    let result = lifecycle::start(&config);
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn test_start_with_files_and_host_metrics() {
    let dir = tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().join("data"),
        dev_mode: true,
        ..fast_config(1000)
    };

    let telemetry = lifecycle::start(&config).unwrap();
    telemetry.context.warn(format_args!("running")).unwrap();
    thread::sleep(Duration::from_millis(60));
    telemetry.sampler.stop().unwrap();

    let log = fs::read_to_string(config.log_path()).unwrap();
    assert!(log.starts_with("WARN: ") && log.ends_with(" running\n"), "{}", log);

    let stats = fs::read_to_string(config.stats_path()).unwrap();
    assert!(!stats.is_empty(), "stop flushes the partial batch");
    assert!(stats.lines().all(|l| l.starts_with("STAT: ") && l.contains("| CPU: ")));
}

#[test]
fn test_shutdown_writes_closing_line() {
    let log = RecordingSink::new();
    let log_sink = log.clone();

    let telemetry = lifecycle::start_with(
        &Config { dev_mode: true, ..fast_config(1000) },
        ScriptedProvider::new(vec![reading(80, 100, Some(10))]),
        move || {
            Ok(TelemetryContext::new(
                stat_logger::MultiSink::new().with(log_sink),
                stat_logger::BufferedStatSink::new(RecordingSink::new()),
            ))
        },
    )
    .unwrap();
    telemetry.context.info(format_args!("ready")).unwrap();

    let counts = telemetry.shutdown();
    assert!(counts.info > 0);

    let lines = log.lines();
    let last = lines.last().unwrap();
    assert!(last.starts_with("INFO: "), "{}", last);
    let expected = format!(" Shutting down, {} bytes logged since last report", counts.total());
    assert!(last.ends_with(&expected), "{}", last);
}

#[test]
fn test_shutdown_survives_failing_log_sink() {
    let failing = FailingSink::default();
    let attempts = failing.attempts.clone();

    let telemetry = lifecycle::start_with(
        &Config { dev_mode: true, ..fast_config(1000) },
        ScriptedProvider::new(vec![reading(80, 100, Some(10))]),
        move || {
            Ok(TelemetryContext::new(
                stat_logger::MultiSink::new().with(failing),
                stat_logger::BufferedStatSink::new(RecordingSink::new()),
            ))
        },
    )
    .unwrap();

    let counts = telemetry.shutdown();
    assert_eq!(counts.info, 0, "a rejected line is not counted");
    assert_eq!(*attempts.lock().unwrap(), 1, "the closing line was attempted once");
}
