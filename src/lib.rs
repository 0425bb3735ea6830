//! # Stat Logger
//!
//! Process-local telemetry and leveled logging for long-running services:
//!
//! * **Resource sampling**: memory and CPU usage read on a fixed interval
//! * **Batched stats**: samples are kept in memory and written to disk once per window
//! * **Leveled logs**: STAT, INFO, WARN, ERR, CRIT and FATAL lines with timestamps
//! * **Byte accounting**: every logger counts the bytes it has written
//!
//! ## Main Components
//!
//! * `TelemetryContext`: the leveled loggers, built once and shared by the process
//! * `Sampler`: the loop that samples, records and flushes
//! * `SampleBuffer`: fixed ring of samples that signals when a cycle completes
//! * `CountingWriter`: pass-through writer that tallies forwarded bytes
//! * `BufferedStatSink`: in-memory stats batch in front of the stats file
//!
//! ## Quick Start
//!
//! ```no_run
//! use stat_logger::{lifecycle, Config};
//!
//! let telemetry = lifecycle::start(&Config::default()).unwrap();
//! let ctx = &telemetry.context;
//!
//! ctx.info(format_args!("service up")).unwrap();
//! let err = ctx.err_got(&"connection reset", "failed to fetch image", &[&"path:", &"/img/a.png"]);
//! assert_eq!(err.to_string(), "failed to fetch image");
//!
//! telemetry.sampler.stop().unwrap();
//! ```

pub mod config;
pub mod counting_writer;
pub mod error;
pub mod level_logger;
pub mod lifecycle;
pub mod metrics_provider;
pub mod registry;
pub mod sample_buffer;
pub mod sampler;
pub mod sink;
pub mod stat_sink;

pub use config::Config;
pub use counting_writer::CountingWriter;
pub use error::{Error, ReportedError};
pub use level_logger::{Level, LevelLogger};
pub use lifecycle::{start, start_with, SamplerHandle, Telemetry};
pub use metrics_provider::{MetricsProvider, Reading, SysinfoProvider};
pub use registry::{ByteCounts, TelemetryContext};
pub use sample_buffer::{Percent, Sample, SampleBuffer};
pub use sampler::{Sampler, Tick};
pub use sink::MultiSink;
pub use stat_sink::{BufferedStatSink, FlushFailure, FlushObserver, LogFlushFailure};
